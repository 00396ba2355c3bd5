//! Shared glue behind the exported `_nss_http_*` symbols.
//!
//! glibc passes no context pointer, so the configured fetcher and hostname live
//! in a process-wide [`Runtime`] built on first use. Each database keeps its own
//! session behind its own mutex; the lock is held for the whole call.

use crate::config::{Config, ConfigError};
use crate::database::{Identified, Record};
use crate::hostname::{canonical_hostname, HostnameError};
use crate::http_client::HttpFetcher;
use crate::packer::{pack_into, Pack, TooSmall};
use crate::session::{Session, SessionError};
use crate::status::NssStatus;
use libc::{c_char, c_int, size_t};
use log::LevelFilter;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::ffi::CStr;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hostname(#[from] HostnameError),
}

pub struct Runtime {
    pub fetcher  : HttpFetcher,
    pub hostname : String,
}

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// True when the kernel flagged this process as setuid/setgid or otherwise
/// privilege-changing.
fn secure_mode() -> bool {
    // SAFETY: getauxval only reads the auxiliary vector.
    unsafe { libc::getauxval(libc::AT_SECURE) != 0 }
}

/// Logger for the host process. `RUST_LOG` is ignored in secure mode.
fn logger(debug: bool, secure: bool) -> env_logger::Builder {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Warn };
    if secure {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(level);
        builder
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
    }
}

fn init_logging(debug: bool) {
    let _ = logger(debug, secure_mode()).try_init();
}

impl Runtime {
    pub fn from_config(config: &Config) -> Result<Self, RuntimeError> {
        init_logging(config.debug);

        let hostname = canonical_hostname()?;
        log::debug!("serving {hostname} from {}", config.url);
        Ok(Runtime {
            fetcher: HttpFetcher::new(config),
            hostname,
        })
    }
}

fn build_runtime() -> Result<Runtime, RuntimeError> {
    Runtime::from_config(&Config::load(&Config::path())?)
}

/// Builds the process-wide runtime from `config` instead of the config file.
/// Has no effect once the runtime exists.
#[doc(hidden)]
pub fn install(config: &Config) -> Result<(), RuntimeError> {
    RUNTIME.get_or_try_init(|| Runtime::from_config(config)).map(|_| ())
}

/// The process-wide runtime, or `None` when the config cannot be loaded.
///
/// A failed initialisation is retried on the next call.
pub fn runtime() -> Option<&'static Runtime> {
    match RUNTIME.get_or_try_init(build_runtime) {
        Ok(runtime) => Some(runtime),
        Err(err) => {
            init_logging(false);
            log::error!("nss_http is not usable: {err}");
            None
        }
    }
}

/// The caller's result struct and scratch buffer.
pub struct Output<'a, T> {
    result : &'a mut T,
    buffer : &'a mut [u8],
}

impl<'a, T> Output<'a, T> {
    /// # Safety
    ///
    /// Non-null `result` must be valid for writes of `T` and non-null `buffer`
    /// valid for `buflen` bytes, both exclusively ours until the call returns.
    pub unsafe fn from_raw(result: *mut T, buffer: *mut c_char, buflen: size_t) -> Option<Self> {
        if result.is_null() || buffer.is_null() {
            return None;
        }
        // SAFETY: upheld by the caller, per the NSS contract.
        unsafe {
            Some(Self {
                result : &mut *result,
                buffer : std::slice::from_raw_parts_mut(buffer.cast::<u8>(), buflen),
            })
        }
    }

    pub fn fill<R: Pack<Target = T>>(&mut self, record: &R) -> Result<(), TooSmall> {
        pack_into(record, &mut *self.buffer, &mut *self.result)
    }
}

fn too_small(op: &str, err: TooSmall) -> NssStatus {
    log::debug!("{op}: {err}");
    NssStatus::TryAgain
}

fn deliver<R: Pack>(op: &str, found: Result<Option<&R>, SessionError>, out: &mut Output<'_, R::Target>) -> NssStatus {
    match found {
        Ok(Some(record)) => match out.fill(record) {
            Ok(()) => NssStatus::Success,
            Err(err) => too_small(op, err),
        },
        Ok(None) => NssStatus::NotFound,
        Err(err) => {
            log::error!("{err}");
            NssStatus::Unavail
        }
    }
}

pub fn set_ent<R: Record>(op: &str, session: &Mutex<Session<R>>) -> c_int {
    let runtime = match runtime() {
        Some(runtime) => runtime,
        None => return NssStatus::Unavail.into(),
    };
    log::debug!("{op}");

    match session.lock().rewind(&runtime.fetcher, &runtime.hostname) {
        Ok(()) => NssStatus::Success.into(),
        Err(err) => {
            log::error!("{err}");
            NssStatus::Unavail.into()
        }
    }
}

pub fn end_ent<R>(op: &str, session: &Mutex<Session<R>>) -> c_int {
    log::debug!("{op}");
    session.lock().reset();
    NssStatus::Success.into()
}

/// # Safety
///
/// Pointer arguments as handed over by glibc to `get*ent_r`.
pub unsafe fn get_ent<R: Pack + Record>(
    op: &str,
    session: &Mutex<Session<R>>,
    result: *mut R::Target,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    // SAFETY: forwarded from the caller.
    let status = match (runtime(), unsafe { Output::from_raw(result, buffer, buflen) }) {
        (Some(runtime), Some(mut out)) => {
            log::debug!("{op}");
            let next = session
                .lock()
                .next_with(&runtime.fetcher, &runtime.hostname, |record| out.fill(record));
            match next {
                Ok(Some(Ok(()))) => NssStatus::Success,
                Ok(Some(Err(err))) => too_small(op, err),
                Ok(None) => NssStatus::NotFound,
                Err(err) => {
                    log::error!("{err}");
                    NssStatus::Unavail
                }
            }
        }
        _ => NssStatus::Unavail,
    };
    // SAFETY: errnop comes from glibc.
    unsafe { status.report(errnop) }
}

/// # Safety
///
/// Pointer arguments as handed over by glibc to `get*nam_r`.
pub unsafe fn get_by_name<R: Pack + Record>(
    op: &str,
    session: &Mutex<Session<R>>,
    name: *const c_char,
    result: *mut R::Target,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    // SAFETY: forwarded from the caller.
    let status = match (runtime(), unsafe { Output::from_raw(result, buffer, buflen) }) {
        (Some(_), _) if name.is_null() => NssStatus::Unavail,
        (Some(runtime), Some(mut out)) => {
            // SAFETY: glibc passes a NUL-terminated name.
            let name = unsafe { CStr::from_ptr(name) };
            match name.to_str() {
                Ok(name) => {
                    log::debug!("{op}({name})");
                    let mut session = session.lock();
                    let found = session.find_by_name(&runtime.fetcher, &runtime.hostname, name);
                    deliver(op, found, &mut out)
                }
                Err(_) => NssStatus::NotFound,
            }
        }
        _ => NssStatus::Unavail,
    };
    // SAFETY: errnop comes from glibc.
    unsafe { status.report(errnop) }
}

/// # Safety
///
/// Pointer arguments as handed over by glibc to `getpwuid_r`/`getgrgid_r`.
pub unsafe fn get_by_id<R: Pack + Identified>(
    op: &str,
    session: &Mutex<Session<R>>,
    id: u32,
    result: *mut R::Target,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    // SAFETY: forwarded from the caller.
    let status = match (runtime(), unsafe { Output::from_raw(result, buffer, buflen) }) {
        (Some(runtime), Some(mut out)) => {
            log::debug!("{op}({id})");
            let mut session = session.lock();
            let found = session.find_by_id(&runtime.fetcher, &runtime.hostname, id);
            deliver(op, found, &mut out)
        }
        _ => NssStatus::Unavail,
    };
    // SAFETY: errnop comes from glibc.
    unsafe { status.report(errnop) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passwd::AccountRecord;

    #[test]
    fn test_secure_logger_ignores_rust_log() {
        std::env::set_var("RUST_LOG", "trace");
        assert_eq!(logger(false, true).build().filter(), LevelFilter::Warn);
        assert_eq!(logger(true, true).build().filter(), LevelFilter::Debug);
        assert_eq!(logger(false, false).build().filter(), LevelFilter::Trace);

        std::env::remove_var("RUST_LOG");
        assert_eq!(logger(false, false).build().filter(), LevelFilter::Warn);
        assert_eq!(logger(true, false).build().filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_deliver_maps_lookup_results() {
        let record = AccountRecord {
            name   : "alice".to_string(),
            passwd : "x".to_string(),
            uid    : 1001,
            gid    : 1001,
            gecos  : String::new(),
            dir    : "/home/alice".to_string(),
            shell  : "/bin/sh".to_string(),
        };
        // SAFETY: passwd is plain old data; null pointers are valid field values.
        let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
        let mut buf = [0u8; 64];
        let mut out = Output { result: &mut pwd, buffer: &mut buf[..] };

        assert_eq!(deliver("test", Ok(Some(&record)), &mut out), NssStatus::Success);
        assert_eq!(deliver::<AccountRecord>("test", Ok(None), &mut out), NssStatus::NotFound);

        let mut small = [0u8; 4];
        let mut out = Output { result: &mut pwd, buffer: &mut small[..] };
        assert_eq!(deliver("test", Ok(Some(&record)), &mut out), NssStatus::TryAgain);
    }
}
