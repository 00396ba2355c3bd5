use gethostname::gethostname;
use std::ffi::{CStr, CString};
use std::ptr;

#[derive(Debug, thiserror::Error)]
pub enum HostnameError {
    #[error("hostname {0:?} is not valid UTF-8")]
    NotUtf8(std::ffi::OsString),

    #[error("hostname is empty")]
    Empty,
}

/// Name this machine is known by to the directory service: the canonical
/// (fully qualified) name when the resolver knows one, the short name otherwise.
pub fn canonical_hostname() -> Result<String, HostnameError> {
    let raw = gethostname();
    let short = raw
        .to_str()
        .map(str::to_owned)
        .ok_or_else(|| HostnameError::NotUtf8(raw.clone()))?;
    if short.is_empty() {
        return Err(HostnameError::Empty);
    }

    Ok(lookup_canonical_name(&short)
        .and_then(|name| normalize(&name))
        .unwrap_or(short))
}

fn normalize(name: &str) -> Option<String> {
    let name = name.trim_end_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn lookup_canonical_name(host: &str) -> Option<String> {
    let node = CString::new(host).ok()?;

    // SAFETY: an all-zero addrinfo is a valid "no hints" value.
    let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
    hints.ai_family = libc::AF_UNSPEC;
    hints.ai_socktype = libc::SOCK_STREAM;
    hints.ai_flags = libc::AI_CANONNAME;

    let mut result: *mut libc::addrinfo = ptr::null_mut();
    // SAFETY: node and hints outlive the call; result is freed below.
    let rc = unsafe { libc::getaddrinfo(node.as_ptr(), ptr::null(), &hints, &mut result) };
    if rc != 0 || result.is_null() {
        log::debug!("no canonical name for {host} (getaddrinfo returned {rc})");
        return None;
    }

    // SAFETY: result is a list returned by a successful getaddrinfo call.
    unsafe {
        let canon = (*result).ai_canonname;
        let name = if canon.is_null() {
            None
        } else {
            CStr::from_ptr(canon).to_str().ok().map(str::to_owned)
        };
        libc::freeaddrinfo(result);
        name
    }
}
