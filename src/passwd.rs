use crate::database::{Database, Identified, Record};
use crate::decode::{check_c_string, DecodeError};
use crate::entry;
use crate::packer::{address, c_string_len, BufferWriter, Pack, TooSmall};
use crate::session::Session;
use libc::{c_char, c_int, passwd, size_t, uid_t};
use parking_lot::{const_mutex, Mutex};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "pw_name")]
    pub name   : String,
    #[serde(rename = "pw_passwd")]
    pub passwd : String,
    #[serde(rename = "pw_uid")]
    pub uid    : u32,
    #[serde(rename = "pw_gid")]
    pub gid    : u32,
    #[serde(rename = "pw_gecos")]
    pub gecos  : String,
    #[serde(rename = "pw_dir")]
    pub dir    : String,
    #[serde(rename = "pw_shell")]
    pub shell  : String,
}

impl Record for AccountRecord {
    const DATABASE: Database = Database::Passwd;

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), DecodeError> {
        check_c_string("pw_name", &self.name)?;
        check_c_string("pw_passwd", &self.passwd)?;
        check_c_string("pw_gecos", &self.gecos)?;
        check_c_string("pw_dir", &self.dir)?;
        check_c_string("pw_shell", &self.shell)
    }
}

impl Identified for AccountRecord {
    fn id(&self) -> u32 {
        self.uid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountOffsets {
    pub name   : usize,
    pub passwd : usize,
    pub gecos  : usize,
    pub dir    : usize,
    pub shell  : usize,
}

impl Pack for AccountRecord {
    type Target = passwd;
    type Offsets = AccountOffsets;

    fn required_len(&self, _base: usize) -> usize {
        [&self.name, &self.passwd, &self.gecos, &self.dir, &self.shell]
            .iter()
            .fold(0usize, |sum, field| sum.saturating_add(c_string_len(field)))
    }

    fn write(&self, writer: &mut BufferWriter<'_>) -> Result<AccountOffsets, TooSmall> {
        Ok(AccountOffsets {
            name   : writer.put_str(&self.name)?,
            passwd : writer.put_str(&self.passwd)?,
            gecos  : writer.put_str(&self.gecos)?,
            dir    : writer.put_str(&self.dir)?,
            shell  : writer.put_str(&self.shell)?,
        })
    }

    fn apply(&self, offsets: &AccountOffsets, base: *mut c_char, out: &mut passwd) {
        out.pw_name   = address(base, offsets.name);
        out.pw_passwd = address(base, offsets.passwd);
        out.pw_uid    = self.uid;
        out.pw_gid    = self.gid;
        out.pw_gecos  = address(base, offsets.gecos);
        out.pw_dir    = address(base, offsets.dir);
        out.pw_shell  = address(base, offsets.shell);
    }
}

static PASSWD: Mutex<Session<AccountRecord>> = const_mutex(Session::new());

#[no_mangle]
pub extern "C" fn _nss_http_setpwent(_stayopen: c_int) -> c_int {
    entry::set_ent("_nss_http_setpwent", &PASSWD)
}

#[no_mangle]
pub extern "C" fn _nss_http_endpwent() -> c_int {
    entry::end_ent("_nss_http_endpwent", &PASSWD)
}

/// # Safety
///
/// Called by glibc with a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getpwent_r(
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_ent("_nss_http_getpwent_r", &PASSWD, result, buffer, buflen, errnop)
}

/// # Safety
///
/// Called by glibc with a NUL-terminated name, a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getpwnam_r(
    name: *const c_char,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_by_name("_nss_http_getpwnam_r", &PASSWD, name, result, buffer, buflen, errnop)
}

/// # Safety
///
/// Called by glibc with a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getpwuid_r(
    uid: uid_t,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_by_id("_nss_http_getpwuid_r", &PASSWD, uid, result, buffer, buflen, errnop)
}
