use crate::database::{Database, Record};
use crate::decode::{check_c_string, negative_as_unset, negative_flag_as_unset, DecodeError};
use crate::entry;
use crate::packer::{address, c_string_len, BufferWriter, Pack, TooSmall};
use crate::session::Session;
use libc::{c_char, c_int, c_long, c_ulong, size_t, spwd};
use parking_lot::{const_mutex, Mutex};
use serde::Deserialize;

/// Value glibc uses for "not set" in the signed `spwd` fields.
pub const UNSET_DAYS: c_long = -1;
/// Value glibc uses for "not set" in `sp_flag`.
pub const UNSET_FLAG: c_ulong = !0;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShadowRecord {
    #[serde(rename = "sp_namp")]
    pub name        : String,
    #[serde(rename = "sp_pwdp")]
    pub passwd      : String,
    #[serde(rename = "sp_lstchg")]
    pub last_change : i64,
    #[serde(rename = "sp_min")]
    pub min_days    : i64,
    #[serde(rename = "sp_max")]
    pub max_days    : i64,
    #[serde(rename = "sp_warn")]
    pub warn_days   : i64,
    #[serde(rename = "sp_inact", default, deserialize_with = "negative_as_unset")]
    pub inactive    : Option<i64>,
    #[serde(rename = "sp_expire", default, deserialize_with = "negative_as_unset")]
    pub expire      : Option<i64>,
    #[serde(rename = "sp_flag", default, deserialize_with = "negative_flag_as_unset")]
    pub flag        : Option<u64>,
}

impl Record for ShadowRecord {
    const DATABASE: Database = Database::Shadow;

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), DecodeError> {
        check_c_string("sp_namp", &self.name)?;
        check_c_string("sp_pwdp", &self.passwd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowOffsets {
    pub name   : usize,
    pub passwd : usize,
}

impl Pack for ShadowRecord {
    type Target = spwd;
    type Offsets = ShadowOffsets;

    fn required_len(&self, _base: usize) -> usize {
        c_string_len(&self.name).saturating_add(c_string_len(&self.passwd))
    }

    fn write(&self, writer: &mut BufferWriter<'_>) -> Result<ShadowOffsets, TooSmall> {
        Ok(ShadowOffsets {
            name   : writer.put_str(&self.name)?,
            passwd : writer.put_str(&self.passwd)?,
        })
    }

    fn apply(&self, offsets: &ShadowOffsets, base: *mut c_char, out: &mut spwd) {
        out.sp_namp   = address(base, offsets.name);
        out.sp_pwdp   = address(base, offsets.passwd);
        out.sp_lstchg = self.last_change as c_long;
        out.sp_min    = self.min_days as c_long;
        out.sp_max    = self.max_days as c_long;
        out.sp_warn   = self.warn_days as c_long;
        out.sp_inact  = self.inactive.map_or(UNSET_DAYS, |days| days as c_long);
        out.sp_expire = self.expire.map_or(UNSET_DAYS, |day| day as c_long);
        out.sp_flag   = self.flag.map_or(UNSET_FLAG, |flag| flag as c_ulong);
    }
}

static SHADOW: Mutex<Session<ShadowRecord>> = const_mutex(Session::new());

#[no_mangle]
pub extern "C" fn _nss_http_setspent(_stayopen: c_int) -> c_int {
    entry::set_ent("_nss_http_setspent", &SHADOW)
}

#[no_mangle]
pub extern "C" fn _nss_http_endspent() -> c_int {
    entry::end_ent("_nss_http_endspent", &SHADOW)
}

/// # Safety
///
/// Called by glibc with a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getspent_r(
    result: *mut spwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_ent("_nss_http_getspent_r", &SHADOW, result, buffer, buflen, errnop)
}

/// # Safety
///
/// Called by glibc with a NUL-terminated name, a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getspnam_r(
    name: *const c_char,
    result: *mut spwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_by_name("_nss_http_getspnam_r", &SHADOW, name, result, buffer, buflen, errnop)
}
