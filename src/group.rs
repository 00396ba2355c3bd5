use crate::database::{Database, Identified, Record};
use crate::decode::{check_c_string, null_as_empty, DecodeError};
use crate::entry;
use crate::packer::{address, c_string_len, pointer_array_len, BufferWriter, Pack, TooSmall};
use crate::session::Session;
use libc::{c_char, c_int, gid_t, group, size_t};
use parking_lot::{const_mutex, Mutex};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "gr_name")]
    pub name    : String,
    #[serde(rename = "gr_passwd")]
    pub passwd  : String,
    #[serde(rename = "gr_gid")]
    pub gid     : u32,
    #[serde(rename = "gr_mem", default, deserialize_with = "null_as_empty")]
    pub members : Vec<String>,
}

impl GroupRecord {
    fn strings_len(&self) -> usize {
        self.members
            .iter()
            .fold(c_string_len(&self.name).saturating_add(c_string_len(&self.passwd)), |sum, member| {
                sum.saturating_add(c_string_len(member))
            })
    }
}

impl Record for GroupRecord {
    const DATABASE: Database = Database::Group;

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), DecodeError> {
        check_c_string("gr_name", &self.name)?;
        check_c_string("gr_passwd", &self.passwd)?;
        self.members.iter().try_for_each(|member| check_c_string("gr_mem", member))
    }
}

impl Identified for GroupRecord {
    fn id(&self) -> u32 {
        self.gid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupOffsets {
    pub name    : usize,
    pub passwd  : usize,
    /// Start of the null-terminated `char *` array.
    pub members : usize,
}

impl Pack for GroupRecord {
    type Target = group;
    type Offsets = GroupOffsets;

    fn required_len(&self, base: usize) -> usize {
        let strings = self.strings_len();
        strings.saturating_add(pointer_array_len(base.wrapping_add(strings), self.members.len()))
    }

    fn write(&self, writer: &mut BufferWriter<'_>) -> Result<GroupOffsets, TooSmall> {
        let name = writer.put_str(&self.name)?;
        let passwd = writer.put_str(&self.passwd)?;

        let mut member_offsets = Vec::with_capacity(self.members.len());
        for member in &self.members {
            member_offsets.push(writer.put_str(member)?);
        }
        let members = writer.put_pointer_array(&member_offsets)?;

        Ok(GroupOffsets { name, passwd, members })
    }

    fn apply(&self, offsets: &GroupOffsets, base: *mut c_char, out: &mut group) {
        out.gr_name   = address(base, offsets.name);
        out.gr_passwd = address(base, offsets.passwd);
        out.gr_gid    = self.gid;
        out.gr_mem    = address(base, offsets.members).cast::<*mut c_char>();
    }
}

static GROUP: Mutex<Session<GroupRecord>> = const_mutex(Session::new());

#[no_mangle]
pub extern "C" fn _nss_http_setgrent(_stayopen: c_int) -> c_int {
    entry::set_ent("_nss_http_setgrent", &GROUP)
}

#[no_mangle]
pub extern "C" fn _nss_http_endgrent() -> c_int {
    entry::end_ent("_nss_http_endgrent", &GROUP)
}

/// # Safety
///
/// Called by glibc with a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getgrent_r(
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_ent("_nss_http_getgrent_r", &GROUP, result, buffer, buflen, errnop)
}

/// # Safety
///
/// Called by glibc with a NUL-terminated name, a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getgrnam_r(
    name: *const c_char,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_by_name("_nss_http_getgrnam_r", &GROUP, name, result, buffer, buflen, errnop)
}

/// # Safety
///
/// Called by glibc with a valid result struct, buffer and errno pointer.
#[no_mangle]
pub unsafe extern "C" fn _nss_http_getgrgid_r(
    gid: gid_t,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry::get_by_id("_nss_http_getgrgid_r", &GROUP, gid, result, buffer, buflen, errnop)
}
