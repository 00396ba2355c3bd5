use libc::c_int;

/// Return codes of the glibc NSS plugin contract (`enum nss_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum NssStatus {
    TryAgain = -2,
    Unavail  = -1,
    NotFound = 0,
    Success  = 1,
}

impl NssStatus {
    /// The errno value glibc expects alongside this status, if any.
    pub fn errno(self) -> Option<c_int> {
        match self {
            NssStatus::Success => None,
            NssStatus::NotFound | NssStatus::Unavail => Some(libc::ENOENT),
            NssStatus::TryAgain => Some(libc::ERANGE),
        }
    }

    /// Writes the companion errno (when there is one) and converts to the C return value.
    ///
    /// # Safety
    ///
    /// `errnop` must be null or valid for a single `c_int` write.
    pub unsafe fn report(self, errnop: *mut c_int) -> c_int {
        if let Some(errno) = self.errno() {
            if !errnop.is_null() {
                // SAFETY: caller-provided out-parameter, checked non-null above.
                unsafe { *errnop = errno };
            }
        }
        self as c_int
    }
}

impl From<NssStatus> for c_int {
    fn from(status: NssStatus) -> Self {
        status as c_int
    }
}
