use crate::decode::DecodeError;
use serde::de::DeserializeOwned;
use std::fmt;

/// The NSS databases served by this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Database {
    Passwd,
    Group,
    Shadow,
}

impl Database {
    /// Path segment used by the directory service.
    pub fn as_str(self) -> &'static str {
        match self {
            Database::Passwd => "passwd",
            Database::Group  => "group",
            Database::Shadow => "shadow",
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a database snapshot.
pub trait Record: DeserializeOwned {
    const DATABASE: Database;

    /// Key for `get*nam_r` lookups.
    fn name(&self) -> &str;

    /// Rejects entries that cannot be handed to C callers.
    fn validate(&self) -> Result<(), DecodeError>;
}

/// Records that can also be looked up by numeric id (`getpwuid_r`, `getgrgid_r`).
pub trait Identified: Record {
    fn id(&self) -> u32;
}
