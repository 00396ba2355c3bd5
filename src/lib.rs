//! glibc NSS module serving `passwd`, `group` and `shadow` from an HTTP directory.
//!
//! Build as `libnss_http.so.2` and reference it as `http` in `/etc/nsswitch.conf`.
//! Each database fetches its full entry list once per session from
//! `{url}/{database}?format=json&hostname={host}` and answers enumeration and
//! lookups from that snapshot.

pub mod config;
pub mod database;
pub mod decode;
pub mod entry;
pub mod group;
pub mod hostname;
pub mod http_client;
pub mod nss_dns_resolver;
pub mod packer;
pub mod passwd;
pub mod session;
pub mod shadow;
pub mod status;

pub use crate::database::{Database, Identified, Record};
pub use crate::group::GroupRecord;
pub use crate::http_client::{FetchError, Fetcher};
pub use crate::packer::{pack, pack_into, Pack, TooSmall};
pub use crate::passwd::AccountRecord;
pub use crate::session::{Session, SessionError};
pub use crate::shadow::ShadowRecord;
pub use crate::status::NssStatus;
