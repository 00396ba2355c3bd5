//! Per-database snapshot cache, enumeration cursor and lookups.
//!
//! A [`Session`] is either empty or holds a complete snapshot fetched from the
//! directory service. Every operation loads the snapshot lazily, so glibc may
//! call `get*ent_r` or a keyed lookup without a preceding `set*ent`. A failed
//! fetch or decode leaves the session empty; the next call simply tries again.

use crate::database::{Database, Identified, Record};
use crate::decode::{decode_snapshot, DecodeError};
use crate::http_client::{FetchError, Fetcher};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot fetch {database} entries: {source}")]
    Fetch {
        database: Database,
        #[source]
        source: FetchError,
    },

    #[error("cannot decode {database} entries: {source}")]
    Decode {
        database: Database,
        #[source]
        source: DecodeError,
    },
}

pub struct Session<R> {
    entries: Vec<R>,
    cursor: usize,
}

impl<R> Session<R> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drops the snapshot and rewinds. Idempotent.
    pub fn reset(&mut self) {
        self.entries = Vec::new();
        self.cursor = 0;
    }
}

impl<R> Default for Session<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Session<R> {
    pub fn ensure_loaded(&mut self, fetcher: &dyn Fetcher, host: &str) -> Result<(), SessionError> {
        if self.is_loaded() {
            return Ok(());
        }

        let database = R::DATABASE;
        let payload = fetcher
            .fetch(database, host)
            .map_err(|source| SessionError::Fetch { database, source })?;
        let entries = decode_snapshot::<R>(&payload)
            .map_err(|source| SessionError::Decode { database, source })?;

        log::debug!("loaded {} {database} entries", entries.len());
        self.entries = entries;
        self.cursor = 0;
        Ok(())
    }

    /// Starts a new enumeration over the current snapshot, loading it if needed.
    pub fn rewind(&mut self, fetcher: &dyn Fetcher, host: &str) -> Result<(), SessionError> {
        self.ensure_loaded(fetcher, host)?;
        self.cursor = 0;
        Ok(())
    }

    /// Returns the entry at the cursor and advances, or `None` once exhausted.
    pub fn next(&mut self, fetcher: &dyn Fetcher, host: &str) -> Result<Option<&R>, SessionError> {
        self.ensure_loaded(fetcher, host)?;
        match self.entries.get(self.cursor) {
            Some(entry) => {
                self.cursor += 1;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Like [`Session::next`], but only advances when `f` succeeds, so a
    /// caller whose buffer was too small gets the same entry on retry.
    pub fn next_with<T, E, F>(&mut self, fetcher: &dyn Fetcher, host: &str, f: F) -> Result<Option<Result<T, E>>, SessionError>
    where F: FnOnce(&R) -> Result<T, E>,
    {
        self.ensure_loaded(fetcher, host)?;
        let entry = match self.entries.get(self.cursor) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let result = f(entry);
        if result.is_ok() {
            self.cursor += 1;
        }
        Ok(Some(result))
    }

    pub fn find_by_name(&mut self, fetcher: &dyn Fetcher, host: &str, name: &str) -> Result<Option<&R>, SessionError> {
        self.ensure_loaded(fetcher, host)?;
        Ok(self.entries.iter().find(|entry| entry.name() == name))
    }
}

impl<R: Identified> Session<R> {
    pub fn find_by_id(&mut self, fetcher: &dyn Fetcher, host: &str, id: u32) -> Result<Option<&R>, SessionError> {
        self.ensure_loaded(fetcher, host)?;
        Ok(self.entries.iter().find(|entry| entry.id() == id))
    }
}
