//! The key-value store contract supplied to the core (spec §6). This
//! crate ships no durable backend -- `store::mem::MemKv` is a reference
//! in-memory implementation used by tests and as a usage example, not a
//! persistence format.

use crate::error::Error;

/// Options for [`KvStore::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub keys_only: bool,
    pub limit: Option<usize>,
}

/// A byte-oriented key-value contract. No durability promise is made by
/// the core; that is the backend's responsibility (spec §6). Keys are
/// opaque UTF-8 strings built from the secondary-index layout in §4.7
/// (`event/<said>`, `kel/<aid>/<seq>/<said>`, etc).
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), Error>;
    fn del(&mut self, key: &str) -> Result<(), Error>;
    /// Returns `(key, value)` pairs under `prefix` in key order. When
    /// `options.keys_only` is set, values are `None`.
    fn list(&self, prefix: &str, options: ListOptions) -> Result<Vec<(String, Option<Vec<u8>>)>, Error>;
}
