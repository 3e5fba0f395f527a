//! ResourceArc wrapper
//!
//! Persistent state for bound documents held by the host VM.

use crate::bind::BoundDocument;
use rustler::ResourceArc;
use std::sync::Mutex;

/// Wrapper for a BoundDocument that can be stored in a ResourceArc.
/// The mutex serializes all node operations on one document; the tree
/// layer itself is single-threaded by contract.
pub struct DocumentResource {
    inner: Mutex<BoundDocument>,
}

impl DocumentResource {
    pub fn new() -> Self {
        DocumentResource {
            inner: Mutex::new(BoundDocument::new()),
        }
    }

    /// Run a closure against the bound document.
    ///
    /// # Errors
    ///
    /// Returns `"lock_poisoned"` if a previous holder panicked.
    pub fn with_doc<F, R>(&self, f: F) -> Result<R, &'static str>
    where
        F: FnOnce(&mut BoundDocument) -> R,
    {
        let mut guard = self.inner.lock().map_err(|_| "lock_poisoned")?;
        Ok(f(&mut guard))
    }
}

#[rustler::resource_impl]
impl rustler::Resource for DocumentResource {}

impl Default for DocumentResource {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for the ResourceArc
pub type DocumentRef = ResourceArc<DocumentResource>;
