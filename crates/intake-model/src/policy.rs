//! Per-file storage policy hooks.
//!
//! Each of the four storage decisions for a file part (whether to handle it
//! at all, the temp root, the subfolder, the final name) is a
//! [`PolicySlot`]: either a static value or an asynchronous hook evaluated
//! once per file with that file's [`FilePart`] descriptor. Hooks may
//! suspend; the decoder awaits them fully before draining the part's bytes.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::FilePart;

/// The hook signature: one file descriptor in, one asynchronous value out.
///
/// A hook that fails is absorbed by the decoder — the slot falls back to
/// its default and the part is still processed.
pub type HookFn<T> = dyn Fn(&FilePart) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync;

/// A storage decision: a static value or a per-file asynchronous hook.
#[derive(Clone)]
pub enum PolicySlot<T> {
    /// The same value for every file part.
    Value(T),
    /// A hook evaluated once per file part.
    Hook(Arc<HookFn<T>>),
}

impl<T: Clone> PolicySlot<T> {
    /// Wrap a static value.
    pub fn value(value: impl Into<T>) -> Self {
        Self::Value(value.into())
    }

    /// Wrap an asynchronous hook.
    pub fn hook<F>(hook: F) -> Self
    where
        F: Fn(&FilePart) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync + 'static,
    {
        Self::Hook(Arc::new(hook))
    }

    /// Resolve the slot for one file part.
    ///
    /// Static values never fail; hook failures are surfaced so the caller
    /// can fall back to the slot's default.
    pub async fn resolve(&self, part: &FilePart) -> anyhow::Result<T> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Hook(hook) => hook(part).await,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PolicySlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Hook(_) => f.debug_tuple("Hook").field(&"..").finish(),
        }
    }
}

/// The full per-file storage policy for a parse.
///
/// Unset slots use the engine defaults: handle every file, store under the
/// engine's temp root with no subfolder, name the file after the
/// tokenizer-supplied filename.
#[derive(Debug, Clone, Default)]
pub struct StoragePolicy {
    /// Whether to persist the part at all. Default: `true`.
    pub handle: Option<PolicySlot<bool>>,
    /// Root directory for stored files. Default: the engine's temp dir.
    pub tmp_root: Option<PolicySlot<PathBuf>>,
    /// Subfolder below the root. Default: none.
    pub subfolder: Option<PolicySlot<PathBuf>>,
    /// Final filename. Default: the client-supplied filename.
    pub save_as: Option<PolicySlot<String>>,
}

impl StoragePolicy {
    /// Set the `handle` slot.
    #[must_use]
    pub fn with_handle(mut self, slot: PolicySlot<bool>) -> Self {
        self.handle = Some(slot);
        self
    }

    /// Set the `tmp_root` slot.
    #[must_use]
    pub fn with_tmp_root(mut self, slot: PolicySlot<PathBuf>) -> Self {
        self.tmp_root = Some(slot);
        self
    }

    /// Set the `subfolder` slot.
    #[must_use]
    pub fn with_subfolder(mut self, slot: PolicySlot<PathBuf>) -> Self {
        self.subfolder = Some(slot);
        self
    }

    /// Set the `save_as` slot.
    #[must_use]
    pub fn with_save_as(mut self, slot: PolicySlot<String>) -> Self {
        self.save_as = Some(slot);
        self
    }
}
