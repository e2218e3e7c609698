//! Destination resolution and the create-exclusive file sink.
//!
//! Every failure here is absorbed into a [`SkipReason`]: a file that cannot
//! be opened or probed is simply not persisted, and the parse carries on.
//! The open is `create_new`, so two racing parses aiming at the same
//! destination cannot both write — the loser sees `AlreadyExists` and skips
//! silently, same as a destination that existed all along.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{trace, warn};

use intake_model::{FilePart, SkipReason, StoragePolicy};

/// The storage decision for one file part, after all hooks resolved.
#[derive(Debug)]
pub(crate) struct ResolvedTarget {
    /// Whether the part should be persisted at all.
    pub handle: bool,
    /// The destination path; `None` when no filename could be determined.
    pub dest: Option<PathBuf>,
}

/// Resolve the storage policy for one file part.
///
/// Slots resolve in order: `tmp_root`, `subfolder`, `handle`, `save_as`.
/// Each hook is awaited fully before the next runs, and a failing hook
/// falls back to the slot's default. The parse-wide `namespace` prefixes
/// the subfolder.
pub(crate) async fn resolve_target(
    policy: &StoragePolicy,
    part: &FilePart,
    namespace: Option<&str>,
    default_tmp: &Path,
) -> ResolvedTarget {
    let tmp_root = match &policy.tmp_root {
        Some(slot) => slot.resolve(part).await.unwrap_or_else(|e| {
            warn!(field = %part.field_name, error = %e, "tmp_root hook failed, using default");
            default_tmp.to_path_buf()
        }),
        None => default_tmp.to_path_buf(),
    };

    let subfolder = match &policy.subfolder {
        Some(slot) => slot.resolve(part).await.unwrap_or_else(|e| {
            warn!(field = %part.field_name, error = %e, "subfolder hook failed, using none");
            PathBuf::new()
        }),
        None => PathBuf::new(),
    };

    let handle = match &policy.handle {
        Some(slot) => slot.resolve(part).await.unwrap_or_else(|e| {
            warn!(field = %part.field_name, error = %e, "handle hook failed, defaulting to true");
            true
        }),
        None => true,
    };

    let save_as = match &policy.save_as {
        Some(slot) => match slot.resolve(part).await {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(field = %part.field_name, error = %e, "save_as hook failed, using part filename");
                part.filename.clone()
            }
        },
        None => part.filename.clone(),
    };

    let subfolder = match namespace {
        Some(ns) => Path::new(ns).join(subfolder),
        None => subfolder,
    };

    let dest = save_as
        .filter(|name| !name.is_empty())
        .map(|name| tmp_root.join(&subfolder).join(name));

    ResolvedTarget { handle, dest }
}

/// The result of trying to open a destination for writing.
#[derive(Debug)]
pub(crate) enum OpenOutcome {
    /// The destination was created and is ready for sequential writes.
    Opened(fs::File),
    /// The part will not be persisted.
    Skipped(SkipReason),
}

/// Probe and open `dest` for exclusive creation.
///
/// An existing file or directory at the destination is a silent skip, not
/// an error. Parent directories are created as needed.
pub(crate) async fn open_exclusive(dest: &Path) -> OpenOutcome {
    match fs::metadata(dest).await {
        Ok(_) => return OpenOutcome::Skipped(SkipReason::AlreadyExists),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return OpenOutcome::Skipped(SkipReason::Io(e.to_string())),
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            return OpenOutcome::Skipped(SkipReason::Io(e.to_string()));
        }
    }

    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
    {
        Ok(file) => {
            trace!(path = %dest.display(), "opened destination for streaming write");
            OpenOutcome::Opened(file)
        }
        // Lost the race between probe and open: same silent skip.
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            OpenOutcome::Skipped(SkipReason::AlreadyExists)
        }
        Err(e) => OpenOutcome::Skipped(SkipReason::Io(e.to_string())),
    }
}

/// Remove a partially written file, tolerating it being gone already.
pub(crate) async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial file");
        }
    }
}
