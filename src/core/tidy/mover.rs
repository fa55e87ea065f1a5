//! Filesystem relocation with a cross-device fallback.

use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

#[cfg(unix)]
const EXDEV: Option<i32> = Some(18);
#[cfg(windows)]
const EXDEV: Option<i32> = Some(17); // ERROR_NOT_SAME_DEVICE
#[cfg(not(any(unix, windows)))]
const EXDEV: Option<i32> = None;

/// Moves one file to a new path.
///
/// `rename` is the only primitive an implementation must supply; the
/// provided `relocate` layers the copy-then-delete fallback on top.
pub trait FileMover: Send + Sync {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Rename, or copy and remove the source when the rename crosses devices
    fn relocate(&self, from: &Path, to: &Path) -> io::Result<()> {
        match self.rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if is_cross_device(&e) => {
                debug!(from = %from.display(), to = %to.display(), "cross-device move, copying");
                copy_then_remove(from, to)
            }
            Err(e) => Err(e),
        }
    }
}

/// `std::fs::rename`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileMover;

impl FileMover for StdFileMover {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Whether a rename failed only because source and target are on different devices
pub fn is_cross_device(err: &io::Error) -> bool {
    if let (Some(code), Some(exdev)) = (err.raw_os_error(), EXDEV) {
        if code == exdev {
            return true;
        }
    }
    err.to_string().to_lowercase().contains("cross-device")
}

/// Copy, verify the size, then delete the source.
///
/// A failed or short copy removes the partial destination and leaves the
/// source alone. Failing to delete the source fails the whole move.
pub fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let source_size = fs::metadata(from)?.len();

    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(e);
    }

    let dest_size = fs::metadata(to)?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(to);
        return Err(io::Error::other(format!(
            "copy verification failed: source {} bytes, dest {} bytes",
            source_size, dest_size
        )));
    }

    fs::remove_file(from)
        .map_err(|e| io::Error::new(e.kind(), format!("remove source after copy: {e}")))
}
