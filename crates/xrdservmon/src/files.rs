//! Crash-safe replacement of small files in the run directory.

use std::ffi::{OsStr, OsString};
use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

/// Replaces `path` with `contents`; readers see either the old or the new
/// bytes, never a mixture.
///
/// The payload is staged in a hidden owner-only sibling, synced, then
/// renamed over `path`. The staging file is removed if any step fails.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let Some(name) = path.file_name() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' does not name a file", path.display()),
        ));
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let prefix = staging_prefix(name);
    let mut builder = Builder::new();
    builder.prefix(&prefix);
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut staged = builder.tempfile_in(directory)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|failure| failure.error)?;
    Ok(())
}

/// `.{name}.` so a stray staging file sorts next to its target and is hidden.
fn staging_prefix(name: &OsStr) -> OsString {
    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");
    prefix
}
