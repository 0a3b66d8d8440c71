//! Capability-based filesystem helpers built on `cap-std` and `camino`.
//!
//! Ambient authority is used only to open the directories named in
//! configuration. Everything below them is reached through the returned
//! [`fs_utf8::Dir`] handles, so relative names can never escape.
#![forbid(unsafe_code)]

use std::io;
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Split `path` into an ambient anchor directory and the remainder below it.
///
/// Absolute paths anchor at the filesystem root (or drive prefix on Windows);
/// relative paths anchor at the current directory.
pub fn anchor_and_relative(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_path = path.as_std_path();
    let anchor = match std_path.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(prefix).join(std::path::MAIN_SEPARATOR.to_string())
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };

    let relative = if anchor == "." {
        path.to_path_buf()
    } else {
        path.strip_prefix(&anchor)
            .map_err(|_| io::Error::other(format!("failed to strip '{anchor}' from '{path}'")))?
            .to_path_buf()
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&anchor, ambient_authority())?;
    Ok((dir, relative))
}

/// Create `path` (and any missing parents) if needed, then open it as a
/// capability directory.
pub fn open_or_create_dir(path: &Utf8Path) -> io::Result<fs_utf8::Dir> {
    let (anchor, relative) = anchor_and_relative(path)?;
    if relative.as_str().is_empty() {
        return Ok(anchor);
    }
    anchor.create_dir_all(&relative)?;
    anchor.open_dir(&relative)
}

/// Read a whole file through a capability handle on its parent directory.
///
/// Returns the bytes together with the file name component, which callers use
/// as the client-facing name.
pub fn read_file(path: &Utf8Path) -> io::Result<(Vec<u8>, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("'{path}' does not name a file")))?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    let bytes = dir.read(name)?;
    Ok((bytes, name.to_owned()))
}
