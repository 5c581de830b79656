//! Directory snapshots.
//!
//! A [`DirectoryTree`] records every path below a root, keyed by its
//! `/`-separated relative path. Only presence and kind are captured here;
//! file contents are read on demand during comparison.
//!
//! Keys are lossless: a byte that is not valid UTF-8 is written as `\xNN`
//! and a literal backslash as `\\`, so two distinct names never share a key.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::CompareError;

/// Kind of a path inside a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory.
    Directory,
    /// A regular file.
    File,
    /// A symbolic link (not followed) and its target.
    Symlink(PathBuf),
}

impl EntryKind {
    /// Human-readable kind, as used in diff output.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Directory => "a directory",
            Self::File => "a regular file",
            Self::Symlink(_) => "a symbolic link",
        }
    }
}

/// A single path in a tree.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// What the path is.
    pub kind: EntryKind,
    /// Absolute location on disk.
    pub path: PathBuf,
}

/// Snapshot of a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryTree {
    root: PathBuf,
    entries: BTreeMap<String, TreeEntry>,
}

impl DirectoryTree {
    /// Walk `root` and record every path below it.
    ///
    /// Symbolic links are recorded, not followed.
    pub fn read(root: &Path) -> Result<Self, CompareError> {
        if !root.is_dir() {
            return Err(CompareError::MissingDirectory(root.to_path_buf()));
        }

        let mut entries = BTreeMap::new();

        for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                CompareError::io(path, e.into())
            })?;

            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) => relative_key(relative),
                Err(_) => continue,
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .map_err(|e| CompareError::io(entry.path(), e))?;
                EntryKind::Symlink(target)
            } else {
                EntryKind::File
            };

            entries.insert(relative, TreeEntry { kind, path: entry.into_path() });
        }

        Ok(Self { root: root.to_path_buf(), entries })
    }

    /// The directory this snapshot was taken from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a relative path.
    pub fn get(&self, relative: &str) -> Option<&TreeEntry> {
        self.entries.get(relative)
    }

    /// Relative paths in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether the tree has no entries below the root.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Join path components with `/` regardless of platform.
fn relative_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(component_name(part)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn component_name(part: &OsStr) -> String {
    use std::fmt::Write;
    use std::os::unix::ffi::OsStrExt;

    let mut name = String::new();
    for chunk in part.as_bytes().utf8_chunks() {
        name.push_str(&chunk.valid().replace('\\', "\\\\"));
        for byte in chunk.invalid() {
            let _ = write!(name, "\\x{byte:02x}");
        }
    }
    name
}

#[cfg(windows)]
fn component_name(part: &OsStr) -> String {
    use std::os::windows::ffi::OsStrExt;

    // Backslash is a separator on Windows and never part of a name.
    char::decode_utf16(part.encode_wide())
        .map(|c| match c {
            Ok(c) => c.to_string(),
            Err(e) => format!("\\u{{{:04x}}}", e.unpaired_surrogate()),
        })
        .collect()
}

#[cfg(not(any(unix, windows)))]
fn component_name(part: &OsStr) -> String {
    part.to_string_lossy().into_owned()
}

/// Byte-for-byte equality of two files.
pub(crate) fn same_content(a: &Path, b: &Path) -> Result<bool, CompareError> {
    let len_a = std::fs::metadata(a).map_err(|e| CompareError::io(a, e))?.len();
    let len_b = std::fs::metadata(b).map_err(|e| CompareError::io(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a).map_err(|e| CompareError::io(a, e))?);
    let mut reader_b = BufReader::new(File::open(b).map_err(|e| CompareError::io(b, e))?);
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let n = read_full(&mut reader_a, &mut buf_a).map_err(|e| CompareError::io(a, e))?;
        let m = read_full(&mut reader_b, &mut buf_b).map_err(|e| CompareError::io(b, e))?;
        if n != m || buf_a[..n] != buf_b[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
