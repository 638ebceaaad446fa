//! Local file system
//!
//! `FileSystem` implementation over `std::fs`.

use super::{FileHandle, FileKind, FileSystem, OpenMode, PathInfo};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};

#[derive(Debug, Default)]
pub struct LocalFileSystem {
    files: HashMap<FileHandle, File>,
    next_handle: u32,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn file_mut(&mut self, handle: FileHandle) -> io::Result<&mut File> {
        self.files
            .get_mut(&handle)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "stale file handle"))
    }

    /// Number of files currently held open.
    pub fn open_files(&self) -> usize {
        self.files.len()
    }
}

/// Login name for `uid`, or the number itself when no account matches.
#[cfg(unix)]
fn user_name(uid: u32) -> String {
    uzers::get_user_by_uid(uid)
        .map(|user| user.name().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| uid.to_string())
}

#[cfg(unix)]
fn group_name(gid: u32) -> String {
    uzers::get_group_by_gid(gid)
        .map(|group| group.name().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| gid.to_string())
}

#[cfg(unix)]
fn ownership(meta: &Metadata) -> (u64, String, String) {
    use std::os::unix::fs::MetadataExt;
    (meta.nlink(), user_name(meta.uid()), group_name(meta.gid()))
}

#[cfg(not(unix))]
fn ownership(_meta: &Metadata) -> (u64, String, String) {
    (1, "ftp".to_string(), "ftp".to_string())
}

impl FileSystem for LocalFileSystem {
    fn open(&mut self, path: &str, mode: OpenMode) -> io::Result<FileHandle> {
        let file = match mode {
            OpenMode::Read => File::open(path)?,
            OpenMode::Write => File::create(path)?,
        };
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = FileHandle(self.next_handle);
        self.files.insert(handle, file);
        Ok(handle)
    }

    fn read(&mut self, file: FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut(file)?.read(buf)
    }

    fn write(&mut self, file: FileHandle, data: &[u8]) -> io::Result<()> {
        self.file_mut(file)?.write_all(data)
    }

    fn close(&mut self, file: FileHandle) {
        self.files.remove(&file);
    }

    fn stat(&self, path: &str) -> io::Result<PathInfo> {
        // Follows symlinks; only special files report as Link.
        let meta = fs::metadata(path)?;
        let file_type = meta.file_type();
        let kind = if file_type.is_dir() {
            FileKind::Dir
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Link
        };
        let (links, user, group) = ownership(&meta);
        let modified = DateTime::<Local>::from(meta.modified()?).naive_local();

        Ok(PathInfo {
            kind,
            size: meta.len(),
            links,
            user,
            group,
            modified,
        })
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn make_dir(&mut self, path: &str) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn remove_dir(&mut self, path: &str) -> io::Result<()> {
        fs::remove_dir(path)
    }
}
