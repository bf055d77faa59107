use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Flat, name-addressed file storage on the device's data partition.
pub trait Storage {
    /// `Ok(None)` when the file does not exist.
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>>;
    fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()>;
    /// Must atomically replace `to` if it already exists.
    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;
    fn remove(&mut self, name: &str) -> io::Result<()>;

    fn exists(&self, name: &str) -> bool {
        matches!(self.read(name), Ok(Some(_)))
    }
}

impl<T: Storage + ?Sized> Storage for &mut T {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        (**self).read(name)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        (**self).write(name, data)
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        (**self).remove(name)
    }

    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
}

/// `std::fs` storage rooted at a mount point (`/littlefs` on the device).
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

impl Storage for FsStorage {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(name)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        fs::write(self.path(name), data)
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to))
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path(name))
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }
}
