//! Control-surface access
//!
//! All ConfigFS/sysfs I/O of the projection engine goes through
//! [`ControlSurface`], so the ordering logic can run against the in-memory
//! [`MemorySurface`](super::memory::MemorySurface) as well as the host.

use std::io;
use std::path::Path;

/// Narrow filesystem interface used by [`GadgetSpace`](super::space::GadgetSpace)
pub trait ControlSurface: Send + Sync {
    /// Create a directory, creating missing parents.
    ///
    /// Returns `Ok(true)` when the directory was created and `Ok(false)` when it
    /// already existed and `exist_ok` was set. An existing directory without
    /// `exist_ok` is an `AlreadyExists` error.
    fn create_dir(&self, path: &Path, exist_ok: bool) -> io::Result<bool>;

    /// Write a file in a single write, replacing previous content
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Create `link` pointing at `target`
    fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    /// Whether anything (file, directory or link) exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Entry names of a directory, in host order
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Read a text file
    fn read_file(&self, path: &Path) -> io::Result<String>;
}
