//! In-memory control surface
//!
//! Records every mutating operation in issue order. Used by tests and by
//! dry runs of the CLI.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::surface::ControlSurface;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
    Link(PathBuf),
}

/// A mutating operation applied to the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    CreateDir(PathBuf),
    WriteFile(PathBuf, Vec<u8>),
    Symlink { target: PathBuf, link: PathBuf },
}

impl SurfaceOp {
    pub fn path(&self) -> &Path {
        match self {
            SurfaceOp::CreateDir(path) | SurfaceOp::WriteFile(path, _) => path,
            SurfaceOp::Symlink { link, .. } => link,
        }
    }
}

impl fmt::Display for SurfaceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceOp::CreateDir(path) => write!(f, "mkdir   {}", path.display()),
            SurfaceOp::WriteFile(path, data) => match std::str::from_utf8(data) {
                Ok(text) => write!(f, "write   {} = {:?}", path.display(), text),
                Err(_) => write!(f, "write   {} = <{} bytes>", path.display(), data.len()),
            },
            SurfaceOp::Symlink { target, link } => {
                write!(f, "symlink {} -> {}", link.display(), target.display())
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<PathBuf, Node>,
    ops: Vec<SurfaceOp>,
}

impl Inner {
    fn is_dir(&self, path: &Path) -> bool {
        path.parent().is_none() || matches!(self.nodes.get(path), Some(Node::Dir))
    }

    fn require_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !self.is_dir(parent) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent directory of {} does not exist", path.display()),
            )),
            _ => Ok(()),
        }
    }
}

/// In-memory [`ControlSurface`]
///
/// Clones share the same tree, so a test can keep a handle while a
/// [`GadgetSpace`](super::space::GadgetSpace) owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory (and parents) without recording it
    pub fn seed_dir(&self, path: impl AsRef<Path>) {
        let mut inner = self.inner.lock();
        for ancestor in path.as_ref().ancestors() {
            if ancestor.parent().is_some() {
                inner.nodes.insert(ancestor.to_path_buf(), Node::Dir);
            }
        }
    }

    /// Create a file (and parent directories) without recording it
    pub fn seed_file(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.seed_dir(parent);
        }
        self.inner
            .lock()
            .nodes
            .insert(path.to_path_buf(), Node::File(data.into()));
    }

    /// Recorded operations, in issue order
    pub fn ops(&self) -> Vec<SurfaceOp> {
        self.inner.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.inner.lock().ops.clear();
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.inner.lock().is_dir(path.as_ref())
    }

    /// Content of a regular file
    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.inner.lock().nodes.get(path.as_ref()) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Target of a symbolic link
    pub fn link_target(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        match self.inner.lock().nodes.get(path.as_ref()) {
            Some(Node::Link(target)) => Some(target.clone()),
            _ => None,
        }
    }

    /// Every path in the tree, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.inner.lock().nodes.keys().cloned().collect()
    }
}

impl ControlSurface for MemorySurface {
    fn create_dir(&self, path: &Path, exist_ok: bool) -> io::Result<bool> {
        let mut inner = self.inner.lock();
        match inner.nodes.get(path) {
            Some(Node::Dir) if exist_ok => return Ok(false),
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} already exists", path.display()),
                ))
            }
            None => {}
        }

        let mut missing: Vec<PathBuf> = Vec::new();
        for ancestor in path.ancestors() {
            if ancestor.parent().is_none() {
                break;
            }
            match inner.nodes.get(ancestor) {
                None => missing.push(ancestor.to_path_buf()),
                Some(Node::Dir) => break,
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("{} is not a directory", ancestor.display()),
                    ))
                }
            }
        }

        for dir in missing.into_iter().rev() {
            inner.nodes.insert(dir.clone(), Node::Dir);
            inner.ops.push(SurfaceOp::CreateDir(dir));
        }
        Ok(true)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.require_parent(path)?;
        if matches!(inner.nodes.get(path), Some(Node::Dir)) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            ));
        }
        inner
            .nodes
            .insert(path.to_path_buf(), Node::File(data.to_vec()));
        inner
            .ops
            .push(SurfaceOp::WriteFile(path.to_path_buf(), data.to_vec()));
        Ok(())
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.require_parent(link)?;
        if inner.nodes.contains_key(link) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", link.display()),
            ));
        }
        inner
            .nodes
            .insert(link.to_path_buf(), Node::Link(target.to_path_buf()));
        inner.ops.push(SurfaceOp::Symlink {
            target: target.to_path_buf(),
            link: link.to_path_buf(),
        });
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.lock();
        path.parent().is_none() || inner.nodes.contains_key(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let inner = self.inner.lock();
        if !inner.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", path.display()),
            ));
        }
        Ok(inner
            .nodes
            .keys()
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect())
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        match self.inner.lock().nodes.get(path) {
            Some(Node::File(data)) => Ok(String::from_utf8_lossy(data).to_string()),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a file", path.display()),
            )),
        }
    }
}
