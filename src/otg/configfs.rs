//! ConfigFS file operations for USB Gadget

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::surface::ControlSurface;

/// ConfigFS mount point
pub const CONFIGFS_PATH: &str = "/sys/kernel/config";

/// Registry of USB Device Controllers
pub const UDC_PATH: &str = "/sys/class/udc";

/// Check if the gadget subtree of a ConfigFS mount is available
pub fn is_configfs_available(configfs_path: &Path) -> bool {
    configfs_path.join("usb_gadget").exists()
}

/// The host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct SysFs;

impl ControlSurface for SysFs {
    fn create_dir(&self, path: &Path, exist_ok: bool) -> io::Result<bool> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::create_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && exist_ok && path.is_dir() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// ConfigFS attributes are parsed on the first write() call, so the whole
    /// buffer (newline included) goes out in one `write_all`.
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(data)?;
        file.flush()
    }

    fn create_symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
            .collect()
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_dir_exist_ok() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/c");

        assert!(SysFs.create_dir(&path, false).unwrap());
        assert!(path.is_dir());

        let err = SysFs.create_dir(&path, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(!SysFs.create_dir(&path, true).unwrap());
    }

    #[test]
    fn test_write_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("idVendor");

        SysFs.write_file(&path, b"0x1d6b\n").unwrap();
        SysFs.write_file(&path, b"1\n").unwrap();
        assert_eq!(SysFs.read_file(&path).unwrap(), "1\n");
    }

    #[test]
    fn test_symlink_and_listing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("functions/hid.usb0");
        let link = temp_dir.path().join("hid.usb0");
        SysFs.create_dir(&target, false).unwrap();

        assert!(!SysFs.exists(&link));
        SysFs.create_symlink(&target, &link).unwrap();
        assert!(SysFs.exists(&link));
        assert_eq!(fs::read_link(&link).unwrap(), target);

        let err = SysFs.create_symlink(&target, &link).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        let mut names = SysFs.list_dir(temp_dir.path()).unwrap();
        names.sort();
        assert_eq!(names, ["functions", "hid.usb0"]);
    }
}
