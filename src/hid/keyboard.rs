//! Boot keyboard report writer for HID gadget device nodes

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::keymap::ascii_to_usb;
use crate::error::{GadgetError, Result};

/// Boot keyboard input report (8 bytes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    /// Modifier byte
    pub modifiers: u8,
    /// Reserved byte
    pub reserved: u8,
    /// Key codes (up to 6 simultaneous keys)
    pub keys: [u8; 6],
}

impl KeyboardReport {
    /// Report with a single key pressed
    pub fn key(modifiers: u8, key: u8) -> Self {
        Self {
            modifiers,
            reserved: 0,
            keys: [key, 0, 0, 0, 0, 0],
        }
    }

    /// All keys released
    pub fn release() -> Self {
        Self::default()
    }

    /// Convert to bytes for USB HID
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.modifiers;
        bytes[1] = self.reserved;
        bytes[2..].copy_from_slice(&self.keys);
        bytes
    }
}

/// Writes keyboard reports to a HID gadget device (e.g. /dev/hidg0)
pub struct ReportWriter<W: Write> {
    path: PathBuf,
    device: W,
}

impl ReportWriter<File> {
    /// Open a HID gadget device node
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| GadgetError::io(path, e))?;
        Ok(Self::new(path, device))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(path: impl Into<PathBuf>, device: W) -> Self {
        Self {
            path: path.into(),
            device,
        }
    }

    /// Send a single report; each report is one write
    pub fn send(&mut self, report: &KeyboardReport) -> Result<()> {
        self.device
            .write_all(&report.to_bytes())
            .and_then(|_| self.device.flush())
            .map_err(|e| GadgetError::io(&self.path, e))
    }

    /// Type text: a key press followed by a release for every character.
    ///
    /// Upper-case letters and shifted symbols carry the shift modifier.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        debug!("Typing {} characters to {}", text.chars().count(), self.path.display());
        for c in text.chars() {
            let (modifiers, key) = ascii_to_usb(c).ok_or(GadgetError::UnmappedChar(c))?;
            self.send(&KeyboardReport::key(modifiers, key))?;
            self.send(&KeyboardReport::release())?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keymap::SHIFT;

    #[test]
    fn test_report_bytes() {
        let report = KeyboardReport::key(0x20, 0x13);
        assert_eq!(report.to_bytes(), [0x20, 0, 0x13, 0, 0, 0, 0, 0]);
        assert_eq!(KeyboardReport::release().to_bytes(), [0u8; 8]);
    }

    #[test]
    fn test_write_text() {
        let mut writer = ReportWriter::new("test", Vec::new());
        writer.write_text("Py").unwrap();
        let out = writer.into_inner();

        assert_eq!(out.len(), 32);
        assert_eq!(&out[0..8], &[SHIFT, 0, 0x13, 0, 0, 0, 0, 0]);
        assert_eq!(&out[8..16], &[0u8; 8]);
        assert_eq!(&out[16..24], &[0, 0, 0x1C, 0, 0, 0, 0, 0]);
        assert_eq!(&out[24..32], &[0u8; 8]);
    }

    #[test]
    fn test_unmapped_char_stops_typing() {
        let mut writer = ReportWriter::new("test", Vec::new());
        let err = writer.write_text("a\u{e9}b").unwrap_err();
        assert!(matches!(err, GadgetError::UnmappedChar('\u{e9}')));
        assert_eq!(writer.into_inner().len(), 16);
    }
}
