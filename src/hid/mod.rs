//! HID keyboard support for gadget device nodes
//!
//! Converts text into boot keyboard input reports and writes them to the
//! device node the kernel creates for a HID function (e.g. `/dev/hidg0`).

pub mod keyboard;
pub mod keymap;

pub use keyboard::{KeyboardReport, ReportWriter};
pub use keymap::ascii_to_usb;
