//! HID function presets for USB Gadget

use std::path::PathBuf;
use std::str::FromStr;

use super::attrs::FunctionAttributes;
use super::function::Function;
use super::report_desc::{KEYBOARD, MOUSE_RELATIVE};
use crate::error::{GadgetError, Result};

/// ConfigFS function type of HID functions
pub const HID_FUNCTION_TYPE: &str = "hid";

/// HID function type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidFunctionType {
    /// Boot keyboard with LED output
    Keyboard,
    /// Relative mouse (traditional mouse movement)
    MouseRelative,
}

impl HidFunctionType {
    /// Get HID protocol
    pub fn protocol(&self) -> u8 {
        match self {
            HidFunctionType::Keyboard => 1,
            HidFunctionType::MouseRelative => 2,
        }
    }

    /// Get HID subclass
    pub fn subclass(&self) -> u8 {
        match self {
            HidFunctionType::Keyboard => 1,
            HidFunctionType::MouseRelative => 1,
        }
    }

    /// Get report length in bytes
    pub fn report_length(&self) -> u8 {
        match self {
            HidFunctionType::Keyboard => 8,
            HidFunctionType::MouseRelative => 4,
        }
    }

    pub fn report_desc(&self) -> &'static [u8] {
        match self {
            HidFunctionType::Keyboard => KEYBOARD,
            HidFunctionType::MouseRelative => MOUSE_RELATIVE,
        }
    }

    /// Function attributes for this HID type
    pub fn attributes(&self) -> FunctionAttributes {
        match self {
            HidFunctionType::Keyboard => FunctionAttributes::hid_keyboard(),
            HidFunctionType::MouseRelative => FunctionAttributes::hid_mouse(),
        }
    }

    fn build_attributes(&self) -> FunctionAttributes {
        FunctionAttributes::new()
            .with("protocol", self.protocol())
            .with("subclass", self.subclass())
            .with("report_length", self.report_length())
            .with("report_desc", self.report_desc())
    }

    /// HID function with these attributes, e.g. `hid.usb0`
    pub fn function(&self, instance: impl Into<String>) -> Function {
        Function::new(HID_FUNCTION_TYPE, instance).with_attrs(self.attributes())
    }
}

impl FromStr for HidFunctionType {
    type Err = GadgetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hid-keyboard" => Ok(HidFunctionType::Keyboard),
            "hid-mouse" => Ok(HidFunctionType::MouseRelative),
            other => Err(GadgetError::Config(format!("unknown function preset: {}", other))),
        }
    }
}

impl FunctionAttributes {
    /// Boot keyboard attributes
    pub fn hid_keyboard() -> Self {
        HidFunctionType::Keyboard.build_attributes()
    }

    /// Relative mouse attributes
    pub fn hid_mouse() -> Self {
        HidFunctionType::MouseRelative.build_attributes()
    }
}

/// Device node the kernel creates for the n-th HID function (e.g. /dev/hidg0)
pub fn device_path(index: u8) -> PathBuf {
    PathBuf::from(format!("/dev/hidg{}", index))
}

/// Device node from a path or a bare function index (`"0"` is `/dev/hidg0`)
pub fn device_node(device: &str) -> PathBuf {
    match device.parse::<u8>() {
        Ok(index) => device_path(index),
        Err(_) => PathBuf::from(device),
    }
}
