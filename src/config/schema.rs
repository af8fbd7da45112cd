use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::otg::configfs::{CONFIGFS_PATH, UDC_PATH};

/// Gadget description file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GadgetFile {
    /// Where the gadget is projected
    pub space: SpaceConfig,
    /// The gadget itself
    pub gadget: GadgetConfig,
}

/// ConfigFS and UDC registry locations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpaceConfig {
    /// ConfigFS mount point (default: /sys/kernel/config)
    pub configfs_path: Option<PathBuf>,
    /// UDC registry (default: /sys/class/udc)
    pub udc_path: Option<PathBuf>,
}

impl SpaceConfig {
    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: SpaceConfig) -> SpaceConfig {
        SpaceConfig {
            configfs_path: self.configfs_path.or(fallback.configfs_path),
            udc_path: self.udc_path.or(fallback.udc_path),
        }
    }

    pub fn configfs_path(&self) -> PathBuf {
        self.configfs_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIGFS_PATH))
    }

    pub fn udc_path(&self) -> PathBuf {
        self.udc_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(UDC_PATH))
    }
}

/// Gadget configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GadgetConfig {
    /// Gadget directory name under usb_gadget/
    pub name: String,
    /// Controller to bind right after creation
    pub udc: Option<String>,
    /// USB device descriptor
    pub attrs: Option<DeviceAttrsConfig>,
    /// Device strings (language 0x409)
    pub strings: Option<DeviceStringsConfig>,
    /// Declared functions
    pub functions: Vec<FunctionConfig>,
    /// Declared configurations
    pub configs: Vec<ConfigEntry>,
}

/// USB device descriptor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceAttrsConfig {
    /// USB version in BCD (e.g., 0x0200)
    pub bcd_usb: Option<u16>,
    pub device_class: Option<u8>,
    pub device_subclass: Option<u8>,
    pub device_protocol: Option<u8>,
    pub max_packet_size0: Option<u8>,
    /// USB Vendor ID (e.g., 0x1d6b)
    pub vendor_id: Option<u16>,
    /// USB Product ID (e.g., 0x0104)
    pub product_id: Option<u16>,
    /// Device release number
    pub bcd_device: Option<u16>,
}

/// Device strings configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceStringsConfig {
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serialnumber: Option<String>,
}

/// Function configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionConfig {
    /// Function type (e.g., "hid", "ecm", "mass_storage")
    #[serde(rename = "type")]
    pub kind: String,
    /// Instance name (e.g., "usb0")
    pub instance: String,
    /// Attribute preset ("hid-keyboard", "hid-mouse")
    #[serde(default)]
    pub preset: Option<String>,
    /// Attribute fields, written in order after the preset's
    #[serde(default)]
    pub attrs: Vec<FieldConfig>,
}

/// One attribute file of a function
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldConfig {
    /// File name
    pub name: String,
    /// Value; a missing value means the file is not written
    #[serde(default)]
    pub value: Option<ValueConfig>,
    /// Display transform ("hex8", "hex12", "hex16")
    #[serde(default)]
    pub repr: Option<String>,
    /// Keep the field in memory but never write it
    #[serde(default)]
    pub omit: bool,
}

/// Attribute value: integer, text or byte array
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValueConfig {
    Int(u32),
    Text(String),
    Bytes(Vec<u8>),
}

/// Configuration entry (`<name>.<number>` under configs/)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    #[serde(default = "default_config_name")]
    pub name: String,
    pub number: u8,
    /// Maximum power in mA
    #[serde(default)]
    pub max_power: Option<u16>,
    #[serde(default)]
    pub bm_attributes: Option<u8>,
    /// Configuration description string
    #[serde(default)]
    pub description: Option<String>,
    /// Full identifiers of bound functions (e.g., "hid.usb0")
    #[serde(default)]
    pub functions: Vec<String>,
}

fn default_config_name() -> String {
    "c".to_string()
}
