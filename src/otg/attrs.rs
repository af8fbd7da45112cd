//! Attribute records and their serialization into ConfigFS files
//!
//! Every record kind (device, configuration, function, strings) publishes a
//! descriptor table: one [`FieldDescriptor`] per ConfigFS file, carrying the
//! display transform and the omission flag. [`serialize`] is the single routine
//! that turns any record into an ordered file name → content mapping.

use std::borrow::Cow;
use std::str::FromStr;

use crate::error::{GadgetError, Result};

/// Language tag of the strings subdirectory (US English)
pub const DEFAULT_LANG: &str = "0x409";

/// Display transform applied to integer values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Repr {
    /// Decimal
    #[default]
    Plain,
    /// `0x` + 2 hex digits
    Hex8,
    /// `0x` + 3 hex digits
    Hex12,
    /// `0x` + 4 hex digits
    Hex16,
}

impl Repr {
    /// Number of hex digits for this transform, `None` for decimal
    pub fn digits(self) -> Option<usize> {
        match self {
            Repr::Plain => None,
            Repr::Hex8 => Some(2),
            Repr::Hex12 => Some(3),
            Repr::Hex16 => Some(4),
        }
    }

    /// Render a value into file content.
    ///
    /// The transform only applies to integers; text and bytes are written verbatim.
    pub fn render(self, value: &AttrValue) -> FileContent {
        match value {
            AttrValue::Bytes(data) => FileContent::Binary(data.clone()),
            AttrValue::Text(text) => FileContent::Text(format!("{}\n", text)),
            AttrValue::Int(v) => match self.digits() {
                Some(width) => FileContent::Text(format!("0x{:0width$x}\n", v, width = width)),
                None => FileContent::Text(format!("{}\n", v)),
            },
        }
    }
}

impl FromStr for Repr {
    type Err = GadgetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" | "plain" => Ok(Repr::Plain),
            "hex8" => Ok(Repr::Hex8),
            "hex12" => Ok(Repr::Hex12),
            "hex16" => Ok(Repr::Hex16),
            other => Err(GadgetError::Config(format!(
                "unknown attribute transform: {}",
                other
            ))),
        }
    }
}

/// Scalar attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Int(u32),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<&[u8]> for AttrValue {
    fn from(v: &[u8]) -> Self {
        AttrValue::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(v: Vec<u8>) -> Self {
        AttrValue::Bytes(v)
    }
}

/// Render-ready content of one attribute file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Text, newline already appended
    Text(String),
    /// Raw bytes, written as-is
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Binary(data) => data,
        }
    }
}

/// Per-field metadata of an attribute record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// ConfigFS file name
    pub name: Cow<'static, str>,
    /// Display transform
    pub repr: Repr,
    /// Kept in memory but never written (e.g. the language tag)
    pub omit: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, repr: Repr) -> Self {
        Self {
            name: Cow::Borrowed(name),
            repr,
            omit: false,
        }
    }

    pub const fn omitted(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            repr: Repr::Plain,
            omit: true,
        }
    }
}

/// A record that can be projected as a set of attribute files
pub trait AttributeRecord {
    /// Field descriptors, in file write order
    fn descriptors(&self) -> &[FieldDescriptor];

    /// Current value of a field, `None` when unset
    fn value(&self, name: &str) -> Option<AttrValue>;
}

/// Ordered mapping of file name to content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrMap(Vec<(String, FileContent)>);

impl AttrMap {
    pub fn get(&self, name: &str) -> Option<&FileContent> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileContent)> {
        self.0.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serialize a record into its attribute files.
///
/// Unset fields never appear. Omitted fields never appear either, set or not.
pub fn serialize(record: &dyn AttributeRecord) -> AttrMap {
    let mut files = Vec::with_capacity(record.descriptors().len());
    for desc in record.descriptors() {
        if desc.omit {
            continue;
        }
        if let Some(value) = record.value(&desc.name) {
            files.push((desc.name.to_string(), desc.repr.render(&value)));
        }
    }
    AttrMap(files)
}

const DEVICE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("bcdUSB", Repr::Hex16),
    FieldDescriptor::new("bDeviceClass", Repr::Hex8),
    FieldDescriptor::new("bDeviceSubClass", Repr::Hex8),
    FieldDescriptor::new("bDeviceProtocol", Repr::Hex8),
    FieldDescriptor::new("bMaxPacketSize0", Repr::Plain),
    FieldDescriptor::new("idVendor", Repr::Hex16),
    FieldDescriptor::new("idProduct", Repr::Hex16),
    FieldDescriptor::new("bcdDevice", Repr::Hex16),
];

/// USB device descriptor attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAttributes {
    pub bcd_usb: Option<u16>,
    pub device_class: Option<u8>,
    pub device_subclass: Option<u8>,
    pub device_protocol: Option<u8>,
    pub max_packet_size0: Option<u8>,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub bcd_device: Option<u16>,
}

impl AttributeRecord for DeviceAttributes {
    fn descriptors(&self) -> &[FieldDescriptor] {
        DEVICE_FIELDS
    }

    fn value(&self, name: &str) -> Option<AttrValue> {
        match name {
            "bcdUSB" => self.bcd_usb.map(Into::into),
            "bDeviceClass" => self.device_class.map(Into::into),
            "bDeviceSubClass" => self.device_subclass.map(Into::into),
            "bDeviceProtocol" => self.device_protocol.map(Into::into),
            "bMaxPacketSize0" => self.max_packet_size0.map(Into::into),
            "idVendor" => self.vendor_id.map(Into::into),
            "idProduct" => self.product_id.map(Into::into),
            "bcdDevice" => self.bcd_device.map(Into::into),
            _ => None,
        }
    }
}

const DEVICE_STRING_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("manufacturer", Repr::Plain),
    FieldDescriptor::new("product", Repr::Plain),
    FieldDescriptor::new("serialnumber", Repr::Plain),
    FieldDescriptor::omitted("lang"),
];

/// Device string descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStrings {
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serialnumber: Option<String>,
    lang: &'static str,
}

impl DeviceStrings {
    pub fn new(
        manufacturer: impl Into<String>,
        product: impl Into<String>,
        serialnumber: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: Some(manufacturer.into()),
            product: Some(product.into()),
            serialnumber: Some(serialnumber.into()),
            lang: DEFAULT_LANG,
        }
    }

    /// Name of the language subdirectory
    pub fn lang(&self) -> &str {
        self.lang
    }
}

impl Default for DeviceStrings {
    fn default() -> Self {
        Self {
            manufacturer: None,
            product: None,
            serialnumber: None,
            lang: DEFAULT_LANG,
        }
    }
}

impl AttributeRecord for DeviceStrings {
    fn descriptors(&self) -> &[FieldDescriptor] {
        DEVICE_STRING_FIELDS
    }

    fn value(&self, name: &str) -> Option<AttrValue> {
        match name {
            "manufacturer" => self.manufacturer.as_deref().map(Into::into),
            "product" => self.product.as_deref().map(Into::into),
            "serialnumber" => self.serialnumber.as_deref().map(Into::into),
            "lang" => Some(self.lang.into()),
            _ => None,
        }
    }
}

const CONFIG_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("MaxPower", Repr::Plain),
    FieldDescriptor::new("bmAttributes", Repr::Hex8),
];

/// Configuration descriptor attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigAttributes {
    /// Maximum power draw in mA
    pub max_power: Option<u16>,
    pub bm_attributes: Option<u8>,
}

impl ConfigAttributes {
    pub fn with_max_power(max_power: u16) -> Self {
        Self {
            max_power: Some(max_power),
            bm_attributes: None,
        }
    }
}

impl AttributeRecord for ConfigAttributes {
    fn descriptors(&self) -> &[FieldDescriptor] {
        CONFIG_FIELDS
    }

    fn value(&self, name: &str) -> Option<AttrValue> {
        match name {
            "MaxPower" => self.max_power.map(Into::into),
            "bmAttributes" => self.bm_attributes.map(Into::into),
            _ => None,
        }
    }
}

const CONFIG_STRING_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::new("configuration", Repr::Plain),
    FieldDescriptor::omitted("lang"),
];

/// Configuration description string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStrings {
    pub configuration: Option<String>,
    lang: &'static str,
}

impl ConfigStrings {
    pub fn new(configuration: impl Into<String>) -> Self {
        Self {
            configuration: Some(configuration.into()),
            lang: DEFAULT_LANG,
        }
    }

    /// Name of the language subdirectory
    pub fn lang(&self) -> &str {
        self.lang
    }
}

impl Default for ConfigStrings {
    fn default() -> Self {
        Self {
            configuration: None,
            lang: DEFAULT_LANG,
        }
    }
}

impl AttributeRecord for ConfigStrings {
    fn descriptors(&self) -> &[FieldDescriptor] {
        CONFIG_STRING_FIELDS
    }

    fn value(&self, name: &str) -> Option<AttrValue> {
        match name {
            "configuration" => self.configuration.as_deref().map(Into::into),
            "lang" => Some(self.lang.into()),
            _ => None,
        }
    }
}

/// Function attributes
///
/// Function types each have their own schema, so the descriptor table is
/// built at runtime instead of being fixed per type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionAttributes {
    descriptors: Vec<FieldDescriptor>,
    values: Vec<Option<AttrValue>>,
}

impl FunctionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decimal/verbatim field
    pub fn with(self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.with_repr(name, value, Repr::Plain)
    }

    /// Add a field with a display transform
    pub fn with_repr(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttrValue>,
        repr: Repr,
    ) -> Self {
        let desc = FieldDescriptor {
            name: Cow::Owned(name.into()),
            repr,
            omit: false,
        };
        self.set_field(desc, Some(value.into()));
        self
    }

    /// Insert or replace a field; a replaced field keeps its position.
    pub fn set_field(&mut self, desc: FieldDescriptor, value: Option<AttrValue>) {
        match self.descriptors.iter().position(|d| d.name == desc.name) {
            Some(idx) => {
                self.descriptors[idx] = desc;
                self.values[idx] = value;
            }
            None => {
                self.descriptors.push(desc);
                self.values.push(value);
            }
        }
    }
}

impl AttributeRecord for FunctionAttributes {
    fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    fn value(&self, name: &str) -> Option<AttrValue> {
        let idx = self.descriptors.iter().position(|d| d.name == name)?;
        self.values[idx].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FileContent {
        FileContent::Text(s.to_string())
    }

    #[test]
    fn test_hex_widths() {
        assert_eq!(Repr::Hex16.render(&1u16.into()), text("0x0001\n"));
        assert_eq!(Repr::Hex12.render(&0x2au32.into()), text("0x02a\n"));
        assert_eq!(Repr::Hex8.render(&255u8.into()), text("0xff\n"));
        assert_eq!(Repr::Hex16.render(&0x1d6bu16.into()), text("0x1d6b\n"));
        assert_eq!(Repr::Plain.render(&500u16.into()), text("500\n"));
    }

    #[test]
    fn test_text_and_bytes_are_verbatim() {
        assert_eq!(Repr::Hex16.render(&"abc".into()), text("abc\n"));
        let raw: &[u8] = &[0x05, 0x01, 0x0a];
        assert_eq!(
            Repr::Hex8.render(&raw.into()),
            FileContent::Binary(vec![0x05, 0x01, 0x0a])
        );
    }

    #[test]
    fn test_repr_from_str() {
        assert_eq!("hex16".parse::<Repr>().unwrap(), Repr::Hex16);
        assert_eq!("hex12".parse::<Repr>().unwrap(), Repr::Hex12);
        assert_eq!("hex8".parse::<Repr>().unwrap(), Repr::Hex8);
        assert!(matches!(
            "hex20".parse::<Repr>(),
            Err(GadgetError::Config(_))
        ));
    }

    #[test]
    fn test_device_attributes_skip_unset() {
        let attrs = DeviceAttributes {
            vendor_id: Some(0x1d6b),
            product_id: Some(0x0104),
            ..Default::default()
        };
        let map = serialize(&attrs);
        assert_eq!(map.names().collect::<Vec<_>>(), ["idVendor", "idProduct"]);
        assert_eq!(map.get("idVendor"), Some(&text("0x1d6b\n")));
        assert_eq!(map.get("bcdUSB"), None);
    }

    #[test]
    fn test_device_attributes_order() {
        let attrs = DeviceAttributes {
            bcd_usb: Some(0x0200),
            device_class: Some(0),
            device_subclass: Some(0),
            device_protocol: Some(0),
            max_packet_size0: Some(64),
            vendor_id: Some(0x1d6b),
            product_id: Some(0x0104),
            bcd_device: Some(0x0100),
        };
        let map = serialize(&attrs);
        assert_eq!(
            map.names().collect::<Vec<_>>(),
            [
                "bcdUSB",
                "bDeviceClass",
                "bDeviceSubClass",
                "bDeviceProtocol",
                "bMaxPacketSize0",
                "idVendor",
                "idProduct",
                "bcdDevice"
            ]
        );
        assert_eq!(map.get("bDeviceClass"), Some(&text("0x00\n")));
        assert_eq!(map.get("bMaxPacketSize0"), Some(&text("64\n")));
    }

    #[test]
    fn test_strings_omit_lang() {
        let strs = DeviceStrings::new("Acme", "Widget", "0001");
        assert_eq!(strs.lang(), DEFAULT_LANG);
        let map = serialize(&strs);
        assert_eq!(
            map.names().collect::<Vec<_>>(),
            ["manufacturer", "product", "serialnumber"]
        );
        assert_eq!(map.get("product"), Some(&text("Widget\n")));

        let empty = serialize(&ConfigStrings::default());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_unset_field_skipped_regardless_of_omit() {
        let mut attrs = FunctionAttributes::new();
        attrs.set_field(FieldDescriptor::new("protocol", Repr::Plain), None);
        attrs.set_field(FieldDescriptor::omitted("hidden"), None);
        attrs.set_field(FieldDescriptor::omitted("shown_never"), Some(1u8.into()));
        assert!(serialize(&attrs).is_empty());
    }

    #[test]
    fn test_function_attributes_replace_keeps_position() {
        let attrs = FunctionAttributes::new()
            .with("protocol", 1u8)
            .with("subclass", 0u8)
            .with_repr("protocol", 2u8, Repr::Hex8);
        let map = serialize(&attrs);
        assert_eq!(map.len(), 2);
        assert_eq!(map.names().collect::<Vec<_>>(), ["protocol", "subclass"]);
        assert_eq!(map.get("protocol"), Some(&text("0x02\n")));
    }
}
