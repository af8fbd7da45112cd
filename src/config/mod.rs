//! Declarative gadget descriptions
//!
//! A description file (TOML, or JSON when the extension is `.json`) holds the
//! gadget space locations and the gadget tree. [`GadgetConfig::build`] turns the
//! tree into an in-memory [`Gadget`].

mod schema;

pub use schema::*;

use std::path::Path;

use tracing::debug;

use crate::error::{GadgetError, Result};
use crate::otg::{
    AttrValue, Config, ConfigAttributes, ConfigStrings, DeviceAttributes, DeviceStrings,
    FieldDescriptor, Function, FunctionAttributes, Gadget, HidFunctionType, Repr,
};

/// Environment variable overriding the default ConfigFS mount point
pub const ENV_CONFIGFS_PATH: &str = "GADGET_CONFIGFS_PATH";
/// Environment variable overriding the default UDC registry
pub const ENV_UDC_PATH: &str = "GADGET_UDC_PATH";

/// Load a description file
pub fn load(path: &Path) -> Result<GadgetFile> {
    let content = std::fs::read_to_string(path).map_err(|e| GadgetError::io(path, e))?;
    debug!("Loaded gadget description from {}", path.display());
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => from_json_str(&content),
        _ => from_toml_str(&content),
    }
}

pub fn from_toml_str(content: &str) -> Result<GadgetFile> {
    Ok(toml::from_str(content)?)
}

pub fn from_json_str(content: &str) -> Result<GadgetFile> {
    Ok(serde_json::from_str(content)?)
}

impl SpaceConfig {
    /// Locations taken from the environment
    pub fn from_env() -> SpaceConfig {
        SpaceConfig {
            configfs_path: std::env::var_os(ENV_CONFIGFS_PATH).map(Into::into),
            udc_path: std::env::var_os(ENV_UDC_PATH).map(Into::into),
        }
    }
}

impl From<&ValueConfig> for AttrValue {
    fn from(value: &ValueConfig) -> Self {
        match value {
            ValueConfig::Int(v) => AttrValue::Int(*v),
            ValueConfig::Text(s) => AttrValue::Text(s.clone()),
            ValueConfig::Bytes(b) => AttrValue::Bytes(b.clone()),
        }
    }
}

impl DeviceAttrsConfig {
    fn build(&self) -> DeviceAttributes {
        DeviceAttributes {
            bcd_usb: self.bcd_usb,
            device_class: self.device_class,
            device_subclass: self.device_subclass,
            device_protocol: self.device_protocol,
            max_packet_size0: self.max_packet_size0,
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            bcd_device: self.bcd_device,
        }
    }
}

impl DeviceStringsConfig {
    fn build(&self) -> DeviceStrings {
        let mut strings = DeviceStrings::default();
        strings.manufacturer = self.manufacturer.clone();
        strings.product = self.product.clone();
        strings.serialnumber = self.serialnumber.clone();
        strings
    }
}

impl FunctionConfig {
    fn build(&self) -> Result<Function> {
        let mut attrs = match &self.preset {
            Some(preset) => {
                let hid: HidFunctionType = preset.parse()?;
                if self.kind != crate::otg::hid::HID_FUNCTION_TYPE {
                    return Err(GadgetError::Config(format!(
                        "preset {} requires function type hid, got {}",
                        preset, self.kind
                    )));
                }
                Some(hid.attributes())
            }
            None => None,
        };

        for field in &self.attrs {
            let repr: Repr = field.repr.as_deref().unwrap_or_default().parse()?;
            let desc = FieldDescriptor {
                name: field.name.clone().into(),
                repr,
                omit: field.omit,
            };
            attrs
                .get_or_insert_with(FunctionAttributes::new)
                .set_field(desc, field.value.as_ref().map(Into::into));
        }

        let mut function = Function::new(&self.kind, &self.instance);
        function.attrs = attrs;
        Ok(function)
    }
}

impl ConfigEntry {
    fn build(&self) -> Config {
        let mut config = Config::new(&self.name, self.number);
        if self.max_power.is_some() || self.bm_attributes.is_some() {
            config.attrs = Some(ConfigAttributes {
                max_power: self.max_power,
                bm_attributes: self.bm_attributes,
            });
        }
        if let Some(description) = &self.description {
            config.strings = Some(ConfigStrings::new(description));
        }
        config
    }
}

impl GadgetConfig {
    /// Build the in-memory gadget tree
    pub fn build(&self) -> Result<Gadget> {
        let mut gadget = Gadget::new(&self.name);
        gadget.attrs = self.attrs.as_ref().map(DeviceAttrsConfig::build);
        gadget.strings = self.strings.as_ref().map(DeviceStringsConfig::build);
        if let Some(udc) = &self.udc {
            gadget = gadget.with_udc(udc);
        }

        for function in &self.functions {
            gadget.add_function(function.build()?);
        }
        for entry in &self.configs {
            let config = entry.build();
            let full_name = config.full_name().to_string();
            gadget.add_config(config);
            for function in &entry.functions {
                gadget.bind_function(&full_name, function)?;
            }
        }

        gadget.validate()?;
        Ok(gadget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otg::{serialize, FileContent};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[space]
configfs_path = "/tmp/config"

[gadget]
name = "g1"

[gadget.attrs]
bcd_usb = 0x0200
vendor_id = 0x1d6b
product_id = 0x0104

[gadget.strings]
manufacturer = "Acme"
product = "Keys"
serialnumber = "0001"

[[gadget.functions]]
type = "hid"
instance = "usb0"
preset = "hid-keyboard"

[[gadget.functions]]
type = "ecm"
instance = "usb0"

[[gadget.functions.attrs]]
name = "host_addr"
value = "48:6f:73:74:50:43"

[[gadget.functions.attrs]]
name = "qmult"
value = 10
repr = "hex12"

[[gadget.configs]]
number = 1
max_power = 250
description = "Keyboard + network"
functions = ["hid.usb0", "ecm.usb0"]
"#;

    #[test]
    fn test_build_from_toml() {
        let file = from_toml_str(SAMPLE).unwrap();
        assert_eq!(file.space.configfs_path, Some(PathBuf::from("/tmp/config")));
        assert_eq!(file.space.udc_path(), PathBuf::from("/sys/class/udc"));

        let gadget = file.gadget.build().unwrap();
        assert_eq!(gadget.name(), "g1");
        assert_eq!(gadget.udc(), None);
        assert_eq!(gadget.attrs.as_ref().unwrap().vendor_id, Some(0x1d6b));
        assert_eq!(gadget.functions().len(), 2);

        let config = &gadget.configs()[0];
        assert_eq!(config.full_name(), "c.1");
        assert_eq!(config.functions(), ["hid.usb0", "ecm.usb0"]);
        assert_eq!(config.attrs.as_ref().unwrap().max_power, Some(250));

        let ecm = gadget.function("ecm.usb0").unwrap();
        let map = serialize(ecm.attrs.as_ref().unwrap());
        assert_eq!(
            map.get("host_addr"),
            Some(&FileContent::Text("48:6f:73:74:50:43\n".into()))
        );
        assert_eq!(map.get("qmult"), Some(&FileContent::Text("0x00a\n".into())));

        let hid = gadget.function("hid.usb0").unwrap();
        let map = serialize(hid.attrs.as_ref().unwrap());
        assert_eq!(map.get("report_length"), Some(&FileContent::Text("8\n".into())));
    }

    #[test]
    fn test_unknown_repr_is_fatal() {
        let content = r#"
[gadget]
name = "g1"

[[gadget.functions]]
type = "acm"
instance = "usb0"
attrs = [{ name = "x", value = 1, repr = "hex20" }]
"#;
        let file = from_toml_str(content).unwrap();
        assert!(matches!(file.gadget.build(), Err(GadgetError::Config(_))));
    }

    #[test]
    fn test_unknown_function_reference() {
        let content = r#"
[gadget]
name = "g1"

[[gadget.configs]]
number = 1
functions = ["hid.usb0"]
"#;
        let file = from_toml_str(content).unwrap();
        match file.gadget.build() {
            Err(GadgetError::UnknownFunction { config, function }) => {
                assert_eq!(config, "c.1");
                assert_eq!(function, "hid.usb0");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_name() {
        let file = from_toml_str("[gadget]\n").unwrap();
        assert!(matches!(file.gadget.build(), Err(GadgetError::Config(_))));
    }

    #[test]
    fn test_byte_values_and_omit() {
        let content = r#"
[gadget]
name = "g1"

[[gadget.functions]]
type = "hid"
instance = "usb0"
attrs = [
    { name = "report_desc", value = [5, 1, 9, 6] },
    { name = "note", value = "memory only", omit = true },
    { name = "unset" },
]
"#;
        let gadget = from_toml_str(content).unwrap().gadget.build().unwrap();
        let map = serialize(gadget.functions()[0].attrs.as_ref().unwrap());
        assert_eq!(map.names().collect::<Vec<_>>(), ["report_desc"]);
        assert_eq!(
            map.get("report_desc"),
            Some(&FileContent::Binary(vec![5, 1, 9, 6]))
        );
    }

    #[test]
    fn test_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gadget.json");
        std::fs::write(
            &path,
            r#"{"gadget": {"name": "g1", "udc": "dummy_udc.0",
                "functions": [{"type": "hid", "instance": "usb0", "preset": "hid-mouse"}],
                "configs": [{"number": 1, "functions": ["hid.usb0"]}]}}"#,
        )
        .unwrap();

        let gadget = load(&path).unwrap().gadget.build().unwrap();
        assert_eq!(gadget.udc(), Some("dummy_udc.0"));
        assert_eq!(gadget.configs()[0].functions(), ["hid.usb0"]);
    }

    #[test]
    fn test_preset_requires_hid_type() {
        let content = r#"
[gadget]
name = "g1"

[[gadget.functions]]
type = "ecm"
instance = "usb0"
preset = "hid-keyboard"
"#;
        let file = from_toml_str(content).unwrap();
        assert!(matches!(file.gadget.build(), Err(GadgetError::Config(_))));
    }

    #[test]
    fn test_space_layering() {
        let cli = SpaceConfig {
            configfs_path: Some("/cli".into()),
            udc_path: None,
        };
        let file = SpaceConfig {
            configfs_path: Some("/file".into()),
            udc_path: Some("/file-udc".into()),
        };
        let merged = cli.or(file);
        assert_eq!(merged.configfs_path(), PathBuf::from("/cli"));
        assert_eq!(merged.udc_path(), PathBuf::from("/file-udc"));
        assert_eq!(
            SpaceConfig::default().configfs_path(),
            PathBuf::from("/sys/kernel/config")
        );
    }
}
