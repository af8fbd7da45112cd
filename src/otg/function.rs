//! USB Gadget function entity

use super::attrs::FunctionAttributes;

/// A gadget function, e.g. `hid.usb0` or `mass_storage.usb0`
///
/// Functions are declared on the gadget and referenced by configurations
/// through their full identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function type (e.g. "hid", "ecm", "mass_storage")
    kind: String,
    /// Instance name (e.g. "usb0")
    instance: String,
    /// Cached `type.instance` identifier
    full_name: String,
    /// Function attributes
    pub attrs: Option<FunctionAttributes>,
}

impl Function {
    pub fn new(kind: impl Into<String>, instance: impl Into<String>) -> Self {
        let kind = kind.into();
        let instance = instance.into();
        let full_name = format!("{}.{}", kind, instance);
        Self {
            kind,
            instance,
            full_name,
            attrs: None,
        }
    }

    pub fn with_attrs(mut self, attrs: FunctionAttributes) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Function type name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Directory name under `functions/`
    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}
