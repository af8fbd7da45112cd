//! USB Gadget configuration entity

use super::attrs::{ConfigAttributes, ConfigStrings};
use super::function::Function;

/// A gadget configuration, e.g. `c.1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    name: String,
    number: u8,
    full_name: String,
    pub attrs: Option<ConfigAttributes>,
    pub strings: Option<ConfigStrings>,
    /// Full identifiers of bound functions, in link order
    functions: Vec<String>,
}

impl Config {
    pub fn new(name: impl Into<String>, number: u8) -> Self {
        let name = name.into();
        let full_name = format!("{}.{}", name, number);
        Self {
            name,
            number,
            full_name,
            attrs: None,
            strings: None,
            functions: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: ConfigAttributes) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn with_strings(mut self, strings: ConfigStrings) -> Self {
        self.strings = Some(strings);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// Directory name under `configs/`
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Reference a function from this configuration.
    ///
    /// Only the identifier is recorded; the function itself stays owned by
    /// the gadget. Binding the same function twice is a no-op.
    pub fn bind_function(&mut self, function: &Function) {
        self.bind_function_id(function.full_name());
    }

    pub(crate) fn bind_function_id(&mut self, full_name: &str) {
        if !self.functions.iter().any(|f| f == full_name) {
            self.functions.push(full_name.to_string());
        }
    }

    /// Bound function identifiers
    pub fn functions(&self) -> &[String] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let config = Config::new("c", 1);
        assert_eq!(config.full_name(), "c.1");
        assert_eq!(config.name(), "c");
        assert_eq!(config.number(), 1);
    }

    #[test]
    fn test_bind_function_by_reference() {
        let hid = Function::new("hid", "usb0");
        let ecm = Function::new("ecm", "usb0");

        let mut c1 = Config::new("c", 1);
        let mut c2 = Config::new("c", 2);
        c1.bind_function(&hid);
        c1.bind_function(&ecm);
        c1.bind_function(&hid);
        c2.bind_function(&hid);

        assert_eq!(c1.functions(), ["hid.usb0", "ecm.usb0"]);
        assert_eq!(c2.functions(), ["hid.usb0"]);
    }
}
