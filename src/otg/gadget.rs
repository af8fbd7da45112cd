//! USB Gadget entity and its lifecycle
//!
//! ```text
//! Unbound --bind_to_space--> Bound --add_to_space--> Materialized --enable--> Active
//! ```
//! Building a gadget has no side effects. Binding to a space is a pure state
//! change; materialization and activation write to the control surface.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::attrs::{DeviceAttributes, DeviceStrings};
use super::config::Config;
use super::function::Function;
use super::space::{Force, GadgetSpace};
use crate::error::{GadgetError, Result};

/// Lifecycle state of a gadget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GadgetState {
    /// No gadget space associated
    Unbound,
    /// Associated with a gadget space, nothing written yet
    Bound,
    /// Tree written to the control surface
    Materialized,
    /// Controller binding written
    Active,
}

/// Result of [`Gadget::add_to_space`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialization {
    /// The whole tree was written
    Created,
    /// A path already existed; materialization stopped there
    AlreadyPresent { path: PathBuf },
}

/// USB Gadget - composition root of functions and configurations
#[derive(Debug, Clone)]
pub struct Gadget {
    name: String,
    /// Device descriptor attributes
    pub attrs: Option<DeviceAttributes>,
    /// Device strings
    pub strings: Option<DeviceStrings>,
    functions: Vec<Function>,
    configs: Vec<Config>,
    /// Controller the gadget is bound to
    udc: Option<String>,
    space: Option<Arc<GadgetSpace>>,
    state: GadgetState,
}

impl Gadget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: None,
            strings: None,
            functions: Vec::new(),
            configs: Vec::new(),
            udc: None,
            space: None,
            state: GadgetState::Unbound,
        }
    }

    pub fn with_attrs(mut self, attrs: DeviceAttributes) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn with_strings(mut self, strings: DeviceStrings) -> Self {
        self.strings = Some(strings);
        self
    }

    /// Preset the controller binding; materialization writes it as its last step.
    pub fn with_udc(mut self, udc: impl Into<String>) -> Self {
        self.udc = Some(udc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> GadgetState {
        self.state
    }

    /// Controller binding, `None` while inactive
    pub fn udc(&self) -> Option<&str> {
        self.udc.as_deref()
    }

    pub fn space(&self) -> Option<&Arc<GadgetSpace>> {
        self.space.as_ref()
    }

    /// Declare a function
    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    /// Declare a configuration
    pub fn add_config(&mut self, config: Config) {
        self.configs.push(config);
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn configs(&self) -> &[Config] {
        &self.configs
    }

    pub fn function(&self, full_name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.full_name() == full_name)
    }

    pub fn config_mut(&mut self, full_name: &str) -> Option<&mut Config> {
        self.configs.iter_mut().find(|c| c.full_name() == full_name)
    }

    /// Bind a declared function into a declared configuration
    pub fn bind_function(&mut self, config: &str, function: &str) -> Result<()> {
        if self.function(function).is_none() {
            return Err(GadgetError::UnknownFunction {
                config: config.to_string(),
                function: function.to_string(),
            });
        }
        let gadget = self.name.clone();
        let config = self.config_mut(config).ok_or_else(|| {
            GadgetError::Config(format!("gadget {} has no configuration {}", gadget, config))
        })?;
        config.bind_function_id(function);
        Ok(())
    }

    /// Check that names are usable directory names, identifiers are unique
    /// and every link target is declared
    pub fn validate(&self) -> Result<()> {
        check_name("gadget", &self.name)?;

        let mut seen = HashSet::new();
        for function in &self.functions {
            check_name("function type", function.kind())?;
            check_name("function instance", function.instance())?;
            if !seen.insert(function.full_name()) {
                return Err(GadgetError::Config(format!(
                    "gadget {} declares function {} twice",
                    self.name,
                    function.full_name()
                )));
            }
        }

        let mut configs = HashSet::new();
        for config in &self.configs {
            check_name("configuration", config.name())?;
            if !configs.insert(config.full_name()) {
                return Err(GadgetError::Config(format!(
                    "gadget {} declares configuration {} twice",
                    self.name,
                    config.full_name()
                )));
            }
            if let Some(missing) = config.functions().iter().find(|f| !seen.contains(f.as_str())) {
                return Err(GadgetError::UnknownFunction {
                    config: config.full_name().to_string(),
                    function: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Associate the gadget with a gadget space.
    ///
    /// Fails if already associated, unless `force` replaces the association.
    pub fn bind_to_space(&mut self, space: Arc<GadgetSpace>, force: bool) -> Result<()> {
        if !force && self.space.is_some() {
            return Err(GadgetError::AlreadyBound {
                gadget: self.name.clone(),
            });
        }
        self.space = Some(space);
        self.state = GadgetState::Bound;
        Ok(())
    }

    /// Materialize the gadget in its space.
    ///
    /// A path that already exists is reported through the returned
    /// [`Materialization`] and a warning instead of an error. Any other failure
    /// propagates, leaving earlier writes in place.
    pub fn add_to_space(&mut self, force: impl Into<Force>) -> Result<Materialization> {
        let space = self.bound_space()?;
        match space.add_gadget(self, force.into()) {
            Ok(()) => {
                self.state = if self.udc.is_some() {
                    GadgetState::Active
                } else {
                    GadgetState::Materialized
                };
                Ok(Materialization::Created)
            }
            Err(GadgetError::AlreadyExists { path }) => {
                warn!("Gadget {} already exists ({})", self.name, path.display());
                self.state = GadgetState::Materialized;
                Ok(Materialization::AlreadyPresent { path })
            }
            Err(e) => Err(e),
        }
    }

    /// Activate the gadget on a controller.
    ///
    /// Without an explicit controller, the first unclaimed one is used. May be
    /// called again to move the gadget to another controller.
    pub fn enable(&mut self, udc: Option<&str>) -> Result<()> {
        let space = self.bound_space()?;
        check_name("gadget", &self.name)?;
        let udc = match udc {
            Some(udc) => udc.to_string(),
            None => space
                .udcs(true)?
                .next()
                .ok_or(GadgetError::NoUdcAvailable)?,
        };
        info!("Enabling gadget {} on {}", self.name, udc);
        space.bind_udc(&self.name, &udc)?;
        self.udc = Some(udc);
        self.state = GadgetState::Active;
        Ok(())
    }

    fn bound_space(&self) -> Result<Arc<GadgetSpace>> {
        self.space.clone().ok_or_else(|| GadgetError::Unbound {
            gadget: self.name.clone(),
        })
    }
}

/// A name must map to exactly one directory below its parent
fn check_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(GadgetError::Config(format!("invalid {} name: {:?}", what, name)));
    }
    Ok(())
}
