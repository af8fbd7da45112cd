//! Gadget space - projection of gadgets onto ConfigFS and UDC registry access
//!
//! Layout written under the gadget root:
//! ```text
//! usb_gadget/<gadget>/                         device attributes
//! usb_gadget/<gadget>/strings/0x409/           device strings
//! usb_gadget/<gadget>/configs/<cfg>.<n>/       config attributes (+ strings/0x409/)
//! usb_gadget/<gadget>/configs/<cfg>.<n>/<fn>   symlink to functions/<fn>
//! usb_gadget/<gadget>/functions/<fn>/          function attributes
//! usb_gadget/<gadget>/UDC                      controller binding
//! ```
//!
//! Writes are ordered and not transactional: a failing step leaves every
//! earlier step on the control surface.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::attrs::{serialize, AttrMap, AttributeRecord};
use super::config::Config;
use super::configfs::{SysFs, CONFIGFS_PATH, UDC_PATH};
use super::function::Function;
use super::gadget::Gadget;
use super::surface::ControlSurface;
use crate::error::{GadgetError, Result};

/// Gadget subtree of the ConfigFS mount
pub const GADGET_DIR: &str = "usb_gadget";
pub const STRINGS_DIR: &str = "strings";
pub const CONFIGS_DIR: &str = "configs";
pub const FUNCTIONS_DIR: &str = "functions";
/// Controller binding file of a gadget
pub const UDC_FILE: &str = "UDC";

/// How materialization treats paths that already exist
///
/// `reuse_dirs` tolerates existing directories and skips existing function
/// links. `rewrite_attrs` decides whether attribute files inside a directory
/// that already existed are written again; files in freshly created
/// directories are always written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Force {
    pub reuse_dirs: bool,
    pub rewrite_attrs: bool,
}

impl Force {
    /// Fail on any existing path
    pub const NONE: Force = Force {
        reuse_dirs: false,
        rewrite_attrs: false,
    };

    /// Reuse existing paths and rewrite every attribute file
    pub const ALL: Force = Force {
        reuse_dirs: true,
        rewrite_attrs: true,
    };
}

impl From<bool> for Force {
    fn from(force: bool) -> Self {
        if force {
            Force::ALL
        } else {
            Force::NONE
        }
    }
}

/// A ConfigFS mount plus UDC registry, accessed through a [`ControlSurface`]
pub struct GadgetSpace {
    gadget_root: PathBuf,
    udc_root: PathBuf,
    surface: Box<dyn ControlSurface>,
}

impl fmt::Debug for GadgetSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GadgetSpace")
            .field("gadget_root", &self.gadget_root)
            .field("udc_root", &self.udc_root)
            .finish_non_exhaustive()
    }
}

impl GadgetSpace {
    /// Create a space rooted at a ConfigFS mount and a UDC registry
    pub fn new(
        configfs_path: impl AsRef<Path>,
        udc_path: impl Into<PathBuf>,
        surface: Box<dyn ControlSurface>,
    ) -> Self {
        Self {
            gadget_root: configfs_path.as_ref().join(GADGET_DIR),
            udc_root: udc_path.into(),
            surface,
        }
    }

    /// The host's ConfigFS and UDC registry at their default mount points
    pub fn system() -> Self {
        Self::new(CONFIGFS_PATH, UDC_PATH, Box::new(SysFs))
    }

    /// `<configfs>/usb_gadget`
    pub fn gadget_root(&self) -> &Path {
        &self.gadget_root
    }

    pub fn udc_root(&self) -> &Path {
        &self.udc_root
    }

    pub fn gadget_path(&self, gadget: &str) -> PathBuf {
        self.gadget_root.join(gadget)
    }

    pub fn config_path(&self, gadget: &str, config: &Config) -> PathBuf {
        self.gadget_path(gadget)
            .join(CONFIGS_DIR)
            .join(config.full_name())
    }

    pub fn function_path(&self, gadget: &str, function_id: &str) -> PathBuf {
        self.gadget_path(gadget).join(FUNCTIONS_DIR).join(function_id)
    }

    /// Controllers claimed by existing gadgets, read from their `UDC` files
    pub fn bound_udcs(&self) -> Result<Vec<String>> {
        let gadgets = self.list_or_empty(&self.gadget_root)?;
        let mut bound = Vec::new();
        for name in gadgets {
            let udc_file = self.gadget_root.join(&name).join(UDC_FILE);
            if !self.surface.exists(&udc_file) {
                continue;
            }
            let content = self
                .surface
                .read_file(&udc_file)
                .map_err(|e| GadgetError::io(&udc_file, e))?;
            let udc = content.trim();
            if !udc.is_empty() {
                debug!("Gadget {} is bound to {}", name, udc);
                bound.push(udc.to_string());
            }
        }
        Ok(bound)
    }

    /// Controllers known to the host, in registry order.
    ///
    /// With `unbound_only`, controllers claimed by an existing gadget are
    /// skipped. An empty sequence is not an error.
    pub fn udcs(&self, unbound_only: bool) -> Result<impl Iterator<Item = String>> {
        let bound = if unbound_only {
            self.bound_udcs()?
        } else {
            Vec::new()
        };
        let udcs = self.list_or_empty(&self.udc_root)?;
        Ok(udcs.into_iter().filter(move |udc| !bound.contains(udc)))
    }

    /// Materialize a whole gadget.
    ///
    /// Order: gadget directory and attributes, device strings, configurations,
    /// functions, function links, and finally the UDC binding if the gadget
    /// already carries one.
    pub fn add_gadget(&self, gadget: &Gadget, force: Force) -> Result<()> {
        gadget.validate()?;

        let gadget_dir = self.gadget_path(gadget.name());
        info!("Creating gadget {} at {}", gadget.name(), gadget_dir.display());
        let created = self.make_dir(&gadget_dir, force)?;
        if let Some(attrs) = &gadget.attrs {
            self.store_record(&gadget_dir, attrs, created, force)?;
        }
        if let Some(strings) = &gadget.strings {
            let strings_dir = gadget_dir.join(STRINGS_DIR).join(strings.lang());
            let created = self.make_dir(&strings_dir, force)?;
            self.store_record(&strings_dir, strings, created, force)?;
        }

        for config in gadget.configs() {
            self.add_config(gadget.name(), config, force)?;
        }
        for function in gadget.functions() {
            self.add_function(gadget.name(), function, force)?;
        }
        for config in gadget.configs() {
            self.bind_functions(gadget.name(), config, force)?;
        }

        if let Some(udc) = gadget.udc() {
            self.bind_udc(gadget.name(), udc)?;
        }
        Ok(())
    }

    /// Create a configuration directory with its attributes and strings
    pub fn add_config(&self, gadget: &str, config: &Config, force: Force) -> Result<()> {
        let config_dir = self.config_path(gadget, config);
        let created = self.make_dir(&config_dir, force)?;
        if let Some(attrs) = &config.attrs {
            self.store_record(&config_dir, attrs, created, force)?;
        }
        if let Some(strings) = &config.strings {
            let strings_dir = config_dir.join(STRINGS_DIR).join(strings.lang());
            let created = self.make_dir(&strings_dir, force)?;
            self.store_record(&strings_dir, strings, created, force)?;
        }
        Ok(())
    }

    /// Create a function directory with its attributes
    pub fn add_function(&self, gadget: &str, function: &Function, force: Force) -> Result<()> {
        let function_dir = self.function_path(gadget, function.full_name());
        let created = self.make_dir(&function_dir, force)?;
        if let Some(attrs) = &function.attrs {
            self.store_record(&function_dir, attrs, created, force)?;
        }
        Ok(())
    }

    /// Link every function bound to a configuration into its directory
    pub fn bind_functions(&self, gadget: &str, config: &Config, force: Force) -> Result<()> {
        let config_dir = self.config_path(gadget, config);
        for function_id in config.functions() {
            let target = self.function_path(gadget, function_id);
            let link = config_dir.join(function_id);
            if force.reuse_dirs && self.surface.exists(&link) {
                debug!("Link {} exists, skipping", link.display());
                continue;
            }
            debug!("Linking {} -> {}", link.display(), target.display());
            self.surface
                .create_symlink(&target, &link)
                .map_err(|e| GadgetError::io(&link, e))?;
        }
        Ok(())
    }

    /// Activate a materialized gadget on a controller
    pub fn bind_udc(&self, gadget: &str, udc: &str) -> Result<()> {
        info!("Binding gadget {} to UDC: {}", gadget, udc);
        let udc_file = self.gadget_path(gadget).join(UDC_FILE);
        self.surface
            .write_file(&udc_file, format!("{}\n", udc).as_bytes())
            .map_err(|e| GadgetError::io(&udc_file, e))
    }

    /// Write serialized attribute files into a directory
    pub fn store_attrs(&self, dir: &Path, attrs: &AttrMap) -> Result<()> {
        for (name, content) in attrs.iter() {
            let path = dir.join(name);
            debug!("Writing {:?} to {}", content, path.display());
            self.surface
                .write_file(&path, content.as_bytes())
                .map_err(|e| GadgetError::io(&path, e))?;
        }
        Ok(())
    }

    fn store_record(
        &self,
        dir: &Path,
        record: &dyn AttributeRecord,
        created: bool,
        force: Force,
    ) -> Result<()> {
        if !created && !force.rewrite_attrs {
            debug!("Keeping existing attributes in {}", dir.display());
            return Ok(());
        }
        self.store_attrs(dir, &serialize(record))
    }

    fn make_dir(&self, path: &Path, force: Force) -> Result<bool> {
        debug!("Creating path {}", path.display());
        self.surface
            .create_dir(path, force.reuse_dirs)
            .map_err(|e| GadgetError::io(path, e))
    }

    fn list_or_empty(&self, path: &Path) -> Result<Vec<String>> {
        match self.surface.list_dir(path) {
            Ok(names) => Ok(names),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(GadgetError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otg::attrs::{ConfigAttributes, ConfigStrings, DeviceAttributes, DeviceStrings};
    use crate::otg::hid::HidFunctionType;
    use crate::otg::memory::{MemorySurface, SurfaceOp};
    use tempfile::TempDir;

    fn memory_space() -> (GadgetSpace, MemorySurface) {
        let surface = MemorySurface::new();
        surface.seed_dir("/cfg/usb_gadget");
        surface.seed_dir("/udc");
        let space = GadgetSpace::new("/cfg", "/udc", Box::new(surface.clone()));
        (space, surface)
    }

    fn sample_gadget() -> Gadget {
        let hid = Function::new("hid", "usb0");
        let mut config = Config::new("c", 1);
        config.bind_function(&hid);

        let mut gadget = Gadget::new("g1").with_attrs(DeviceAttributes {
            vendor_id: Some(0x1d6b),
            product_id: Some(0x0104),
            ..Default::default()
        });
        gadget.add_function(hid);
        gadget.add_config(config);
        gadget
    }

    fn p(path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    #[test]
    fn test_end_to_end_layout() {
        let (space, surface) = memory_space();
        space.add_gadget(&sample_gadget(), Force::NONE).unwrap();

        assert_eq!(
            surface.ops(),
            [
                SurfaceOp::CreateDir(p("/cfg/usb_gadget/g1")),
                SurfaceOp::WriteFile(p("/cfg/usb_gadget/g1/idVendor"), b"0x1d6b\n".to_vec()),
                SurfaceOp::WriteFile(p("/cfg/usb_gadget/g1/idProduct"), b"0x0104\n".to_vec()),
                SurfaceOp::CreateDir(p("/cfg/usb_gadget/g1/configs")),
                SurfaceOp::CreateDir(p("/cfg/usb_gadget/g1/configs/c.1")),
                SurfaceOp::CreateDir(p("/cfg/usb_gadget/g1/functions")),
                SurfaceOp::CreateDir(p("/cfg/usb_gadget/g1/functions/hid.usb0")),
                SurfaceOp::Symlink {
                    target: p("/cfg/usb_gadget/g1/functions/hid.usb0"),
                    link: p("/cfg/usb_gadget/g1/configs/c.1/hid.usb0"),
                },
            ]
        );
        assert_eq!(
            surface.link_target("/cfg/usb_gadget/g1/configs/c.1/hid.usb0"),
            Some(p("/cfg/usb_gadget/g1/functions/hid.usb0"))
        );
        assert!(!surface.paths().contains(&p("/cfg/usb_gadget/g1/UDC")));
    }

    #[test]
    fn test_full_gadget_order() {
        let (space, surface) = memory_space();
        let keyboard = HidFunctionType::Keyboard.function("usb0");
        let mouse = HidFunctionType::MouseRelative.function("usb1");
        let mut config = Config::new("c", 1)
            .with_attrs(ConfigAttributes::with_max_power(250))
            .with_strings(ConfigStrings::new("Keyboard and mouse"));
        config.bind_function(&keyboard);
        config.bind_function(&mouse);

        let mut gadget = Gadget::new("g1")
            .with_attrs(DeviceAttributes {
                vendor_id: Some(0x1d6b),
                ..Default::default()
            })
            .with_strings(DeviceStrings::new("Acme", "Keys", "0001"))
            .with_udc("dummy_udc.0");
        gadget.add_function(keyboard);
        gadget.add_function(mouse);
        gadget.add_config(config);

        space.add_gadget(&gadget, Force::NONE).unwrap();

        let ops = surface.ops();
        let position = |path: &str| {
            ops.iter()
                .position(|op| op.path() == Path::new(path))
                .unwrap_or_else(|| panic!("{} not written", path))
        };
        let root = "/cfg/usb_gadget/g1";
        assert!(position(&format!("{root}/idVendor")) < position(&format!("{root}/strings/0x409")));
        assert!(
            position(&format!("{root}/strings/0x409/serialnumber"))
                < position(&format!("{root}/configs/c.1"))
        );
        assert!(
            position(&format!("{root}/configs/c.1/strings/0x409/configuration"))
                < position(&format!("{root}/functions/hid.usb0"))
        );
        assert!(
            position(&format!("{root}/functions/hid.usb1/report_desc"))
                < position(&format!("{root}/configs/c.1/hid.usb0"))
        );
        assert!(
            position(&format!("{root}/configs/c.1/hid.usb0"))
                < position(&format!("{root}/configs/c.1/hid.usb1"))
        );
        assert_eq!(position(&format!("{root}/UDC")), ops.len() - 1);

        assert_eq!(
            surface.file(format!("{root}/configs/c.1/MaxPower")),
            Some(b"250\n".to_vec())
        );
        assert_eq!(
            surface.file(format!("{root}/strings/0x409/manufacturer")),
            Some(b"Acme\n".to_vec())
        );
        assert!(surface.file(format!("{root}/strings/0x409/lang")).is_none());
        assert_eq!(
            surface.file(format!("{root}/UDC")),
            Some(b"dummy_udc.0\n".to_vec())
        );
    }

    #[test]
    fn test_existing_gadget_without_force_is_conflict() {
        let (space, surface) = memory_space();
        surface.seed_dir("/cfg/usb_gadget/g1");

        let err = space.add_gadget(&sample_gadget(), Force::NONE).unwrap_err();
        assert!(err.is_conflict());
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_partial_failure_leaves_residue() {
        let (space, surface) = memory_space();
        // a stray file where the functions directory should go
        surface.seed_file("/cfg/usb_gadget/g1/functions", "");

        let err = space.add_gadget(&sample_gadget(), Force::ALL).unwrap_err();
        assert!(matches!(err, GadgetError::Io { .. }));
        assert_eq!(
            surface.file("/cfg/usb_gadget/g1/idVendor"),
            Some(b"0x1d6b\n".to_vec())
        );
        assert!(surface.is_dir("/cfg/usb_gadget/g1/configs/c.1"));
        assert!(surface
            .link_target("/cfg/usb_gadget/g1/configs/c.1/hid.usb0")
            .is_none());
    }

    #[test]
    fn test_sub_steps_are_strict() {
        let (space, surface) = memory_space();
        surface.seed_dir("/cfg/usb_gadget/g1/functions/hid.usb0");

        let err = space
            .add_function("g1", &Function::new("hid", "usb0"), Force::NONE)
            .unwrap_err();
        assert!(err.is_conflict());

        space.add_config("g1", &Config::new("c", 1), Force::NONE).unwrap();
        let err = space
            .add_config("g1", &Config::new("c", 1), Force::NONE)
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_force_reuses_dirs_and_rewrites_attrs() {
        let (space, surface) = memory_space();
        let gadget = sample_gadget();
        space.add_gadget(&gadget, Force::NONE).unwrap();
        surface.clear_ops();

        space.add_gadget(&gadget, Force::ALL).unwrap();
        assert_eq!(
            surface.ops(),
            [
                SurfaceOp::WriteFile(p("/cfg/usb_gadget/g1/idVendor"), b"0x1d6b\n".to_vec()),
                SurfaceOp::WriteFile(p("/cfg/usb_gadget/g1/idProduct"), b"0x0104\n".to_vec()),
            ]
        );
    }

    #[test]
    fn test_reuse_dirs_without_rewrite() {
        let (space, surface) = memory_space();
        let gadget = sample_gadget();
        space.add_gadget(&gadget, Force::NONE).unwrap();
        surface.clear_ops();

        let force = Force {
            reuse_dirs: true,
            rewrite_attrs: false,
        };
        space.add_gadget(&gadget, force).unwrap();
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_unknown_function_rejected_before_writes() {
        let (space, surface) = memory_space();
        let mut gadget = Gadget::new("g1");
        let mut config = Config::new("c", 1);
        config.bind_function(&Function::new("hid", "usb0"));
        gadget.add_config(config);

        let err = space.add_gadget(&gadget, Force::NONE).unwrap_err();
        assert!(matches!(err, GadgetError::UnknownFunction { .. }));
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_bound_and_available_udcs() {
        let (space, surface) = memory_space();
        surface.seed_dir("/udc/dummy_udc.0");
        surface.seed_dir("/udc/dummy_udc.1");
        surface.seed_dir("/udc/fe980000.usb");
        surface.seed_file("/cfg/usb_gadget/a/UDC", "dummy_udc.0\n");
        surface.seed_file("/cfg/usb_gadget/b/UDC", "\n");
        surface.seed_dir("/cfg/usb_gadget/c");

        assert_eq!(space.bound_udcs().unwrap(), ["dummy_udc.0"]);
        assert_eq!(
            space.udcs(true).unwrap().collect::<Vec<_>>(),
            ["dummy_udc.1", "fe980000.usb"]
        );
        assert_eq!(space.udcs(false).unwrap().count(), 3);
    }

    #[test]
    fn test_missing_roots_are_empty() {
        let surface = MemorySurface::new();
        let space = GadgetSpace::new("/nowhere", "/none", Box::new(surface));
        assert!(space.bound_udcs().unwrap().is_empty());
        assert_eq!(space.udcs(true).unwrap().next(), None);
    }

    #[test]
    fn test_sysfs_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let configfs = temp_dir.path().join("config");
        let udc = temp_dir.path().join("udc");
        std::fs::create_dir_all(configfs.join(GADGET_DIR)).unwrap();
        std::fs::create_dir_all(udc.join("dummy_udc.0")).unwrap();

        let space = GadgetSpace::new(&configfs, &udc, Box::new(SysFs));
        space.add_gadget(&sample_gadget(), Force::NONE).unwrap();

        let gadget_dir = configfs.join("usb_gadget/g1");
        assert_eq!(
            std::fs::read_to_string(gadget_dir.join("idVendor")).unwrap(),
            "0x1d6b\n"
        );
        assert_eq!(
            std::fs::read_link(gadget_dir.join("configs/c.1/hid.usb0")).unwrap(),
            gadget_dir.join("functions/hid.usb0")
        );

        space.bind_udc("g1", "dummy_udc.0").unwrap();
        assert_eq!(space.bound_udcs().unwrap(), ["dummy_udc.0"]);
        assert_eq!(space.udcs(true).unwrap().next(), None);
    }
}
