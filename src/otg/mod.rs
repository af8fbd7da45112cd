//! OTG USB Gadget composition
//!
//! A [`Gadget`] is built in memory from [`Function`]s and [`Config`]s, bound to a
//! [`GadgetSpace`], materialized as a ConfigFS tree and finally activated on a
//! USB Device Controller.
//!
//! Architecture:
//! ```text
//! Gadget (entity tree + lifecycle)
//!     └── GadgetSpace (projection engine, UDC registry)
//!             └── ControlSurface (SysFs | MemorySurface)
//! ```

pub mod attrs;
pub mod config;
pub mod configfs;
pub mod function;
pub mod gadget;
pub mod hid;
pub mod memory;
pub mod report_desc;
pub mod space;
pub mod surface;

pub use attrs::{
    serialize, AttrMap, AttrValue, AttributeRecord, ConfigAttributes, ConfigStrings,
    DeviceAttributes, DeviceStrings, FieldDescriptor, FileContent, FunctionAttributes, Repr,
    DEFAULT_LANG,
};
pub use config::Config;
pub use configfs::SysFs;
pub use function::Function;
pub use gadget::{Gadget, GadgetState, Materialization};
pub use hid::HidFunctionType;
pub use memory::{MemorySurface, SurfaceOp};
pub use space::{Force, GadgetSpace};
pub use surface::ControlSurface;
