//! gadget-composer - USB gadget composition over ConfigFS
//!
//! This crate models a USB gadget (device descriptor, configurations and
//! functions) in memory and projects it onto the kernel's ConfigFS gadget
//! interface, then activates it on a USB Device Controller.

pub mod config;
pub mod error;
pub mod hid;
pub mod otg;

pub use error::{GadgetError, Result};
