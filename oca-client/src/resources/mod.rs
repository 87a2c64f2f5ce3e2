//! Control plane resources: entities, pools and their controllers.
//!
//! Each module adds two constructors to [`Controller`](crate::Controller):
//! a plural one for pool operations and a singular one taking a resource id.

pub mod document;
pub mod image;
pub mod vdc;
pub mod vm;
pub mod vnet;

pub use document::{Document, DocumentPool};
pub use image::{Image, ImagePool, ImageState};
pub use vdc::{Vdc, VdcPool, ZoneResource};
pub use vm::{Vm, VmPool, VmState};
pub use vnet::{VirtualNetwork, VirtualNetworkPool};
