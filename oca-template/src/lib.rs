//! # oca-template
//!
//! The template language of the cloud control plane.
//!
//! A template is an ordered list of `KEY="value"` pairs and `KEY=[ ... ]`
//! vectors. This crate provides:
//!
//! - [`TemplatePair`], [`TemplateVector`] and [`DynamicTemplate`], the
//!   schema-free model with ordered, multi-valued lookups
//! - serialization to the wire text the control plane consumes (`Display`)
//!   and back (`FromStr`)
//! - parsing of the XML the control plane returns ([`FromXml`])
//! - typed facades for disks, NICs, images, VMs, virtual networks, VDCs and
//!   documents
//!
//! ## Example
//!
//! ```
//! use oca_template::facade::disk::{Disk, DiskKey};
//! use oca_template::facade::vm::VmTemplate;
//!
//! let mut disk = Disk::new();
//! disk.add(DiskKey::ImageId, 119u32);
//!
//! let mut vm = VmTemplate::new();
//! vm.set_capacity(1.0, 2, 2048).unwrap();
//! vm.add_disk(disk);
//!
//! assert!(vm.to_string().contains("DISK=[\n    IMAGE_ID=\"119\" ]"));
//! ```

pub mod dynamic;
pub mod error;
pub mod facade;
mod keys;
pub mod pair;
mod text;
pub mod vector;
pub mod xml;

pub use dynamic::{DynamicTemplate, TemplateElement};
pub use error::{Result, TemplateError};
pub use pair::{PairValue, TemplatePair};
pub use vector::TemplateVector;
pub use xml::{FromXml, Token, XmlReader};
