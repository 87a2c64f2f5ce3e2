//! Typed views over the dynamic template model.
//!
//! Every facade owns its generic structure by value and adds named accessors
//! over a closed key set. Unknown keys stay reachable through `vector()` /
//! `template()`.

pub mod disk;
pub mod document;
pub mod image;
pub mod nic;
pub mod vdc;
pub mod vm;
pub mod vnet;

use crate::dynamic::DynamicTemplate;
use crate::error::{Result, TemplateError};
use crate::keys::template_keys;

template_keys! {
    /// Keys shared by the plain named templates (VDC, document).
    pub enum NamedKey {
        Name => "NAME",
        Description => "DESCRIPTION",
    }
}

/// Declare a facade over one `KEY=[ ... ]` vector.
macro_rules! vector_facade {
    (
        $(#[$meta:meta])*
        $name:ident, $vector_key:literal, $keys:ty, id = $id_key:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            vector: $crate::vector::TemplateVector,
        }

        impl $name {
            /// Vector key on the wire.
            pub const KEY: &'static str = $vector_key;

            pub fn new() -> Self {
                Self {
                    vector: $crate::vector::TemplateVector::new($vector_key),
                }
            }

            pub fn get(&self, key: $keys) -> $crate::error::Result<&str> {
                self.vector.get_str(key.as_str())
            }

            pub fn add(
                &mut self,
                key: $keys,
                value: impl Into<$crate::pair::PairValue>,
            ) -> &mut Self {
                self.vector.add_pair(key.as_str(), value);
                self
            }

            pub fn get_id(&self, key: $keys) -> $crate::error::Result<u64> {
                self.vector.get_id(key.as_str())
            }

            pub fn id(&self) -> $crate::error::Result<u64> {
                self.get_id($id_key)
            }

            pub fn vector(&self) -> &$crate::vector::TemplateVector {
                &self.vector
            }

            pub fn vector_mut(&mut self) -> &mut $crate::vector::TemplateVector {
                &mut self.vector
            }

            pub fn into_vector(self) -> $crate::vector::TemplateVector {
                self.vector
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<$crate::vector::TemplateVector> for $name {
            fn from(vector: $crate::vector::TemplateVector) -> Self {
                Self { vector }
            }
        }

        impl AsRef<$crate::vector::TemplateVector> for $name {
            fn as_ref(&self) -> &$crate::vector::TemplateVector {
                &self.vector
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.vector, f)
            }
        }
    };
}

pub(crate) use vector_facade;

/// Fail with the first key of `group` already present in `template`.
pub(crate) fn ensure_absent<K: AsRef<str>>(template: &DynamicTemplate, group: &[K]) -> Result<()> {
    match group.iter().find(|k| template.exists(k.as_ref())) {
        Some(key) => Err(TemplateError::KeyConflict(key.as_ref().to_string())),
        None => Ok(()),
    }
}

/// Join rendered parts with newlines, skipping empty ones.
pub(crate) fn join_parts(parts: impl IntoIterator<Item = String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
