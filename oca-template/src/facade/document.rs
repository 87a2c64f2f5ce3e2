//! Templates of generic documents (application-defined objects stored by the
//! control plane).

use std::fmt;

use crate::dynamic::DynamicTemplate;
use crate::error::Result;
use crate::pair::PairValue;
use crate::xml::{FromXml, XmlReader};

use super::NamedKey;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentTemplate {
    template: DynamicTemplate,
}

impl DocumentTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: NamedKey) -> Result<&str> {
        self.template.get_str(key.as_str())
    }

    /// Any attribute; documents have no fixed schema.
    pub fn get_attr(&self, key: &str) -> Result<&str> {
        self.template.get_str(key)
    }

    pub fn add(&mut self, key: &str, value: impl Into<PairValue>) -> &mut Self {
        self.template.add_pair(key, value);
        self
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.template.set_name(name);
        self
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        self.template.set_description(description);
        self
    }

    pub fn template(&self) -> &DynamicTemplate {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut DynamicTemplate {
        &mut self.template
    }
}

impl From<DynamicTemplate> for DocumentTemplate {
    fn from(template: DynamicTemplate) -> Self {
        Self { template }
    }
}

impl FromXml for DocumentTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        DynamicTemplate::from_xml(reader, start).map(Self::from)
    }
}

impl fmt::Display for DocumentTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.template, f)
    }
}
