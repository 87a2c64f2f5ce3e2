//! Virtual datacenter templates.

use std::fmt;

use crate::dynamic::DynamicTemplate;
use crate::error::Result;
use crate::pair::PairValue;
use crate::xml::{FromXml, XmlReader};

use super::NamedKey;

/// Template of a VDC: a name, a description and free attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VdcTemplate {
    template: DynamicTemplate,
}

impl VdcTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: NamedKey) -> Result<&str> {
        self.template.get_str(key.as_str())
    }

    pub fn add(&mut self, key: NamedKey, value: impl Into<PairValue>) -> &mut Self {
        self.template.add_pair(key.as_str(), value);
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

impl From<DynamicTemplate> for VdcTemplate {
    fn from(template: DynamicTemplate) -> Self {
        Self { template }
    }
}

impl FromXml for VdcTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        DynamicTemplate::from_xml(reader, start).map(Self::from)
    }
}

impl fmt::Display for VdcTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.template, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_name_twice() {
        let mut tpl = VdcTemplate::new();
        tpl.set_name("dc-a").set_description("first").set_name("dc-b");

        assert_eq!(tpl.get(NamedKey::Name).unwrap(), "dc-b");
        assert_eq!(tpl.to_string(), "DESCRIPTION=\"first\"\nNAME=\"dc-b\"");
    }
}
