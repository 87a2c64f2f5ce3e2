//! Image templates.

use std::fmt;

use crate::dynamic::DynamicTemplate;
use crate::error::{Result, TemplateError};
use crate::keys::template_keys;
use crate::pair::PairValue;
use crate::xml::{FromXml, XmlReader};

template_keys! {
    pub enum ImageKey {
        Name => "NAME",
        Description => "DESCRIPTION",
        Type => "TYPE",
        Persistent => "PERSISTENT",
        PersistentType => "PERSISTENT_TYPE",
        Size => "SIZE",
        DevPrefix => "DEV_PREFIX",
        Target => "TARGET",
        Driver => "DRIVER",
        Path => "PATH",
        Source => "SOURCE",
        DiskType => "DISK_TYPE",
        ReadOnly => "READONLY",
        Md5 => "MD5",
        Sha1 => "SHA1",
    }
}

template_keys! {
    /// Values of the image `TYPE` attribute.
    pub enum ImageType {
        /// Empty disk to be formatted.
        Datablock => "DATABLOCK",
        Cdrom => "CDROM",
        Os => "OS",
        // File types, only registrable in file datastores.
        Kernel => "KERNEL",
        Ramdisk => "RAMDISK",
        Context => "CONTEXT",
    }
}

impl std::str::FromStr for ImageType {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        ImageType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TemplateError::TypeMismatch(format!("unknown image type {}", s)))
    }
}

/// Template used to register or update an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTemplate {
    template: DynamicTemplate,
}

impl ImageTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ImageKey) -> Result<&str> {
        self.template.get_str(key.as_str())
    }

    pub fn add(&mut self, key: ImageKey, value: impl Into<PairValue>) -> &mut Self {
        self.template.add_pair(key.as_str(), value);
        self
    }

    /// Replace `TYPE`.
    pub fn set_type(&mut self, image_type: ImageType) -> &mut Self {
        self.template.del(ImageKey::Type.as_str());
        self.template.add_pair(ImageKey::Type.as_str(), image_type.as_str());
        self
    }

    pub fn image_type(&self) -> Result<ImageType> {
        self.get(ImageKey::Type)?.parse()
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.template.set_name(name);
        self
    }

    pub fn template(&self) -> &DynamicTemplate {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut DynamicTemplate {
        &mut self.template
    }

    pub fn into_template(self) -> DynamicTemplate {
        self.template
    }
}

impl From<DynamicTemplate> for ImageTemplate {
    fn from(template: DynamicTemplate) -> Self {
        Self { template }
    }
}

impl FromXml for ImageTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        DynamicTemplate::from_xml(reader, start).map(Self::from)
    }
}

impl fmt::Display for ImageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.template, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_type_replaces() {
        let mut tpl = ImageTemplate::new();
        tpl.set_name("ubuntu")
            .set_type(ImageType::Cdrom)
            .add(ImageKey::Path, "/var/tmp/ubuntu.iso")
            .set_type(ImageType::Os);

        assert_eq!(tpl.image_type().unwrap(), ImageType::Os);
        assert_eq!(
            tpl.to_string(),
            "NAME=\"ubuntu\"\nPATH=\"/var/tmp/ubuntu.iso\"\nTYPE=\"OS\""
        );
    }

    #[test]
    fn test_parse() {
        let tpl = ImageTemplate::from_xml_str(
            "<TEMPLATE><DEV_PREFIX>vd</DEV_PREFIX><TYPE>datablock</TYPE></TEMPLATE>",
        )
        .unwrap();
        assert_eq!(tpl.get(ImageKey::DevPrefix).unwrap(), "vd");
        assert_eq!(tpl.image_type().unwrap(), ImageType::Datablock);
    }
}
