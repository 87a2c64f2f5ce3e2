//! `DISK` vectors of VM templates.

use crate::keys::template_keys;

use super::vector_facade;

template_keys! {
    pub enum DiskKey {
        Datastore => "DATASTORE",
        DiskId => "DISK_ID",
        DiskType => "DISK_TYPE",
        Driver => "DRIVER",
        Image => "IMAGE",
        ImageId => "IMAGE_ID",
        ImageUname => "IMAGE_UNAME",
        OriginalSize => "ORIGINAL_SIZE",
        Size => "SIZE",
        Target => "TARGET",
        Type => "TYPE",
    }
}

vector_facade! {
    /// A disk attached to a VM.
    Disk, "DISK", DiskKey, id = DiskKey::DiskId
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;

    #[test]
    fn test_disk_from_image() {
        let mut disk = Disk::new();
        disk.add(DiskKey::ImageId, 119u32);

        assert_eq!(disk.to_string(), "DISK=[\n    IMAGE_ID=\"119\" ]");
        assert_eq!(disk.get_id(DiskKey::ImageId).unwrap(), 119);
        assert_eq!(disk.id(), Err(TemplateError::NotFound("DISK_ID".into())));
    }

    #[test]
    fn test_unknown_keys_through_vector() {
        let mut disk = Disk::new();
        disk.add(DiskKey::Size, 2048u32)
            .vector_mut()
            .add_pair("cache", "none");

        assert_eq!(disk.get(DiskKey::Size).unwrap(), "2048");
        assert_eq!(disk.vector().get_str("CACHE").unwrap(), "none");
    }
}
