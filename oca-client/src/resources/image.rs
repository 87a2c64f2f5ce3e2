//! Images: disk images registered in datastores.

use std::fmt;

use oca_template::facade::image::{ImageTemplate, ImageType};
use oca_template::xml::read_id_list;
use oca_template::{FromXml, XmlReader};
use tracing::{info, instrument};

use crate::args;
use crate::controller::{invalid_state, Controller, LockInfo, Ownership, Pool, PoolItem};
use crate::error::Result;
use crate::filter::Filter;
use crate::params::{LockLevel, Permissions, UpdateType};

/// Image pool listing.
pub type ImagePool = Pool<Image>;

/// State of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageState {
    Init = 0,
    Ready = 1,
    Used = 2,
    Disabled = 3,
    Locked = 4,
    Error = 5,
    Clone = 6,
    Delete = 7,
    UsedPers = 8,
    LockUsed = 9,
    LockUsedPers = 10,
}

impl ImageState {
    pub const ALL: [ImageState; 11] = [
        ImageState::Init,
        ImageState::Ready,
        ImageState::Used,
        ImageState::Disabled,
        ImageState::Locked,
        ImageState::Error,
        ImageState::Clone,
        ImageState::Delete,
        ImageState::UsedPers,
        ImageState::LockUsed,
        ImageState::LockUsedPers,
    ];

    pub fn from_raw(raw: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as i64 == raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageState::Init => "INIT",
            ImageState::Ready => "READY",
            ImageState::Used => "USED",
            ImageState::Disabled => "DISABLED",
            ImageState::Locked => "LOCKED",
            ImageState::Error => "ERROR",
            ImageState::Clone => "CLONE",
            ImageState::Delete => "DELETE",
            ImageState::UsedPers => "USED_PERS",
            ImageState::LockUsed => "LOCKED_USED",
            ImageState::LockUsedPers => "LOCKED_USED_PERS",
        }
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image as returned by `one.image.info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub id: i64,
    pub name: String,
    pub owner: Ownership,
    pub lock: Option<LockInfo>,
    pub permissions: Option<Permissions>,
    /// Numeric image type.
    pub image_type: i64,
    pub disk_type: i64,
    pub persistent: bool,
    pub regtime: i64,
    pub source: String,
    pub path: String,
    pub fs_type: String,
    /// Size in MB.
    pub size: i64,
    pub state_raw: i64,
    pub running_vms: i64,
    pub cloning_ops: i64,
    pub cloning_id: i64,
    pub target_snapshot: i64,
    pub datastore_id: i64,
    pub datastore: String,
    pub vms: Vec<i64>,
    pub clones: Vec<i64>,
    pub app_clones: Vec<i64>,
    pub template: ImageTemplate,
}

impl Image {
    pub fn state(&self) -> Result<ImageState> {
        ImageState::from_raw(self.state_raw).ok_or_else(|| invalid_state("image", self.state_raw))
    }
}

impl FromXml for Image {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut image = Image::default();
        reader.read_children(start, |r, child| {
            if image.owner.read_field(r, &child)? {
                return Ok(());
            }
            match child.as_str() {
                "ID" => image.id = r.read_parsed(&child)?,
                "NAME" => image.name = r.read_text(&child)?,
                "LOCK" => image.lock = Some(LockInfo::from_xml(r, &child)?),
                "PERMISSIONS" => image.permissions = Some(Permissions::from_xml(r, &child)?),
                "TYPE" => image.image_type = r.read_parsed(&child)?,
                "DISK_TYPE" => image.disk_type = r.read_parsed(&child)?,
                "PERSISTENT" => image.persistent = r.read_parsed::<i64>(&child)? != 0,
                "REGTIME" => image.regtime = r.read_parsed(&child)?,
                "SOURCE" => image.source = r.read_text(&child)?,
                "PATH" => image.path = r.read_text(&child)?,
                "FSTYPE" => image.fs_type = r.read_text(&child)?,
                "SIZE" => image.size = r.read_parsed(&child)?,
                "STATE" => image.state_raw = r.read_parsed(&child)?,
                "RUNNING_VMS" => image.running_vms = r.read_parsed(&child)?,
                "CLONING_OPS" => image.cloning_ops = r.read_parsed(&child)?,
                "CLONING_ID" => image.cloning_id = r.read_parsed(&child)?,
                "TARGET_SNAPSHOT" => image.target_snapshot = r.read_parsed(&child)?,
                "DATASTORE_ID" => image.datastore_id = r.read_parsed(&child)?,
                "DATASTORE" => image.datastore = r.read_text(&child)?,
                "VMS" => image.vms = read_id_list(r, &child)?,
                "CLONES" => image.clones = read_id_list(r, &child)?,
                "APP_CLONES" => image.app_clones = read_id_list(r, &child)?,
                "TEMPLATE" => image.template = ImageTemplate::from_xml(r, &child)?,
                _ => r.skip_element(&child)?,
            }
            Ok(())
        })?;
        Ok(image)
    }
}

impl PoolItem for Image {
    const TAG: &'static str = "IMAGE";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Operations on the image pool.
pub struct ImagesController<'a> {
    controller: &'a Controller,
}

/// Operations on one image.
pub struct ImageController<'a> {
    controller: &'a Controller,
    pub id: i64,
}

/// Operations on one snapshot of an image.
pub struct ImageSnapshotController<'a> {
    controller: &'a Controller,
    pub image_id: i64,
    pub id: i64,
}

impl Controller {
    pub fn images(&self) -> ImagesController<'_> {
        ImagesController { controller: self }
    }

    pub fn image(&self, id: i64) -> ImageController<'_> {
        ImageController {
            controller: self,
            id,
        }
    }
}

impl ImagesController<'_> {
    /// List the pool.
    #[instrument(skip(self))]
    pub async fn info(&self, filter: &Filter) -> Result<ImagePool> {
        self.controller
            .call_parse("one.imagepool.info", filter.to_args())
            .await
    }

    /// Id of the image called `name`.
    pub async fn by_name(&self, name: &str, filter: &Filter) -> Result<i64> {
        self.info(filter).await?.by_name(name)
    }

    /// Register an image in datastore `datastore_id`, returning its id.
    /// Name and type are written into the template.
    #[instrument(skip(self, template))]
    pub async fn create(
        &self,
        name: &str,
        image_type: ImageType,
        datastore_id: i64,
        mut template: ImageTemplate,
    ) -> Result<i64> {
        template.set_name(name).set_type(image_type);

        let id = self
            .controller
            .call_id(
                "one.image.allocate",
                args![template.to_string(), datastore_id],
            )
            .await?;

        info!(image_id = id, "Image allocated");
        Ok(id)
    }
}

impl<'a> ImageController<'a> {
    pub fn snapshot(&self, snapshot_id: i64) -> ImageSnapshotController<'a> {
        ImageSnapshotController {
            controller: self.controller,
            image_id: self.id,
            id: snapshot_id,
        }
    }

    #[instrument(skip(self), fields(image_id = self.id))]
    pub async fn info(&self) -> Result<Image> {
        self.controller
            .call_parse("one.image.info", args![self.id])
            .await
    }

    /// Replace or merge the image template.
    #[instrument(skip(self, template), fields(image_id = self.id))]
    pub async fn update(&self, template: &ImageTemplate, mode: UpdateType) -> Result<()> {
        self.controller
            .call(
                "one.image.update",
                args![self.id, template.to_string(), mode],
            )
            .await?;
        Ok(())
    }

    /// Clone into datastore `datastore_id`, returning the clone id.
    #[instrument(skip(self), fields(image_id = self.id))]
    pub async fn clone(&self, name: &str, datastore_id: i64) -> Result<i64> {
        let id = self
            .controller
            .call_id("one.image.clone", args![self.id, name, datastore_id])
            .await?;
        info!(clone_id = id, "Image cloned");
        Ok(id)
    }

    pub async fn chtype(&self, image_type: ImageType) -> Result<()> {
        self.controller
            .call("one.image.chtype", args![self.id, image_type.as_str()])
            .await?;
        Ok(())
    }

    /// Change owner and group; `-1` keeps the current one.
    pub async fn chown(&self, uid: i64, gid: i64) -> Result<()> {
        self.controller
            .call("one.image.chown", args![self.id, uid, gid])
            .await?;
        Ok(())
    }

    pub async fn chmod(&self, permissions: &Permissions) -> Result<()> {
        self.controller
            .call("one.image.chmod", permissions.to_args(self.id))
            .await?;
        Ok(())
    }

    pub async fn rename(&self, name: &str) -> Result<()> {
        self.controller
            .call("one.image.rename", args![self.id, name])
            .await?;
        Ok(())
    }

    pub async fn enable(&self, enable: bool) -> Result<()> {
        self.controller
            .call("one.image.enable", args![self.id, enable])
            .await?;
        Ok(())
    }

    pub async fn persistent(&self, persistent: bool) -> Result<()> {
        self.controller
            .call("one.image.persistent", args![self.id, persistent])
            .await?;
        Ok(())
    }

    pub async fn lock(&self, level: LockLevel) -> Result<()> {
        self.controller
            .call("one.image.lock", args![self.id, level])
            .await?;
        Ok(())
    }

    pub async fn unlock(&self) -> Result<()> {
        self.controller
            .call("one.image.unlock", args![self.id])
            .await?;
        Ok(())
    }

    /// Remove the image, and its data from the datastore.
    #[instrument(skip(self), fields(image_id = self.id))]
    pub async fn delete(&self) -> Result<()> {
        self.controller
            .call("one.image.delete", args![self.id])
            .await?;
        info!("Image deleted");
        Ok(())
    }
}

impl ImageSnapshotController<'_> {
    pub async fn delete(&self) -> Result<()> {
        self.controller
            .call("one.image.snapshotdelete", args![self.image_id, self.id])
            .await?;
        Ok(())
    }

    /// Revert the image to this snapshot.
    pub async fn revert(&self) -> Result<()> {
        self.controller
            .call("one.image.snapshotrevert", args![self.image_id, self.id])
            .await?;
        Ok(())
    }

    /// Flatten this snapshot into the image and discard the others.
    pub async fn flatten(&self) -> Result<()> {
        self.controller
            .call("one.image.snapshotflatten", args![self.image_id, self.id])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_from_xml() {
        let xml = r#"<IMAGE>
  <ID>4</ID>
  <UID>0</UID>
  <GID>0</GID>
  <UNAME>oneadmin</UNAME>
  <GNAME>oneadmin</GNAME>
  <NAME>ubuntu-18.04</NAME>
  <PERMISSIONS><OWNER_U>1</OWNER_U><OWNER_M>1</OWNER_M><OWNER_A>0</OWNER_A><GROUP_U>0</GROUP_U><GROUP_M>0</GROUP_M><GROUP_A>0</GROUP_A><OTHER_U>0</OTHER_U><OTHER_M>0</OTHER_M><OTHER_A>0</OTHER_A></PERMISSIONS>
  <TYPE>0</TYPE>
  <PERSISTENT>1</PERSISTENT>
  <SOURCE><![CDATA[/var/lib/one//datastores/1/8ef7]]></SOURCE>
  <SIZE>2252</SIZE>
  <STATE>2</STATE>
  <RUNNING_VMS>1</RUNNING_VMS>
  <DATASTORE_ID>1</DATASTORE_ID>
  <DATASTORE>default</DATASTORE>
  <VMS><ID>12</ID></VMS>
  <CLONES/>
  <SNAPSHOTS><ALLOW_ORPHANS>NO</ALLOW_ORPHANS></SNAPSHOTS>
  <TEMPLATE><DEV_PREFIX><![CDATA[vd]]></DEV_PREFIX></TEMPLATE>
</IMAGE>"#;

        let image = Image::from_xml_str(xml).unwrap();
        assert_eq!(image.id, 4);
        assert_eq!(image.owner.uname, "oneadmin");
        assert!(image.persistent);
        assert_eq!(image.state().unwrap(), ImageState::Used);
        assert_eq!(image.vms, vec![12]);
        assert!(image.clones.is_empty());
        assert_eq!(image.permissions.unwrap().owner_manage, 1);
        assert_eq!(
            image
                .template
                .get(oca_template::facade::image::ImageKey::DevPrefix)
                .unwrap(),
            "vd"
        );
    }

    #[test]
    fn test_unknown_state() {
        let image = Image {
            state_raw: 42,
            ..Image::default()
        };
        assert!(image.state().is_err());
        assert_eq!(ImageState::LockUsedPers.to_string(), "LOCKED_USED_PERS");
    }
}
