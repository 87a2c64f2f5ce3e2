//! Documents: generic typed objects stored by the control plane.

use oca_template::facade::document::DocumentTemplate;
use oca_template::{FromXml, XmlReader};
use tracing::{info, instrument};

use crate::args;
use crate::controller::{Controller, LockInfo, Ownership, Pool, PoolItem};
use crate::error::Result;
use crate::filter::{DocumentFilter, Filter};
use crate::params::{LockLevel, Permissions, UpdateType};

pub type DocumentPool = Pool<Document>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub owner: Ownership,
    pub doc_type: String,
    pub permissions: Option<Permissions>,
    pub lock: Option<LockInfo>,
    pub template: DocumentTemplate,
}

impl FromXml for Document {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut doc = Document::default();
        reader.read_children(start, |r, child| {
            if doc.owner.read_field(r, &child)? {
                return Ok(());
            }
            match child.as_str() {
                "ID" => doc.id = r.read_parsed(&child)?,
                "NAME" => doc.name = r.read_text(&child)?,
                "TYPE" => doc.doc_type = r.read_text(&child)?,
                "PERMISSIONS" => doc.permissions = Some(Permissions::from_xml(r, &child)?),
                "LOCK" => doc.lock = Some(LockInfo::from_xml(r, &child)?),
                "TEMPLATE" => doc.template = DocumentTemplate::from_xml(r, &child)?,
                _ => r.skip_element(&child)?,
            }
            Ok(())
        })?;
        Ok(doc)
    }
}

impl PoolItem for Document {
    const TAG: &'static str = "DOCUMENT";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Operations on the documents of one type.
pub struct DocumentsController<'a> {
    controller: &'a Controller,
    pub doc_type: i64,
}

pub struct DocumentController<'a> {
    controller: &'a Controller,
    pub id: i64,
}

impl Controller {
    pub fn documents(&self, doc_type: i64) -> DocumentsController<'_> {
        DocumentsController {
            controller: self,
            doc_type,
        }
    }

    pub fn document(&self, id: i64) -> DocumentController<'_> {
        DocumentController {
            controller: self,
            id,
        }
    }
}

impl DocumentsController<'_> {
    #[instrument(skip(self), fields(doc_type = self.doc_type))]
    pub async fn info(&self, filter: &Filter) -> Result<DocumentPool> {
        let filter = DocumentFilter::with_filter(*filter, self.doc_type);
        self.controller
            .call_parse("one.documentpool.info", filter.to_args())
            .await
    }

    pub async fn by_name(&self, name: &str, filter: &Filter) -> Result<i64> {
        self.info(filter).await?.by_name(name)
    }

    /// Id of the only document whose template holds `key="value"`.
    pub async fn by_pair(&self, key: &str, value: &str, filter: &Filter) -> Result<i64> {
        self.info(filter).await?.find_unique(
            &format!("DOCUMENT with {}={:?}", key, value),
            |doc| doc.template.template().match_pair(key, value),
        )
    }

    /// Allocate a document of this type, returning its id.
    #[instrument(skip(self, template), fields(doc_type = self.doc_type))]
    pub async fn create(&self, name: &str, mut template: DocumentTemplate) -> Result<i64> {
        template.set_name(name);

        let id = self
            .controller
            .call_id(
                "one.document.allocate",
                args![template.to_string(), self.doc_type],
            )
            .await?;

        info!(document_id = id, "Document allocated");
        Ok(id)
    }
}

impl DocumentController<'_> {
    #[instrument(skip(self), fields(document_id = self.id))]
    pub async fn info(&self) -> Result<Document> {
        self.controller
            .call_parse("one.document.info", args![self.id])
            .await
    }

    #[instrument(skip(self, template), fields(document_id = self.id))]
    pub async fn update(&self, template: &DocumentTemplate, mode: UpdateType) -> Result<()> {
        self.controller
            .call(
                "one.document.update",
                args![self.id, template.to_string(), mode],
            )
            .await?;
        Ok(())
    }

    /// Clone under a new name, returning the clone id.
    pub async fn clone(&self, name: &str) -> Result<i64> {
        self.controller
            .call_id("one.document.clone", args![self.id, name])
            .await
    }

    pub async fn chmod(&self, permissions: &Permissions) -> Result<()> {
        self.controller
            .call("one.document.chmod", permissions.to_args(self.id))
            .await?;
        Ok(())
    }

    pub async fn chown(&self, uid: i64, gid: i64) -> Result<()> {
        self.controller
            .call("one.document.chown", args![self.id, uid, gid])
            .await?;
        Ok(())
    }

    pub async fn rename(&self, name: &str) -> Result<()> {
        self.controller
            .call("one.document.rename", args![self.id, name])
            .await?;
        Ok(())
    }

    pub async fn lock(&self, level: LockLevel) -> Result<()> {
        self.controller
            .call("one.document.lock", args![self.id, level])
            .await?;
        Ok(())
    }

    pub async fn unlock(&self) -> Result<()> {
        self.controller
            .call("one.document.unlock", args![self.id])
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(document_id = self.id))]
    pub async fn delete(&self) -> Result<()> {
        self.controller
            .call("one.document.delete", args![self.id])
            .await?;
        info!("Document deleted");
        Ok(())
    }
}
