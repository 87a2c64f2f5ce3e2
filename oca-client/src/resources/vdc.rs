//! Virtual data centers: groups bound to slices of zone resources.

use oca_template::facade::vdc::VdcTemplate;
use oca_template::xml::read_id_list;
use oca_template::{FromXml, XmlReader};
use tracing::{info, instrument};

use crate::args;
use crate::controller::{Controller, Pool, PoolItem};
use crate::error::Result;
use crate::params::UpdateType;

pub type VdcPool = Pool<Vdc>;

/// A resource of a zone assigned to a VDC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneResource {
    pub zone_id: i64,
    pub resource_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vdc {
    pub id: i64,
    pub name: String,
    pub groups: Vec<i64>,
    pub clusters: Vec<ZoneResource>,
    pub hosts: Vec<ZoneResource>,
    pub datastores: Vec<ZoneResource>,
    pub vnets: Vec<ZoneResource>,
    pub template: VdcTemplate,
}

/// Read `<CLUSTERS><CLUSTER><ZONE_ID/><CLUSTER_ID/></CLUSTER>...</CLUSTERS>`.
fn read_zone_resources(
    reader: &mut XmlReader<'_>,
    parent: &str,
    item: &str,
    id_tag: &str,
) -> oca_template::Result<Vec<ZoneResource>> {
    let mut resources = Vec::new();
    reader.read_children(parent, |r, child| {
        if child != item {
            return r.skip_element(&child);
        }
        let mut resource = ZoneResource::default();
        r.read_children(&child, |r, field| {
            if field == "ZONE_ID" {
                resource.zone_id = r.read_parsed(&field)?;
            } else if field == id_tag {
                resource.resource_id = r.read_parsed(&field)?;
            } else {
                r.skip_element(&field)?;
            }
            Ok(())
        })?;
        resources.push(resource);
        Ok(())
    })?;
    Ok(resources)
}

impl FromXml for Vdc {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut vdc = Vdc::default();
        reader.read_children(start, |r, child| {
            match child.as_str() {
                "ID" => vdc.id = r.read_parsed(&child)?,
                "NAME" => vdc.name = r.read_text(&child)?,
                "GROUPS" => vdc.groups = read_id_list(r, &child)?,
                "CLUSTERS" => {
                    vdc.clusters = read_zone_resources(r, &child, "CLUSTER", "CLUSTER_ID")?
                }
                "HOSTS" => vdc.hosts = read_zone_resources(r, &child, "HOST", "HOST_ID")?,
                "DATASTORES" => {
                    vdc.datastores =
                        read_zone_resources(r, &child, "DATASTORE", "DATASTORE_ID")?
                }
                "VNETS" => vdc.vnets = read_zone_resources(r, &child, "VNET", "VNET_ID")?,
                "TEMPLATE" => vdc.template = VdcTemplate::from_xml(r, &child)?,
                _ => r.skip_element(&child)?,
            }
            Ok(())
        })?;
        Ok(vdc)
    }
}

impl PoolItem for Vdc {
    const TAG: &'static str = "VDC";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct VdcsController<'a> {
    controller: &'a Controller,
}

pub struct VdcController<'a> {
    controller: &'a Controller,
    pub id: i64,
}

impl Controller {
    pub fn vdcs(&self) -> VdcsController<'_> {
        VdcsController { controller: self }
    }

    pub fn vdc(&self, id: i64) -> VdcController<'_> {
        VdcController {
            controller: self,
            id,
        }
    }
}

impl VdcsController<'_> {
    /// List every VDC; the pool takes no filter.
    #[instrument(skip(self))]
    pub async fn info(&self) -> Result<VdcPool> {
        self.controller.call_parse("one.vdcpool.info", args![]).await
    }

    pub async fn by_name(&self, name: &str) -> Result<i64> {
        self.info().await?.by_name(name)
    }

    /// Allocate a VDC, returning its id. `cluster_id` is -1 for none.
    #[instrument(skip(self, template))]
    pub async fn create(&self, name: &str, cluster_id: i64, mut template: VdcTemplate) -> Result<i64> {
        template.set_name(name);

        let id = self
            .controller
            .call_id("one.vdc.allocate", args![template.to_string(), cluster_id])
            .await?;

        info!(vdc_id = id, "VDC allocated");
        Ok(id)
    }
}

impl VdcController<'_> {
    #[instrument(skip(self), fields(vdc_id = self.id))]
    pub async fn info(&self) -> Result<Vdc> {
        self.controller
            .call_parse("one.vdc.info", args![self.id])
            .await
    }

    #[instrument(skip(self, template), fields(vdc_id = self.id))]
    pub async fn update(&self, template: &VdcTemplate, mode: UpdateType) -> Result<()> {
        self.controller
            .call("one.vdc.update", args![self.id, template.to_string(), mode])
            .await?;
        Ok(())
    }

    pub async fn rename(&self, name: &str) -> Result<()> {
        self.controller
            .call("one.vdc.rename", args![self.id, name])
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(vdc_id = self.id))]
    pub async fn delete(&self) -> Result<()> {
        self.controller
            .call("one.vdc.delete", args![self.id])
            .await?;
        info!("VDC deleted");
        Ok(())
    }

    pub async fn add_group(&self, group_id: i64) -> Result<()> {
        self.controller
            .call("one.vdc.addgroup", args![self.id, group_id])
            .await?;
        Ok(())
    }

    pub async fn del_group(&self, group_id: i64) -> Result<()> {
        self.controller
            .call("one.vdc.delgroup", args![self.id, group_id])
            .await?;
        Ok(())
    }

    async fn zone_call(&self, method: &str, zone_id: i64, resource_id: i64) -> Result<()> {
        self.controller
            .call(method, args![self.id, zone_id, resource_id])
            .await?;
        Ok(())
    }

    pub async fn add_cluster(&self, zone_id: i64, cluster_id: i64) -> Result<()> {
        self.zone_call("one.vdc.addcluster", zone_id, cluster_id).await
    }

    pub async fn del_cluster(&self, zone_id: i64, cluster_id: i64) -> Result<()> {
        self.zone_call("one.vdc.delcluster", zone_id, cluster_id).await
    }

    pub async fn add_host(&self, zone_id: i64, host_id: i64) -> Result<()> {
        self.zone_call("one.vdc.addhost", zone_id, host_id).await
    }

    pub async fn del_host(&self, zone_id: i64, host_id: i64) -> Result<()> {
        self.zone_call("one.vdc.delhost", zone_id, host_id).await
    }

    pub async fn add_datastore(&self, zone_id: i64, datastore_id: i64) -> Result<()> {
        self.zone_call("one.vdc.adddatastore", zone_id, datastore_id)
            .await
    }

    pub async fn del_datastore(&self, zone_id: i64, datastore_id: i64) -> Result<()> {
        self.zone_call("one.vdc.deldatastore", zone_id, datastore_id)
            .await
    }

    pub async fn add_vnet(&self, zone_id: i64, vnet_id: i64) -> Result<()> {
        self.zone_call("one.vdc.addvnet", zone_id, vnet_id).await
    }

    pub async fn del_vnet(&self, zone_id: i64, vnet_id: i64) -> Result<()> {
        self.zone_call("one.vdc.delvnet", zone_id, vnet_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oca_template::facade::NamedKey;

    #[test]
    fn test_vdc_from_xml() {
        let xml = "<VDC><ID>100</ID><NAME>edge</NAME>\
                   <GROUPS><ID>1</ID><ID>105</ID></GROUPS>\
                   <CLUSTERS><CLUSTER><ZONE_ID>0</ZONE_ID><CLUSTER_ID>100</CLUSTER_ID></CLUSTER></CLUSTERS>\
                   <HOSTS/>\
                   <DATASTORES><DATASTORE><ZONE_ID>0</ZONE_ID><DATASTORE_ID>1</DATASTORE_ID></DATASTORE></DATASTORES>\
                   <VNETS/>\
                   <TEMPLATE><DESCRIPTION>Edge sites</DESCRIPTION></TEMPLATE></VDC>";

        let vdc = Vdc::from_xml_str(xml).unwrap();
        assert_eq!(vdc.groups, vec![1, 105]);
        assert_eq!(
            vdc.clusters,
            vec![ZoneResource {
                zone_id: 0,
                resource_id: 100
            }]
        );
        assert!(vdc.hosts.is_empty());
        assert_eq!(vdc.datastores[0].resource_id, 1);
        assert_eq!(vdc.template.get(NamedKey::Description).unwrap(), "Edge sites");
    }
}
