//! Virtual networks.

use oca_template::facade::vnet::{AddressRange, VirtualNetworkTemplate};
use oca_template::xml::read_id_list;
use oca_template::{FromXml, TemplateVector, XmlReader};
use tracing::{info, instrument};

use crate::args;
use crate::controller::{Controller, LockInfo, Ownership, Pool, PoolItem};
use crate::error::Result;
use crate::filter::Filter;
use crate::params::{Permissions, UpdateType};

pub type VirtualNetworkPool = Pool<VirtualNetwork>;

/// A virtual network as returned by `one.vn.info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualNetwork {
    pub id: i64,
    pub name: String,
    pub owner: Ownership,
    pub permissions: Option<Permissions>,
    pub lock: Option<LockInfo>,
    pub clusters: Vec<i64>,
    pub bridge: String,
    pub bridge_type: String,
    pub parent_network_id: Option<i64>,
    pub vn_mad: String,
    pub phydev: String,
    pub vlan_id: String,
    pub used_leases: i64,
    pub vrouters: Vec<i64>,
    pub template: VirtualNetworkTemplate,
    /// Address ranges with their usage counters.
    pub address_ranges: Vec<AddressRange>,
}

impl FromXml for VirtualNetwork {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut vnet = VirtualNetwork::default();
        reader.read_children(start, |r, child| {
            if vnet.owner.read_field(r, &child)? {
                return Ok(());
            }
            match child.as_str() {
                "ID" => vnet.id = r.read_parsed(&child)?,
                "NAME" => vnet.name = r.read_text(&child)?,
                "PERMISSIONS" => vnet.permissions = Some(Permissions::from_xml(r, &child)?),
                "LOCK" => vnet.lock = Some(LockInfo::from_xml(r, &child)?),
                "CLUSTERS" => vnet.clusters = read_id_list(r, &child)?,
                "BRIDGE" => vnet.bridge = r.read_text(&child)?,
                "BRIDGE_TYPE" => vnet.bridge_type = r.read_text(&child)?,
                "PARENT_NETWORK_ID" => {
                    let text = r.read_text(&child)?;
                    vnet.parent_network_id = text.trim().parse().ok();
                }
                "VN_MAD" => vnet.vn_mad = r.read_text(&child)?,
                "PHYDEV" => vnet.phydev = r.read_text(&child)?,
                "VLAN_ID" => vnet.vlan_id = r.read_text(&child)?,
                "USED_LEASES" => vnet.used_leases = r.read_parsed(&child)?,
                "VROUTERS" => vnet.vrouters = read_id_list(r, &child)?,
                "TEMPLATE" => vnet.template = VirtualNetworkTemplate::from_xml(r, &child)?,
                "AR_POOL" => {
                    r.read_children(&child, |r, ar| {
                        if ar == AddressRange::KEY {
                            vnet.address_ranges
                                .push(TemplateVector::from_xml(r, &ar)?.into());
                            Ok(())
                        } else {
                            r.skip_element(&ar)
                        }
                    })?;
                }
                _ => r.skip_element(&child)?,
            }
            Ok(())
        })?;
        Ok(vnet)
    }
}

impl PoolItem for VirtualNetwork {
    const TAG: &'static str = "VNET";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct VirtualNetworksController<'a> {
    controller: &'a Controller,
}

pub struct VirtualNetworkController<'a> {
    controller: &'a Controller,
    pub id: i64,
}

impl Controller {
    pub fn vnets(&self) -> VirtualNetworksController<'_> {
        VirtualNetworksController { controller: self }
    }

    pub fn vnet(&self, id: i64) -> VirtualNetworkController<'_> {
        VirtualNetworkController {
            controller: self,
            id,
        }
    }
}

impl VirtualNetworksController<'_> {
    #[instrument(skip(self))]
    pub async fn info(&self, filter: &Filter) -> Result<VirtualNetworkPool> {
        self.controller
            .call_parse("one.vnpool.info", filter.to_args())
            .await
    }

    pub async fn by_name(&self, name: &str, filter: &Filter) -> Result<i64> {
        self.info(filter).await?.by_name(name)
    }

    /// Allocate a network in `cluster_id` (-1 for the default cluster),
    /// returning its id.
    #[instrument(skip(self, template))]
    pub async fn create(&self, template: &VirtualNetworkTemplate, cluster_id: i64) -> Result<i64> {
        let id = self
            .controller
            .call_id("one.vn.allocate", args![template.to_string(), cluster_id])
            .await?;

        info!(vnet_id = id, "Virtual network allocated");
        Ok(id)
    }
}

impl VirtualNetworkController<'_> {
    #[instrument(skip(self), fields(vnet_id = self.id))]
    pub async fn info(&self) -> Result<VirtualNetwork> {
        self.controller.call_parse("one.vn.info", args![self.id]).await
    }

    #[instrument(skip(self, ar), fields(vnet_id = self.id))]
    pub async fn add_ar(&self, ar: &AddressRange) -> Result<()> {
        self.controller
            .call("one.vn.add_ar", args![self.id, ar.to_string()])
            .await?;
        Ok(())
    }

    pub async fn rm_ar(&self, ar_id: i64) -> Result<()> {
        self.controller
            .call("one.vn.rm_ar", args![self.id, ar_id])
            .await?;
        Ok(())
    }

    #[instrument(skip(self, template), fields(vnet_id = self.id))]
    pub async fn update(&self, template: &VirtualNetworkTemplate, mode: UpdateType) -> Result<()> {
        self.controller
            .call("one.vn.update", args![self.id, template.to_string(), mode])
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(vnet_id = self.id))]
    pub async fn delete(&self) -> Result<()> {
        self.controller
            .call("one.vn.delete", args![self.id])
            .await?;
        info!("Virtual network deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oca_template::facade::vnet::AddressRangeKey;

    #[test]
    fn test_vnet_from_xml() {
        let xml = r#"<VNET>
  <ID>0</ID>
  <UID>0</UID>
  <GID>0</GID>
  <UNAME>oneadmin</UNAME>
  <GNAME>oneadmin</GNAME>
  <NAME>private</NAME>
  <CLUSTERS><ID>0</ID></CLUSTERS>
  <BRIDGE><![CDATA[br0]]></BRIDGE>
  <PARENT_NETWORK_ID><![CDATA[]]></PARENT_NETWORK_ID>
  <VN_MAD><![CDATA[bridge]]></VN_MAD>
  <USED_LEASES>1</USED_LEASES>
  <VROUTERS/>
  <TEMPLATE>
    <VN_MAD><![CDATA[bridge]]></VN_MAD>
    <DNS><![CDATA[1.1.1.1]]></DNS>
  </TEMPLATE>
  <AR_POOL>
    <AR>
      <AR_ID><![CDATA[0]]></AR_ID>
      <IP><![CDATA[192.168.150.2]]></IP>
      <SIZE><![CDATA[50]]></SIZE>
      <TYPE><![CDATA[IP4]]></TYPE>
    </AR>
  </AR_POOL>
</VNET>"#;

        let vnet = VirtualNetwork::from_xml_str(xml).unwrap();
        assert_eq!(vnet.name, "private");
        assert_eq!(vnet.clusters, vec![0]);
        assert_eq!(vnet.parent_network_id, None);
        assert_eq!(vnet.template.vn_mad(), Some("bridge"));
        assert_eq!(vnet.address_ranges.len(), 1);
        assert_eq!(vnet.address_ranges[0].id().unwrap(), 0);
        assert_eq!(
            vnet.address_ranges[0].get(AddressRangeKey::Size).unwrap(),
            "50"
        );
    }
}
