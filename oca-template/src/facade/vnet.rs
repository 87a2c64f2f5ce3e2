//! Virtual network templates and address ranges.

use std::fmt;

use crate::dynamic::DynamicTemplate;
use crate::error::Result;
use crate::keys::template_keys;
use crate::pair::{PairValue, TemplatePair};
use crate::vector::TemplateVector;
use crate::xml::{FromXml, XmlReader};

use super::{join_parts, vector_facade};

const VN_MAD: &str = "VN_MAD";

template_keys! {
    pub enum VnetKey {
        // Physical network
        Name => "NAME",
        Description => "DESCRIPTION",
        Bridge => "BRIDGE",
        VlanId => "VLAN_ID",
        AutomaticVlanId => "AUTOMATIC_VLAN_ID",
        PhyDev => "PHYDEV",
        // Quality of service
        InboundAvgBw => "INBOUND_AVG_BW",
        InboundPeakBw => "INBOUND_PEAK_BW",
        InboundPeakKb => "INBOUND_PEAK_KB",
        OutboundAvgBw => "OUTBOUND_AVG_BW",
        OutboundPeakBw => "OUTBOUND_PEAK_BW",
        OutboundPeakKb => "OUTBOUND_PEAK_KB",
        // Contextualization
        NetworkMask => "NETWORK_MASK",
        NetworkAddress => "NETWORK_ADDRESS",
        Gateway => "GATEWAY",
        Gateway6 => "GATEWAY6",
        Dns => "DNS",
        GuestMtu => "GUEST_MTU",
        ContextForceIpv4 => "CONTEXT_FORCE_IPV4",
        SearchDomain => "SEARCH_DOMAIN",
        SecurityGroups => "SECURITY_GROUPS",
        // Interface creation
        Conf => "CONF",
        OvsBridgeConf => "OVS_BRIDGE_CONF",
        IpLinkConf => "IP_LINK_CONF",
    }
}

template_keys! {
    pub enum AddressRangeKey {
        ArId => "AR_ID",
        Ip => "IP",
        Size => "SIZE",
        /// IP4, IP6, IP6_STATIC, IP4_6, IP4_6_STATIC or ETHER
        Type => "TYPE",
        Mac => "MAC",
        GlobalPrefix => "GLOBAL_PREFIX",
        UlaPrefix => "ULA_PREFIX",
        PrefixLength => "PREFIX_LENGTH",
    }
}

vector_facade! {
    /// A range of leases of a virtual network.
    AddressRange, "AR", AddressRangeKey, id = AddressRangeKey::ArId
}

/// Template of a virtual network: driver, address ranges and free
/// attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualNetworkTemplate {
    vn_mad: Option<String>,
    ars: Vec<AddressRange>,
    dynamic: DynamicTemplate,
}

impl VirtualNetworkTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: VnetKey) -> Result<&str> {
        self.dynamic.get_str(key.as_str())
    }

    pub fn add(&mut self, key: VnetKey, value: impl Into<PairValue>) -> &mut Self {
        self.dynamic.add_pair(key.as_str(), value);
        self
    }

    /// Network driver (bridge, 802.1Q, vxlan, ovswitch...).
    pub fn vn_mad(&self) -> Option<&str> {
        self.vn_mad.as_deref()
    }

    pub fn set_vn_mad(&mut self, driver: &str) -> &mut Self {
        self.vn_mad = Some(driver.to_string());
        self
    }

    pub fn add_ar(&mut self, ar: AddressRange) -> &mut Self {
        self.ars.push(ar);
        self
    }

    pub fn ars(&self) -> &[AddressRange] {
        &self.ars
    }

    pub fn dynamic(&self) -> &DynamicTemplate {
        &self.dynamic
    }

    pub fn dynamic_mut(&mut self) -> &mut DynamicTemplate {
        &mut self.dynamic
    }
}

impl fmt::Display for VirtualNetworkTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .vn_mad
            .iter()
            .map(|driver| TemplatePair::new(VN_MAD, driver).to_string())
            .chain(self.ars.iter().map(ToString::to_string))
            .chain(std::iter::once(self.dynamic.to_string()));

        f.write_str(&join_parts(parts))
    }
}

impl FromXml for VirtualNetworkTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        let mut tpl = VirtualNetworkTemplate::new();
        let VirtualNetworkTemplate {
            vn_mad,
            ars,
            dynamic,
        } = &mut tpl;

        dynamic.read_children_filtered(
            reader,
            start,
            |key| key != VN_MAD && key != AddressRange::KEY,
            |r, child| {
                if child == VN_MAD {
                    *vn_mad = Some(r.read_text(&child)?);
                } else {
                    ars.push(TemplateVector::from_xml(r, &child)?.into());
                }
                Ok(())
            },
        )?;
        Ok(tpl)
    }
}
