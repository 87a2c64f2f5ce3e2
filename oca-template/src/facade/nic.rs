//! `NIC` vectors of VM templates.

use crate::keys::template_keys;

use super::vector_facade;

template_keys! {
    pub enum NicKey {
        NicId => "NIC_ID",
        ArId => "AR_ID",
        Bridge => "BRIDGE",
        BridgeType => "BRIDGE_TYPE",
        ClusterId => "CLUSTER_ID",
        Filter => "FILTER",
        FloatingIp => "FLOATING_IP",
        Gateway => "GATEWAY",
        Ip => "IP",
        Mac => "MAC",
        Mtu => "MTU",
        Network => "NETWORK",
        NetworkMask => "NETWORK_MASK",
        NetworkId => "NETWORK_ID",
        NetworkUid => "NETWORK_UID",
        NetworkUname => "NETWORK_UNAME",
        NetworkAddress => "NETWORK_ADDRESS",
        PhyDev => "PHYDEV",
        PublicIp => "PUBLIC_IP",
        SecurityGroups => "SECURITY_GROUPS",
        Target => "TARGET",
        VlanId => "VLAN_ID",
        VnMad => "VN_MAD",
    }
}

vector_facade! {
    /// A network interface of a VM.
    Nic, "NIC", NicKey, id = NicKey::NicId
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::TemplateVector;

    #[test]
    fn test_nic_from_parsed_vector() {
        let mut vector = TemplateVector::parsed("NIC");
        vector.add_pair("NIC_ID", 0u32).add_pair("IP", "10.0.0.7");
        let nic = Nic::from(vector);

        assert_eq!(nic.id().unwrap(), 0);
        assert_eq!(nic.get(NicKey::Ip).unwrap(), "10.0.0.7");
        assert!(nic.get(NicKey::Mac).is_err());
    }
}
