//! Virtual machine templates.
//!
//! A VM template is the one facade with real structure: capacity fields,
//! a context vector, repeated disk/NIC/scheduled-action vectors, the
//! snapshots and security group rules the control plane reports, and a
//! dynamic remainder for everything else. The wire text always lists them in
//! that order.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::dynamic::DynamicTemplate;
use crate::error::{Result, TemplateError};
use crate::keys::template_keys;
use crate::pair::{PairValue, TemplatePair};
use crate::vector::TemplateVector;
use crate::xml::{FromXml, XmlReader};

use super::disk::Disk;
use super::nic::Nic;
use super::{ensure_absent, join_parts, vector_facade};

const CONTEXT: &str = "CONTEXT";
const CPU_MODEL: &str = "CPU_MODEL";
const FEATURES: &str = "FEATURES";
const GRAPHICS: &str = "GRAPHICS";
const INPUT: &str = "INPUT";
const OS: &str = "OS";

/// Tags bound to named fields; never stored in the dynamic remainder.
const BOUND_KEYS: &[&str] = &[
    "CPU",
    "VCPU",
    "MEMORY",
    CONTEXT,
    Disk::KEY,
    Nic::KEY,
    SchedAction::KEY,
    VmSnapshot::KEY,
    SecurityGroupRule::KEY,
];

// =============================================================================
// Key sets
// =============================================================================

template_keys! {
    pub enum CapacityKey {
        Cpu => "CPU",
        Vcpu => "VCPU",
        Memory => "MEMORY",
    }
}

template_keys! {
    /// Showback cost attributes.
    pub enum ShowbackKey {
        MemoryCost => "MEMORY_COST",
        CpuCost => "CPU_COST",
        DiskCost => "DISK_COST",
    }
}

template_keys! {
    /// Keys of the `OS` vector (boot and kernel).
    pub enum OsKey {
        Arch => "ARCH",
        Machine => "MACHINE",
        Kernel => "KERNEL",
        KernelDs => "KERNEL_DS",
        Initrd => "INITRD",
        InitrdDs => "INITRD_DS",
        Root => "ROOT",
        KernelCmd => "KERNEL_CMD",
        Bootloader => "BOOTLOADER",
        Boot => "BOOT",
    }
}

template_keys! {
    pub enum CpuModelKey {
        Model => "MODEL",
    }
}

template_keys! {
    pub enum FeatureKey {
        Pae => "PAE",
        Acpi => "ACPI",
        Apic => "APIC",
        LocalTime => "LOCAL_TIME",
        GuestAgent => "GUEST_AGENT",
        VirtioScsiQueues => "VIRTIO_SCSI_QUEUES",
    }
}

template_keys! {
    pub enum GraphicsKey {
        /// vnc, sdl or spice
        Type => "TYPE",
        Listen => "LISTEN",
        Port => "PORT",
        Passwd => "PASSWD",
        Keymap => "KEYMAP",
        RandomPasswd => "RANDOM_PASSWD",
    }
}

template_keys! {
    pub enum InputKey {
        /// mouse or tablet
        Type => "TYPE",
        /// usb or ps2
        Bus => "BUS",
    }
}

template_keys! {
    /// Contextualization attributes. `ETHx_*` attributes are not listed.
    pub enum ContextKey {
        Dns => "DNS",
        DnsHostname => "DNS_HOSTNAME",
        Ec2PublicKey => "EC2_PUBLIC_KEY",
        Files => "FILES",
        FilesDs => "FILES_DS",
        GatewayIface => "GATEWAY_IFACE",
        Network => "NETWORK",
        InitScripts => "INIT_SCRIPTS",
        SshPublicKey => "SSH_PUBLIC_KEY",
        Target => "TARGET",
        Token => "TOKEN",
        Username => "USERNAME",
        Variable => "VARIABLE",
        SecureTty => "SECURETTY",
        SetHostname => "SET_HOSTNAME",
    }
}

template_keys! {
    /// Context attributes whose value travels base64 encoded.
    pub enum ContextB64Key {
        PasswordBase64 => "PASSWORD_BASE64",
        StartScriptBase64 => "START_SCRIPT_BASE64",
        CryptedPasswordBase64 => "CRYPTED_PASSWORD_BASE64",
    }
}

template_keys! {
    /// Scheduler placement attributes.
    pub enum PlacementKey {
        SchedRequirements => "SCHED_REQUIREMENTS",
        SchedRank => "SCHED_RANK",
        SchedDsRequirements => "SCHED_DS_REQUIREMENTS",
        SchedDsRank => "SCHED_DS_RANK",
        UserPriority => "USER_PRIORITY",
    }
}

template_keys! {
    pub enum SchedActionKey {
        Id => "ID",
        Time => "TIME",
        Repeat => "REPEAT",
        Days => "DAYS",
        Action => "ACTION",
        EndType => "END_TYPE",
        EndValue => "END_VALUE",
    }
}

vector_facade! {
    /// An action the scheduler runs on the VM at a given time.
    SchedAction, "SCHED_ACTION", SchedActionKey, id = SchedActionKey::Id
}

template_keys! {
    pub enum SnapshotKey {
        SnapshotId => "SNAPSHOT_ID",
        Name => "NAME",
        Active => "ACTIVE",
        Time => "TIME",
        HypervisorId => "HYPERVISOR_ID",
        SystemDiskSize => "SYSTEM_DISK_SIZE",
    }
}

vector_facade! {
    /// A system snapshot of the VM, reported by the control plane.
    VmSnapshot, "SNAPSHOT", SnapshotKey, id = SnapshotKey::SnapshotId
}

template_keys! {
    pub enum SecurityGroupRuleKey {
        SecurityGroupId => "SECURITY_GROUP_ID",
        SecurityGroupName => "SECURITY_GROUP_NAME",
        Protocol => "PROTOCOL",
        /// inbound or outbound
        RuleType => "RULE_TYPE",
        Ip => "IP",
        Size => "SIZE",
        Range => "RANGE",
        IcmpType => "ICMP_TYPE",
        Icmpv6Type => "ICMPV6_TYPE",
        NetworkId => "NETWORK_ID",
    }
}

vector_facade! {
    /// A security group rule applied to the VM NICs.
    SecurityGroupRule, "SECURITY_GROUP_RULE", SecurityGroupRuleKey,
    id = SecurityGroupRuleKey::SecurityGroupId
}

// =============================================================================
// Capacity and context
// =============================================================================

/// CPU share, virtual CPUs and memory (MB) of a VM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmCapacity {
    pub cpu: f64,
    pub vcpu: u64,
    pub memory: u64,
}

/// The `CONTEXT` vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmContext {
    vector: TemplateVector,
}

impl VmContext {
    pub fn new() -> Self {
        Self {
            vector: TemplateVector::new(CONTEXT),
        }
    }

    pub fn get(&self, key: ContextKey) -> Result<&str> {
        self.vector.get_str(key.as_str())
    }

    pub fn add(&mut self, key: ContextKey, value: impl Into<PairValue>) -> &mut Self {
        self.vector.add_pair(key.as_str(), value);
        self
    }

    /// Add `value` base64 encoded.
    pub fn add_b64(&mut self, key: ContextB64Key, value: &str) -> &mut Self {
        self.vector.add_pair(key.as_str(), STANDARD.encode(value));
        self
    }

    /// Decode a base64 attribute.
    pub fn get_b64(&self, key: ContextB64Key) -> Result<String> {
        let raw = self.vector.get_str(key.as_str())?;
        let bytes = STANDARD
            .decode(raw)
            .map_err(|e| TemplateError::TypeMismatch(format!("{} is not base64: {}", key, e)))?;
        String::from_utf8(bytes)
            .map_err(|e| TemplateError::TypeMismatch(format!("{} is not UTF-8: {}", key, e)))
    }

    pub fn vector(&self) -> &TemplateVector {
        &self.vector
    }

    pub fn vector_mut(&mut self) -> &mut TemplateVector {
        &mut self.vector
    }
}

impl Default for VmContext {
    fn default() -> Self {
        Self::new()
    }
}

impl From<TemplateVector> for VmContext {
    fn from(vector: TemplateVector) -> Self {
        Self { vector }
    }
}

impl fmt::Display for VmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.vector, f)
    }
}

// =============================================================================
// VM template
// =============================================================================

/// Template of a VM or VM template resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmTemplate {
    cpu: Option<f64>,
    vcpu: Option<u64>,
    memory: Option<u64>,
    context: Option<VmContext>,
    disks: Vec<Disk>,
    nics: Vec<Nic>,
    sched_actions: Vec<SchedAction>,
    snapshots: Vec<VmSnapshot>,
    security_group_rules: Vec<SecurityGroupRule>,
    dynamic: DynamicTemplate,
}

impl VmTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Capacity
    // -------------------------------------------------------------------------

    /// Set CPU, VCPU and MEMORY. Fails if any of them is already set.
    pub fn set_capacity(&mut self, cpu: f64, vcpu: u64, memory: u64) -> Result<()> {
        let present = [
            (CapacityKey::Cpu, self.cpu.is_some()),
            (CapacityKey::Vcpu, self.vcpu.is_some()),
            (CapacityKey::Memory, self.memory.is_some()),
        ];
        if let Some((key, _)) = present.iter().find(|(_, set)| *set) {
            return Err(TemplateError::KeyConflict(key.to_string()));
        }
        ensure_absent(&self.dynamic, CapacityKey::ALL)?;

        self.cpu = Some(cpu);
        self.vcpu = Some(vcpu);
        self.memory = Some(memory);
        Ok(())
    }

    /// Capacity with defaults applied: VCPU is 1 when unset.
    pub fn capacity(&self) -> VmCapacity {
        VmCapacity {
            cpu: self.cpu.unwrap_or(0.0),
            vcpu: match self.vcpu {
                None | Some(0) => 1,
                Some(v) => v,
            },
            memory: self.memory.unwrap_or(0),
        }
    }

    // -------------------------------------------------------------------------
    // Context
    // -------------------------------------------------------------------------

    pub fn context(&self) -> Option<&VmContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> &mut VmContext {
        self.context.get_or_insert_with(VmContext::new)
    }

    pub fn add_ctx(&mut self, key: ContextKey, value: impl Into<PairValue>) -> &mut Self {
        self.context_mut().add(key, value);
        self
    }

    pub fn add_b64_ctx(&mut self, key: ContextB64Key, value: &str) -> &mut Self {
        self.context_mut().add_b64(key, value);
        self
    }

    pub fn get_ctx(&self, key: ContextKey) -> Result<&str> {
        self.context
            .as_ref()
            .ok_or_else(|| TemplateError::NotFound(CONTEXT.to_string()))?
            .get(key)
    }

    // -------------------------------------------------------------------------
    // Disks, NICs, scheduled actions
    // -------------------------------------------------------------------------

    pub fn add_disk(&mut self, disk: Disk) -> &mut Self {
        self.disks.push(disk);
        self
    }

    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    pub fn add_nic(&mut self, nic: Nic) -> &mut Self {
        self.nics.push(nic);
        self
    }

    pub fn nics(&self) -> &[Nic] {
        &self.nics
    }

    pub fn add_sched_action(&mut self, action: SchedAction) -> &mut Self {
        self.sched_actions.push(action);
        self
    }

    pub fn sched_actions(&self) -> &[SchedAction] {
        &self.sched_actions
    }

    /// Snapshots reported by the control plane. Only read from XML.
    pub fn snapshots(&self) -> &[VmSnapshot] {
        &self.snapshots
    }

    /// Security group rules reported by the control plane. Only read from XML.
    pub fn security_group_rules(&self) -> &[SecurityGroupRule] {
        &self.security_group_rules
    }

    // -------------------------------------------------------------------------
    // Set-once groups
    // -------------------------------------------------------------------------

    /// Set showback costs. Fails, leaving the template untouched, if any
    /// showback cost is already present.
    pub fn set_showback<V: Into<PairValue>>(
        &mut self,
        costs: impl IntoIterator<Item = (ShowbackKey, V)>,
    ) -> Result<()> {
        ensure_absent(&self.dynamic, ShowbackKey::ALL)?;
        for (key, value) in costs {
            self.dynamic.add_pair(key.as_str(), value);
        }
        Ok(())
    }

    pub fn get_showback(&self, key: ShowbackKey) -> Result<&str> {
        self.dynamic.get_str(key.as_str())
    }

    /// Set scheduler placement attributes. Fails, leaving the template
    /// untouched, if any placement attribute is already present.
    pub fn set_placement<V: Into<PairValue>>(
        &mut self,
        attrs: impl IntoIterator<Item = (PlacementKey, V)>,
    ) -> Result<()> {
        ensure_absent(&self.dynamic, PlacementKey::ALL)?;
        for (key, value) in attrs {
            self.dynamic.add_pair(key.as_str(), value);
        }
        Ok(())
    }

    pub fn get_placement(&self, key: PlacementKey) -> Result<&str> {
        self.dynamic.get_str(key.as_str())
    }

    // -------------------------------------------------------------------------
    // Single vectors of the remainder
    // -------------------------------------------------------------------------

    pub fn add_os(&mut self, key: OsKey, value: impl Into<PairValue>) -> Result<()> {
        self.dynamic.add_pair_to_vector(OS, key.as_str(), value)
    }

    pub fn get_os(&self, key: OsKey) -> Result<&str> {
        self.dynamic.get_str_from_vector(OS, key.as_str())
    }

    pub fn add_cpu_model(&mut self, model: impl Into<PairValue>) -> Result<()> {
        self.dynamic
            .add_pair_to_vector(CPU_MODEL, CpuModelKey::Model.as_str(), model)
    }

    pub fn get_cpu_model(&self, key: CpuModelKey) -> Result<&str> {
        self.dynamic.get_str_from_vector(CPU_MODEL, key.as_str())
    }

    pub fn add_feature(&mut self, key: FeatureKey, value: impl Into<PairValue>) -> Result<()> {
        self.dynamic.add_pair_to_vector(FEATURES, key.as_str(), value)
    }

    pub fn get_feature(&self, key: FeatureKey) -> Result<&str> {
        self.dynamic.get_str_from_vector(FEATURES, key.as_str())
    }

    pub fn add_graphics(&mut self, key: GraphicsKey, value: impl Into<PairValue>) -> Result<()> {
        self.dynamic.add_pair_to_vector(GRAPHICS, key.as_str(), value)
    }

    pub fn get_graphics(&self, key: GraphicsKey) -> Result<&str> {
        self.dynamic.get_str_from_vector(GRAPHICS, key.as_str())
    }

    pub fn add_input(&mut self, key: InputKey, value: impl Into<PairValue>) -> Result<()> {
        self.dynamic.add_pair_to_vector(INPUT, key.as_str(), value)
    }

    pub fn get_input(&self, key: InputKey) -> Result<&str> {
        self.dynamic.get_str_from_vector(INPUT, key.as_str())
    }

    /// Attributes not bound to a named field.
    pub fn dynamic(&self) -> &DynamicTemplate {
        &self.dynamic
    }

    pub fn dynamic_mut(&mut self) -> &mut DynamicTemplate {
        &mut self.dynamic
    }
}

impl fmt::Display for VmTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capacity = [
            (CapacityKey::Cpu, self.cpu.map(|v| v.to_string())),
            (CapacityKey::Vcpu, self.vcpu.map(|v| v.to_string())),
            (CapacityKey::Memory, self.memory.map(|v| v.to_string())),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| TemplatePair::new(key.as_str(), v).to_string()));

        let parts = capacity
            .chain(self.context.iter().map(ToString::to_string))
            .chain(self.disks.iter().map(ToString::to_string))
            .chain(self.nics.iter().map(ToString::to_string))
            .chain(self.sched_actions.iter().map(ToString::to_string))
            .chain(self.snapshots.iter().map(ToString::to_string))
            .chain(self.security_group_rules.iter().map(ToString::to_string))
            .chain(std::iter::once(self.dynamic.to_string()));

        f.write_str(&join_parts(parts))
    }
}

impl FromXml for VmTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        let mut tpl = VmTemplate::new();
        let VmTemplate {
            cpu,
            vcpu,
            memory,
            context,
            disks,
            nics,
            sched_actions,
            snapshots,
            security_group_rules,
            dynamic,
        } = &mut tpl;

        dynamic.read_children_filtered(
            reader,
            start,
            |key| !BOUND_KEYS.iter().any(|bound| *bound == key),
            |r, child| {
                match child.as_str() {
                    "CPU" => *cpu = r.read_parsed_opt(&child)?,
                    "VCPU" => *vcpu = r.read_parsed_opt(&child)?,
                    "MEMORY" => *memory = r.read_parsed_opt(&child)?,
                    CONTEXT => *context = Some(TemplateVector::from_xml(r, &child)?.into()),
                    Disk::KEY => disks.push(TemplateVector::from_xml(r, &child)?.into()),
                    Nic::KEY => nics.push(TemplateVector::from_xml(r, &child)?.into()),
                    SchedAction::KEY => {
                        sched_actions.push(TemplateVector::from_xml(r, &child)?.into())
                    }
                    VmSnapshot::KEY => snapshots.push(TemplateVector::from_xml(r, &child)?.into()),
                    SecurityGroupRule::KEY => {
                        security_group_rules.push(TemplateVector::from_xml(r, &child)?.into())
                    }
                    _ => r.skip_element(&child)?,
                }
                Ok(())
            },
        )?;

        debug!(
            disks = tpl.disks.len(),
            nics = tpl.nics.len(),
            remainder = tpl.dynamic.len(),
            "Parsed VM template"
        );
        Ok(tpl)
    }
}

// =============================================================================
// User template
// =============================================================================

/// User template of a VM: scheduler feedback plus free attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmUserTemplate {
    pub error: Option<String>,
    pub sched_message: Option<String>,
    dynamic: DynamicTemplate,
}

impl VmUserTemplate {
    pub fn get(&self, key: &str) -> Result<&str> {
        self.dynamic.get_str(key)
    }

    pub fn dynamic(&self) -> &DynamicTemplate {
        &self.dynamic
    }

    pub fn dynamic_mut(&mut self) -> &mut DynamicTemplate {
        &mut self.dynamic
    }
}

impl fmt::Display for VmUserTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [("ERROR", &self.error), ("SCHED_MESSAGE", &self.sched_message)]
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|v| TemplatePair::new(key, v.as_str()).to_string())
            })
            .chain(std::iter::once(self.dynamic.to_string()));

        f.write_str(&join_parts(parts))
    }
}

impl FromXml for VmUserTemplate {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> Result<Self> {
        let mut tpl = VmUserTemplate::default();
        let VmUserTemplate {
            error,
            sched_message,
            dynamic,
        } = &mut tpl;

        dynamic.read_children_filtered(
            reader,
            start,
            |key| key != "ERROR" && key != "SCHED_MESSAGE",
            |r, child| {
                let value = r.read_text(&child)?;
                if child == "ERROR" {
                    *error = Some(value);
                } else {
                    *sched_message = Some(value);
                }
                Ok(())
            },
        )?;
        Ok(tpl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::disk::DiskKey;
    use crate::facade::nic::NicKey;

    fn web_vm() -> VmTemplate {
        let mut tpl = VmTemplate::new();
        tpl.dynamic_mut().add_pair("NAME", "web");
        tpl.set_capacity(0.5, 2, 1024).unwrap();

        let mut disk = Disk::new();
        disk.add(DiskKey::ImageId, 119u32);
        let mut nic = Nic::new();
        nic.add(NicKey::Network, "public");

        tpl.add_ctx(ContextKey::Network, "YES")
            .add_disk(disk)
            .add_nic(nic);
        tpl
    }

    #[test]
    fn test_serialization_order() {
        assert_eq!(
            web_vm().to_string(),
            "CPU=\"0.5\"\nVCPU=\"2\"\nMEMORY=\"1024\"\n\
             CONTEXT=[\n    NETWORK=\"YES\" ]\n\
             DISK=[\n    IMAGE_ID=\"119\" ]\n\
             NIC=[\n    NETWORK=\"public\" ]\n\
             NAME=\"web\""
        );
    }

    #[test]
    fn test_capacity_is_set_once() {
        let mut tpl = web_vm();
        assert_eq!(
            tpl.set_capacity(4.0, 4, 4096),
            Err(TemplateError::KeyConflict("CPU".into()))
        );
        assert_eq!(
            tpl.capacity(),
            VmCapacity {
                cpu: 0.5,
                vcpu: 2,
                memory: 1024
            }
        );
    }

    #[test]
    fn test_capacity_conflicts_with_remainder() {
        let mut tpl = VmTemplate::new();
        tpl.dynamic_mut().add_pair("MEMORY", 64u32);
        assert_eq!(
            tpl.set_capacity(1.0, 1, 128),
            Err(TemplateError::KeyConflict("MEMORY".into()))
        );
        assert_eq!(tpl.capacity().memory, 0);
    }

    #[test]
    fn test_default_vcpu() {
        assert_eq!(VmTemplate::new().capacity().vcpu, 1);
    }

    #[test]
    fn test_showback_group_is_set_once() {
        let mut tpl = VmTemplate::new();
        tpl.set_showback([(ShowbackKey::CpuCost, "2"), (ShowbackKey::MemoryCost, "0.1")])
            .unwrap();

        let err = tpl.set_showback([(ShowbackKey::DiskCost, "1")]).unwrap_err();
        assert_eq!(err, TemplateError::KeyConflict("MEMORY_COST".into()));
        assert!(!tpl.dynamic().exists("DISK_COST"));
        assert_eq!(tpl.get_showback(ShowbackKey::CpuCost).unwrap(), "2");
    }

    #[test]
    fn test_placement() {
        let mut tpl = VmTemplate::new();
        tpl.set_placement([(PlacementKey::SchedRequirements, "ID=\"3\"")])
            .unwrap();
        assert!(tpl
            .set_placement([(PlacementKey::SchedRank, "FREE_CPU")])
            .is_err());
        assert_eq!(
            tpl.get_placement(PlacementKey::SchedRequirements).unwrap(),
            "ID=\"3\""
        );
    }

    #[test]
    fn test_vectors_of_the_remainder() {
        let mut tpl = VmTemplate::new();
        tpl.add_os(OsKey::Arch, "x86_64").unwrap();
        tpl.add_os(OsKey::Boot, "disk0").unwrap();
        tpl.add_graphics(GraphicsKey::Type, "vnc").unwrap();
        tpl.add_graphics(GraphicsKey::Listen, "0.0.0.0").unwrap();
        tpl.add_cpu_model("host-passthrough").unwrap();

        assert_eq!(tpl.dynamic().get_vector("OS").unwrap().len(), 2);
        assert_eq!(tpl.get_graphics(GraphicsKey::Listen).unwrap(), "0.0.0.0");
        assert_eq!(tpl.get_cpu_model(CpuModelKey::Model).unwrap(), "host-passthrough");
        assert!(tpl.get_feature(FeatureKey::Acpi).is_err());
    }

    #[test]
    fn test_b64_context() {
        let mut tpl = VmTemplate::new();
        tpl.add_b64_ctx(ContextB64Key::StartScriptBase64, "echo hi");

        let ctx = tpl.context().unwrap();
        assert_eq!(
            ctx.vector().get_str("START_SCRIPT_BASE64").unwrap(),
            "ZWNobyBoaQ=="
        );
        assert_eq!(ctx.get_b64(ContextB64Key::StartScriptBase64).unwrap(), "echo hi");
        assert_eq!(tpl.get_ctx(ContextKey::Token), Err(TemplateError::NotFound("TOKEN".into())));
    }

    #[test]
    fn test_sched_action() {
        let mut action = SchedAction::new();
        action
            .add(SchedActionKey::Id, 0u32)
            .add(SchedActionKey::Action, "poweroff")
            .add(SchedActionKey::Time, "+3600");

        let mut tpl = VmTemplate::new();
        tpl.add_sched_action(action);

        assert_eq!(tpl.sched_actions()[0].id().unwrap(), 0);
        assert!(tpl.to_string().starts_with("SCHED_ACTION=[\n    ID=\"0\""));
    }

    #[test]
    fn test_parse_binds_fields() {
        let xml = "<TEMPLATE>
  <CPU>0.5</CPU>
  <MEMORY>1024</MEMORY>
  <CONTEXT><NETWORK>YES</NETWORK><TARGET>hda</TARGET></CONTEXT>
  <DISK><DISK_ID>0</DISK_ID><IMAGE_ID>119</IMAGE_ID></DISK>
  <DISK><DISK_ID>1</DISK_ID></DISK>
  <NIC><NIC_ID>0</NIC_ID><IP>10.0.0.2</IP></NIC>
  <GRAPHICS><TYPE>vnc</TYPE></GRAPHICS>
  <VMID>42</VMID>
</TEMPLATE>";
        let tpl = VmTemplate::from_xml_str(xml).unwrap();

        assert_eq!(tpl.capacity().cpu, 0.5);
        assert_eq!(tpl.capacity().vcpu, 1);
        assert_eq!(tpl.get_ctx(ContextKey::Target).unwrap(), "hda");
        assert_eq!(tpl.disks().len(), 2);
        assert_eq!(tpl.disks()[0].get_id(DiskKey::ImageId).unwrap(), 119);
        assert_eq!(tpl.disks()[1].id().unwrap(), 1);
        assert_eq!(tpl.nics()[0].get(NicKey::Ip).unwrap(), "10.0.0.2");

        // Bound tags never reach the remainder.
        assert_eq!(tpl.dynamic().len(), 2);
        assert!(!tpl.dynamic().exists("DISK"));
        assert_eq!(tpl.dynamic().get_int("VMID").unwrap(), 42);
        assert_eq!(tpl.get_graphics(GraphicsKey::Type).unwrap(), "vnc");
    }

    #[test]
    fn test_parse_rejects_bad_capacity() {
        let err = VmTemplate::from_xml_str("<TEMPLATE><MEMORY>lots</MEMORY></TEMPLATE>").unwrap_err();
        assert!(matches!(err, TemplateError::TypeMismatch(_)));
    }

    #[test]
    fn test_parse_blank_capacity() {
        let tpl = VmTemplate::from_xml_str(
            "<TEMPLATE><CPU></CPU><VCPU> </VCPU><MEMORY>512</MEMORY><NAME>x</NAME></TEMPLATE>",
        )
        .unwrap();

        let capacity = tpl.capacity();
        assert_eq!(capacity.cpu, 0.0);
        assert_eq!(capacity.vcpu, 1);
        assert_eq!(capacity.memory, 512);
        assert_eq!(tpl.dynamic().get_str("NAME").unwrap(), "x");
        assert_eq!(tpl.to_string(), "MEMORY=\"512\"\nNAME=\"x\"");
    }

    #[test]
    fn test_parse_snapshots_and_security_group_rules() {
        let xml = "<TEMPLATE>
  <SECURITY_GROUP_RULE>
    <PROTOCOL>ALL</PROTOCOL>
    <RULE_TYPE>OUTBOUND</RULE_TYPE>
    <SECURITY_GROUP_ID>0</SECURITY_GROUP_ID>
    <SECURITY_GROUP_NAME>default</SECURITY_GROUP_NAME>
  </SECURITY_GROUP_RULE>
  <SECURITY_GROUP_RULE>
    <PROTOCOL>ALL</PROTOCOL>
    <RULE_TYPE>INBOUND</RULE_TYPE>
    <SECURITY_GROUP_ID>0</SECURITY_GROUP_ID>
  </SECURITY_GROUP_RULE>
  <SNAPSHOT>
    <ACTIVE>YES</ACTIVE>
    <NAME>before-upgrade</NAME>
    <SNAPSHOT_ID>3</SNAPSHOT_ID>
  </SNAPSHOT>
  <VMID>7</VMID>
</TEMPLATE>";
        let tpl = VmTemplate::from_xml_str(xml).unwrap();

        assert_eq!(tpl.snapshots().len(), 1);
        assert_eq!(tpl.snapshots()[0].id().unwrap(), 3);
        assert_eq!(tpl.snapshots()[0].get(SnapshotKey::Name).unwrap(), "before-upgrade");

        let rules = tpl.security_group_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id().unwrap(), 0);
        assert_eq!(
            rules[1].get(SecurityGroupRuleKey::RuleType).unwrap(),
            "INBOUND"
        );

        assert_eq!(tpl.dynamic().len(), 1);
        assert!(!tpl.dynamic().exists("SNAPSHOT"));
    }

    #[test]
    fn test_user_template() {
        let tpl = VmUserTemplate::from_xml_str(
            "<USER_TEMPLATE><ERROR>no host</ERROR><A>B</A></USER_TEMPLATE>",
        )
        .unwrap();
        assert_eq!(tpl.error.as_deref(), Some("no host"));
        assert_eq!(tpl.sched_message, None);
        assert_eq!(tpl.get("A").unwrap(), "B");
        assert_eq!(tpl.to_string(), "ERROR=\"no host\"\nA=\"B\"");
    }
}
