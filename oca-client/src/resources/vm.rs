//! Virtual machines.

use std::fmt;

use oca_template::facade::vm::{VmTemplate, VmUserTemplate};
use oca_template::{DynamicTemplate, FromXml, XmlReader};
use tracing::{info, instrument};

use crate::args;
use crate::controller::{invalid_state, Controller, LockInfo, Ownership, Pool, PoolItem};
use crate::error::Result;
use crate::filter::{VmExtendedFilter, VmFilter};
use crate::params::{LockLevel, Permissions};

pub type VmPool = Pool<Vm>;

/// Top level state of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmState {
    Init = 0,
    Pending = 1,
    Hold = 2,
    Active = 3,
    Stopped = 4,
    Suspended = 5,
    Done = 6,
    Poweroff = 8,
    Undeployed = 9,
    Cloning = 10,
    CloningFailure = 11,
}

impl VmState {
    pub const ALL: [VmState; 11] = [
        VmState::Init,
        VmState::Pending,
        VmState::Hold,
        VmState::Active,
        VmState::Stopped,
        VmState::Suspended,
        VmState::Done,
        VmState::Poweroff,
        VmState::Undeployed,
        VmState::Cloning,
        VmState::CloningFailure,
    ];

    pub fn from_raw(raw: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as i64 == raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VmState::Init => "INIT",
            VmState::Pending => "PENDING",
            VmState::Hold => "HOLD",
            VmState::Active => "ACTIVE",
            VmState::Stopped => "STOPPED",
            VmState::Suspended => "SUSPENDED",
            VmState::Done => "DONE",
            VmState::Poweroff => "POWEROFF",
            VmState::Undeployed => "UNDEPLOYED",
            VmState::Cloning => "CLONING",
            VmState::CloningFailure => "CLONING_FAILURE",
        }
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A VM as returned by `one.vm.info`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vm {
    pub id: i64,
    pub name: String,
    pub owner: Ownership,
    pub permissions: Option<Permissions>,
    pub lock: Option<LockInfo>,
    pub last_poll: i64,
    pub state_raw: i64,
    /// Life-cycle sub-state, meaningful while ACTIVE.
    pub lcm_state_raw: i64,
    pub prev_state_raw: i64,
    pub prev_lcm_state_raw: i64,
    pub resched: bool,
    pub stime: i64,
    pub etime: i64,
    pub deploy_id: String,
    pub template: VmTemplate,
    pub user_template: VmUserTemplate,
}

impl Vm {
    pub fn state(&self) -> Result<VmState> {
        VmState::from_raw(self.state_raw).ok_or_else(|| invalid_state("VM", self.state_raw))
    }
}

impl FromXml for Vm {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut vm = Vm::default();
        reader.read_children(start, |r, child| {
            if vm.owner.read_field(r, &child)? {
                return Ok(());
            }
            match child.as_str() {
                "ID" => vm.id = r.read_parsed(&child)?,
                "NAME" => vm.name = r.read_text(&child)?,
                "PERMISSIONS" => vm.permissions = Some(Permissions::from_xml(r, &child)?),
                "LOCK" => vm.lock = Some(LockInfo::from_xml(r, &child)?),
                "LAST_POLL" => vm.last_poll = r.read_parsed(&child)?,
                "STATE" => vm.state_raw = r.read_parsed(&child)?,
                "LCM_STATE" => vm.lcm_state_raw = r.read_parsed(&child)?,
                "PREV_STATE" => vm.prev_state_raw = r.read_parsed(&child)?,
                "PREV_LCM_STATE" => vm.prev_lcm_state_raw = r.read_parsed(&child)?,
                "RESCHED" => vm.resched = r.read_parsed::<i64>(&child)? != 0,
                "STIME" => vm.stime = r.read_parsed(&child)?,
                "ETIME" => vm.etime = r.read_parsed(&child)?,
                "DEPLOY_ID" => vm.deploy_id = r.read_text(&child)?,
                "TEMPLATE" => vm.template = VmTemplate::from_xml(r, &child)?,
                "USER_TEMPLATE" => vm.user_template = VmUserTemplate::from_xml(r, &child)?,
                // HISTORY_RECORDS, SNAPSHOTS, MONITORING
                _ => r.skip_element(&child)?,
            }
            Ok(())
        })?;
        Ok(vm)
    }
}

impl PoolItem for Vm {
    const TAG: &'static str = "VM";

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct VmsController<'a> {
    controller: &'a Controller,
}

pub struct VmController<'a> {
    controller: &'a Controller,
    pub id: i64,
}

impl Controller {
    pub fn vms(&self) -> VmsController<'_> {
        VmsController { controller: self }
    }

    pub fn vm(&self, id: i64) -> VmController<'_> {
        VmController {
            controller: self,
            id,
        }
    }
}

impl VmsController<'_> {
    #[instrument(skip(self))]
    pub async fn info(&self, filter: &VmFilter) -> Result<VmPool> {
        self.controller
            .call_parse("one.vmpool.info", filter.to_args())
            .await
    }

    /// List with a `KEY="value"` match on the VM templates.
    #[instrument(skip(self))]
    pub async fn info_extended(&self, filter: &VmExtendedFilter) -> Result<VmPool> {
        self.controller
            .call_parse("one.vmpool.infoextended", filter.to_args())
            .await
    }

    pub async fn by_name(&self, name: &str, filter: &VmFilter) -> Result<i64> {
        self.info(filter).await?.by_name(name)
    }
}

impl VmController<'_> {
    #[instrument(skip(self), fields(vm_id = self.id))]
    pub async fn info(&self) -> Result<Vm> {
        self.controller.call_parse("one.vm.info", args![self.id]).await
    }

    /// Update the configuration attributes (OS, FEATURES, INPUT, GRAPHICS,
    /// RAW, CONTEXT) of a powered off VM.
    #[instrument(skip(self, template), fields(vm_id = self.id))]
    pub async fn update_conf(&self, template: &DynamicTemplate) -> Result<()> {
        self.controller
            .call("one.vm.updateconf", args![self.id, template.to_string()])
            .await?;
        info!("VM configuration updated");
        Ok(())
    }

    pub async fn rename(&self, name: &str) -> Result<()> {
        self.controller
            .call("one.vm.rename", args![self.id, name])
            .await?;
        Ok(())
    }

    pub async fn lock(&self, level: LockLevel) -> Result<()> {
        self.controller
            .call("one.vm.lock", args![self.id, level])
            .await?;
        Ok(())
    }

    pub async fn unlock(&self) -> Result<()> {
        self.controller
            .call("one.vm.unlock", args![self.id])
            .await?;
        Ok(())
    }
}
