//! Parameters shared by resource mutation calls.

use oca_template::{FromXml, XmlReader};

use crate::transport::CallArg;

/// How an update call applies the new template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateType {
    /// Replace the whole template.
    #[default]
    Replace = 0,
    /// Merge into the existing template.
    Merge = 1,
}

impl From<UpdateType> for CallArg {
    fn from(update: UpdateType) -> Self {
        CallArg::Int(update as i64)
    }
}

/// Which operations a lock blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockLevel {
    Use = 1,
    Manage = 2,
    Admin = 3,
    All = 4,
}

impl From<LockLevel> for CallArg {
    fn from(level: LockLevel) -> Self {
        CallArg::Int(level as i64)
    }
}

/// Permission bits of a resource.
///
/// Read back from a resource each bit is 0 or 1. In a chmod call, `-1`
/// leaves the bit unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permissions {
    pub owner_use: i8,
    pub owner_manage: i8,
    pub owner_admin: i8,
    pub group_use: i8,
    pub group_manage: i8,
    pub group_admin: i8,
    pub other_use: i8,
    pub other_manage: i8,
    pub other_admin: i8,
}

impl Permissions {
    /// All bits unchanged.
    pub fn unchanged() -> Self {
        Self {
            owner_use: -1,
            owner_manage: -1,
            owner_admin: -1,
            group_use: -1,
            group_manage: -1,
            group_admin: -1,
            other_use: -1,
            other_manage: -1,
            other_admin: -1,
        }
    }

    /// Bits in call order: owner, group, other; use, manage, admin.
    pub fn bits(&self) -> [i8; 9] {
        [
            self.owner_use,
            self.owner_manage,
            self.owner_admin,
            self.group_use,
            self.group_manage,
            self.group_admin,
            self.other_use,
            self.other_manage,
            self.other_admin,
        ]
    }

    /// Arguments of a chmod call on resource `id`.
    pub fn to_args(&self, id: i64) -> Vec<CallArg> {
        std::iter::once(CallArg::Int(id))
            .chain(self.bits().iter().map(|bit| CallArg::Int(i64::from(*bit))))
            .collect()
    }

    /// Render as use/manage/admin flags per class, e.g. `um-u-----`.
    pub fn render(&self) -> String {
        self.bits()
            .chunks(3)
            .flat_map(|class| {
                class
                    .iter()
                    .zip(['u', 'm', 'a'])
                    .map(|(bit, flag)| if *bit == 1 { flag } else { '-' })
            })
            .collect()
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::unchanged()
    }
}

impl FromXml for Permissions {
    fn from_xml(reader: &mut XmlReader<'_>, start: &str) -> oca_template::Result<Self> {
        let mut perms = Permissions::unchanged();
        reader.read_children(start, |r, child| {
            let slot = match child.as_str() {
                "OWNER_U" => &mut perms.owner_use,
                "OWNER_M" => &mut perms.owner_manage,
                "OWNER_A" => &mut perms.owner_admin,
                "GROUP_U" => &mut perms.group_use,
                "GROUP_M" => &mut perms.group_manage,
                "GROUP_A" => &mut perms.group_admin,
                "OTHER_U" => &mut perms.other_use,
                "OTHER_M" => &mut perms.other_manage,
                "OTHER_A" => &mut perms.other_admin,
                _ => return r.skip_element(&child),
            };
            *slot = r.read_parsed(&child)?;
            Ok(())
        })?;
        Ok(perms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_chmod_arguments() {
        let perms = Permissions {
            owner_use: 1,
            owner_manage: 1,
            group_use: 1,
            ..Permissions::unchanged()
        };

        assert_eq!(
            perms.to_args(12),
            args![12, 1, 1, -1, 1, -1, -1, -1, -1, -1]
        );
    }

    #[test]
    fn test_render() {
        let perms = Permissions {
            owner_use: 1,
            owner_manage: 1,
            owner_admin: 0,
            group_use: 1,
            group_manage: 0,
            group_admin: 0,
            other_use: 0,
            other_manage: 0,
            other_admin: 0,
        };
        assert_eq!(perms.render(), "um-u-----");
    }

    #[test]
    fn test_permissions_from_xml() {
        let perms = Permissions::from_xml_str(
            "<PERMISSIONS><OWNER_U>1</OWNER_U><OWNER_M>1</OWNER_M><OWNER_A>0</OWNER_A>\
             <GROUP_U>1</GROUP_U><GROUP_M>0</GROUP_M><GROUP_A>0</GROUP_A>\
             <OTHER_U>0</OTHER_U><OTHER_M>0</OTHER_M><OTHER_A>0</OTHER_A></PERMISSIONS>",
        )
        .unwrap();
        assert_eq!(perms.render(), "um-u-----");
    }

    #[test]
    fn test_enum_arguments() {
        assert_eq!(CallArg::from(UpdateType::Merge), CallArg::Int(1));
        assert_eq!(CallArg::from(LockLevel::Admin), CallArg::Int(3));
    }
}
