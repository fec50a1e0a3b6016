//! Multicast group membership shared by every node of a mesh.
//!
//! One table is created by whoever assembles the mesh and a clone is handed
//! to each protocol instance. Writers are expected to be rare (setup,
//! join/leave); the forwarding path only reads.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use hwmp_core::types::MacAddress;

#[derive(Debug, Clone, Default)]
pub struct MulticastMembership {
    groups: Arc<RwLock<HashMap<MacAddress, HashSet<MacAddress>>>>,
}

impl MulticastMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `member` to `group`. Returns `false` if it was already a member.
    pub fn join(&self, group: MacAddress, member: MacAddress) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        groups.entry(group).or_default().insert(member)
    }

    /// Remove `member` from `group`. Returns `false` if it was not a member.
    pub fn leave(&self, group: &MacAddress, member: &MacAddress) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let Some(members) = groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(member);
        if members.is_empty() {
            groups.remove(group);
        }
        removed
    }

    #[must_use]
    pub fn is_member(&self, group: &MacAddress, node: &MacAddress) -> bool {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .is_some_and(|m| m.contains(node))
    }

    /// Members of `group`, in address order.
    #[must_use]
    pub fn members(&self, group: &MacAddress) -> Vec<MacAddress> {
        let mut members: Vec<MacAddress> = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }
}
