//! Assembly of one mesh point from its configuration.
//!
//! [`MeshNode`] owns the protocol instance and the multicast membership table
//! it was built with. The host drives it through [`MeshNode::protocol_mut`]
//! with its own [`Environment`].

use std::fmt;
use std::path::Path;

use hwmp_core::types::{InterfaceId, MacAddress};
use hwmp_routing::protocol::Environment;
use hwmp_routing::{HwmpProtocol, MulticastMembership};

use crate::config::NodeConfig;
use crate::error::NodeError;

/// A configured mesh point.
#[derive(Debug)]
pub struct MeshNode {
    protocol: HwmpProtocol,
    membership: MulticastMembership,
    root: bool,
    started: bool,
}

impl MeshNode {
    /// Build a node from a parsed configuration.
    ///
    /// Every `[[multicast]]` group is joined in a fresh membership table.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        Self::with_membership(config, MulticastMembership::new())
    }

    /// Build a node that shares `membership` with other nodes.
    pub fn with_membership(config: &NodeConfig, membership: MulticastMembership) -> Result<Self, NodeError> {
        let address = config.address()?;
        if address.is_group() || address.is_broadcast() {
            return Err(NodeError::InvalidAddress(format!(
                "node address {address} is not an individual address"
            )));
        }
        for entry in &config.multicast {
            let group = entry.group_address()?;
            for member in entry.member_addresses()? {
                membership.join(group, member);
            }
        }

        let mut protocol = HwmpProtocol::new(address, config.hwmp.clone(), membership.clone())?;
        for index in 0..config.node.interfaces {
            protocol.add_interface(InterfaceId(index))?;
        }
        tracing::info!(
            %address,
            interfaces = config.node.interfaces,
            root = config.node.root,
            groups = config.multicast.len(),
            "mesh point configured"
        );
        Ok(Self {
            protocol,
            membership,
            root: config.node.root,
            started: false,
        })
    }

    /// Load the configuration file at `path` and build a node from it.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        Self::from_config(&NodeConfig::load(path)?)
    }

    /// Start the protocol and, if configured, begin root announcements.
    pub fn start(&mut self, env: &mut dyn Environment) -> Result<(), NodeError> {
        self.protocol.start(env)?;
        if self.root {
            self.protocol.set_root(env);
        }
        self.started = true;
        Ok(())
    }

    #[must_use]
    pub fn address(&self) -> MacAddress {
        self.protocol.address()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn protocol(&self) -> &HwmpProtocol {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut HwmpProtocol {
        &mut self.protocol
    }

    #[must_use]
    pub fn membership(&self) -> &MulticastMembership {
        &self.membership
    }

    /// One-line description of the assembled node.
    #[must_use]
    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            address: self.address(),
            interfaces: self.protocol.interfaces().count(),
            root: self.root,
        }
    }
}

/// What a node was assembled with, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSummary {
    pub address: MacAddress,
    pub interfaces: usize,
    pub root: bool,
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mesh point {} interfaces={} root={}",
            self.address, self.interfaces, self.root
        )
    }
}
