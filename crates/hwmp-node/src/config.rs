//! TOML-based configuration for a mesh point.

use std::path::Path;

use hwmp_core::types::MacAddress;
use hwmp_routing::HwmpConfig;
use serde::Deserialize;

use crate::error::NodeError;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub hwmp: HwmpConfig,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub multicast: Vec<MulticastEntry>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// The mesh address of this node.
    pub fn address(&self) -> Result<MacAddress, NodeError> {
        parse_address(&self.node.address)
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// Colon-separated MAC address, e.g. `02:00:00:00:00:01`.
    #[serde(default)]
    pub address: String,
    /// Number of mesh interfaces, numbered from zero.
    #[serde(default = "default_interfaces")]
    pub interfaces: u32,
    /// Announce this node as root once started.
    #[serde(default)]
    pub root: bool,
}

fn default_interfaces() -> u32 {
    1
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            address: String::new(),
            interfaces: default_interfaces(),
            root: false,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A `[[multicast]]` entry: one group and the mesh points that joined it.
#[derive(Debug, Clone, Deserialize)]
pub struct MulticastEntry {
    pub group: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl MulticastEntry {
    /// The group address, which must have the group bit set.
    pub fn group_address(&self) -> Result<MacAddress, NodeError> {
        let group = parse_address(&self.group)?;
        if !group.is_group() {
            return Err(NodeError::InvalidAddress(format!(
                "'{}' is not a group address",
                self.group
            )));
        }
        Ok(group)
    }

    pub fn member_addresses(&self) -> Result<Vec<MacAddress>, NodeError> {
        self.members.iter().map(|m| parse_address(m)).collect()
    }
}

/// Parse a colon-separated MAC address string.
pub fn parse_address(s: &str) -> Result<MacAddress, NodeError> {
    s.parse()
        .map_err(|e| NodeError::InvalidAddress(format!("'{s}': {e}")))
}
