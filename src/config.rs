//! Experiment manifest: named profiles mapping to log locations.
//!
//! A manifest is a YAML file listing the runs of each experiment kind,
//! so repeated analysis passes can refer to a run by name instead of a
//! path:
//!
//! ```yaml
//! gossip:
//!   - name: 3-nodes-half-hz
//!     input: logs/3.txt
//! multicast:
//!   - name: 8-failure
//!     dir: data/8-failure
//!     nodes: 8
//! blockchain:
//!   - name: log100
//!     input: data/log100-20-0.4.txt
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The three experiment kinds this tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Gossip mesh: single log of tag/delay/bandwidth line triples.
    Gossip,
    /// Reliable multicast: per-node bandwidth and delivery files.
    Multicast,
    /// Blockchain: single log of tagged records.
    Blockchain,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::Gossip => "gossip",
            Profile::Multicast => "multicast",
            Profile::Blockchain => "blockchain",
        };
        write!(f, "{}", name)
    }
}

/// A gossip run: one combined log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipProfile {
    pub name: String,
    pub input: PathBuf,
}

/// A multicast run: a directory of `bandwidth<i>.txt` / `log<i>.txt`
/// pairs. `nodes` pins the expected node count; when absent the count
/// is discovered from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticastProfile {
    pub name: String,
    pub dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<usize>,
}

/// A blockchain run: one tagged log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainProfile {
    pub name: String,
    pub input: PathBuf,
}

/// All profiles declared by one manifest file. Absent sections are
/// simply empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentManifest {
    #[serde(default)]
    pub gossip: Vec<GossipProfile>,
    #[serde(default)]
    pub multicast: Vec<MulticastProfile>,
    #[serde(default)]
    pub blockchain: Vec<BlockchainProfile>,
}

impl ExperimentManifest {
    /// Validate the manifest
    pub fn validate(&self) -> Result<(), ManifestError> {
        Self::check_names(Profile::Gossip, self.gossip.iter().map(|p| p.name.as_str()))?;
        Self::check_names(Profile::Multicast, self.multicast.iter().map(|p| p.name.as_str()))?;
        Self::check_names(Profile::Blockchain, self.blockchain.iter().map(|p| p.name.as_str()))?;

        for profile in &self.multicast {
            if profile.nodes == Some(0) {
                return Err(ManifestError::InvalidProfile(format!(
                    "multicast profile '{}' declares zero nodes",
                    profile.name
                )));
            }
        }
        Ok(())
    }

    fn check_names<'a>(
        kind: Profile,
        names: impl Iterator<Item = &'a str>,
    ) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() {
                return Err(ManifestError::InvalidProfile(format!(
                    "{} profile with an empty name",
                    kind
                )));
            }
            if !seen.insert(name) {
                return Err(ManifestError::DuplicateName(format!("{}/{}", kind, name)));
            }
        }
        Ok(())
    }

    /// Total number of declared profiles.
    pub fn len(&self) -> usize {
        self.gossip.len() + self.multicast.len() + self.blockchain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn gossip_profile(&self, name: &str) -> Option<&GossipProfile> {
        self.gossip.iter().find(|p| p.name == name)
    }

    pub fn multicast_profile(&self, name: &str) -> Option<&MulticastProfile> {
        self.multicast.iter().find(|p| p.name == name)
    }

    pub fn blockchain_profile(&self, name: &str) -> Option<&BlockchainProfile> {
        self.blockchain.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Invalid profile definition: {0}")]
    InvalidProfile(String),
    #[error("Duplicate profile name: {0}")]
    DuplicateName(String),
}

/// Load and validate a manifest from a YAML file.
pub fn load_manifest(path: &Path) -> Result<ExperimentManifest> {
    info!("Loading experiment manifest from: {:?}", path);
    let file = File::open(path)?;
    let manifest: ExperimentManifest = serde_yaml::from_reader(file)?;
    manifest.validate()?;
    info!("Manifest declares {} profile(s)", manifest.len());
    Ok(manifest)
}
