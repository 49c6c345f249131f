//! Core record types for experiment log analysis.
//!
//! One value of these types corresponds to one parsed log record; records
//! are immutable once parsed and carry only the fields the analyses read.

use serde::{Deserialize, Serialize};

/// Experiment timestamp in seconds, as written by the instrumented systems
/// (fractional Unix seconds).
pub type SimTime = f64;

/// Classification of a gossip log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipKind {
    /// A four-token tag line (`<time> - <node> connected`) declaring a node.
    Connection,
    /// Any other tag line (`<time> <node> <payload>`): a per-node sample.
    Event,
}

/// One fully assembled gossip record.
///
/// The on-disk format spreads a record over three lines: the tag line,
/// then a delay line, then a bandwidth line. Both connection and event
/// records carry the trailing delay/bandwidth measurements; only event
/// records contribute them to the named node's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GossipRecord {
    pub time: SimTime,
    pub node: String,
    /// Observer-to-logger delay in seconds, from the line after the tag line.
    pub delay: f64,
    /// Message length in bytes, from the second line after the tag line.
    pub bandwidth: u64,
    pub kind: GossipKind,
}

/// Leading tag of a blockchain simulation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordTag {
    /// `B`: bytes shipped during one second.
    Bandwidth,
    /// `T`: a node observed a transaction.
    Transaction,
    /// `BLK`: a node created or received a block.
    BlockReceipt,
    /// `TB`: a transaction appeared in a block at a node.
    TxInclusion,
    /// `CS`: a node detected competing chain branches.
    ChainSplit,
}

impl RecordTag {
    /// The literal token that introduces this record kind.
    pub fn token(self) -> &'static str {
        match self {
            RecordTag::Bandwidth => "B",
            RecordTag::Transaction => "T",
            RecordTag::BlockReceipt => "BLK",
            RecordTag::TxInclusion => "TB",
            RecordTag::ChainSplit => "CS",
        }
    }
}

impl std::fmt::Display for RecordTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// One parsed line of the blockchain simulation log.
///
/// Field positions mirror the emitting logger: `T` lines carry the
/// observation time at token 2 and the transaction id at token 4, `TB`
/// lines at tokens 2 and 3. Transaction ids double as their creation
/// time when parsed as a float, which is why both fields are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaggedRecord {
    /// `B <time> <length>`
    Bandwidth { time: SimTime, length: u64 },
    /// `T <node> <time> TRANSACTION <id>`
    Transaction {
        observed: SimTime,
        id: String,
        create_time: SimTime,
    },
    /// `BLK <node> <time> <hash>`
    BlockReceipt { time: SimTime, hash: String },
    /// `TB <node> <time> <id> ...`
    TxInclusion {
        observed: SimTime,
        id: String,
        create_time: SimTime,
    },
    /// `CS <node> <time> <length> <hash1> <hash2>`
    ChainSplit { time: SimTime, length: u64 },
}

impl TaggedRecord {
    /// The tag this record was parsed from.
    pub fn tag(&self) -> RecordTag {
        match self {
            TaggedRecord::Bandwidth { .. } => RecordTag::Bandwidth,
            TaggedRecord::Transaction { .. } => RecordTag::Transaction,
            TaggedRecord::BlockReceipt { .. } => RecordTag::BlockReceipt,
            TaggedRecord::TxInclusion { .. } => RecordTag::TxInclusion,
            TaggedRecord::ChainSplit { .. } => RecordTag::ChainSplit,
        }
    }
}

/// One line of a per-node multicast bandwidth file (`<time> <length>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSample {
    pub time: SimTime,
    pub length: f64,
}

/// One line of a multicast delivery log
/// (`<time> FirstMessage|LastMessage <pid> <seq> ...`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub time: SimTime,
    /// True for `FirstMessage` (initial multicast), false for
    /// `LastMessage` (agreed delivery).
    pub first: bool,
    /// Message identity, `<pid>:<seq>`.
    pub key: String,
}
