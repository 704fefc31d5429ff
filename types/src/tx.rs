//! Committed transaction results and the events they emit.

use serde::{Deserialize, Serialize};

/// A key/value pair attached to an [`Event`].
///
/// Only attributes with `index == true` are written to the secondary indexes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub index: bool,
}

impl EventAttribute {
    pub fn indexed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            index: true,
        }
    }
}

/// An event emitted while executing a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>, attributes: Vec<EventAttribute>) -> Self {
        Self {
            kind: kind.into(),
            attributes,
        }
    }

    /// Iterate `(composite_tag, value)` for every attribute that should be indexed.
    ///
    /// The composite tag is `"{kind}.{key}"`. Events without a kind and
    /// attributes without a key are never indexed.
    pub fn indexed_attributes(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        let skip_all = self.kind.is_empty();
        self.attributes
            .iter()
            .filter(move |a| !skip_all && a.index && !a.key.is_empty())
            .map(move |a| (format!("{}.{}", self.kind, a.key), a.value.as_str()))
    }
}

/// Outcome of executing a single transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecTxResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub gas_wanted: i64,
    #[serde(default)]
    pub gas_used: i64,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub codespace: String,
}

impl ExecTxResult {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// A committed transaction together with its position in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub height: u64,
    pub index: u32,
    pub tx: Vec<u8>,
    #[serde(default)]
    pub result: ExecTxResult,
}

impl TxResult {
    /// Position of this transaction in the chain, used as the result ordering key.
    pub fn position(&self) -> (u64, u32) {
        (self.height, self.index)
    }

    /// All `(composite_tag, value)` pairs this result exposes to the event index.
    pub fn indexed_attributes(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.result.events.iter().flat_map(Event::indexed_attributes)
    }
}
