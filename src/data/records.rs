use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;

use serde::Deserialize;
use serde::Serialize;

use super::Collection;
use super::Data;

/// The record kinds tracked by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Device,
    Worker,
    Subject,
    Track,
    Package,
    Trace,
    Report,
    Replay,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Device,
        Domain::Worker,
        Domain::Subject,
        Domain::Track,
        Domain::Package,
        Domain::Trace,
        Domain::Report,
        Domain::Replay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Device => "device",
            Domain::Worker => "worker",
            Domain::Subject => "subject",
            Domain::Track => "track",
            Domain::Package => "package",
            Domain::Trace => "trace",
            Domain::Report => "report",
            Domain::Replay => "replay",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value pushed by a manager stream and stored by identity.
///
/// Each record type knows its home collection inside [`Data`], which lets a
/// single generic upsert serve every domain.
pub trait Record: Clone + Debug + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    const DOMAIN: Domain;

    fn key(&self) -> Self::Key;

    fn collection(data: &Data) -> &Collection<Self>;

    fn collection_mut(data: &mut Data) -> &mut Collection<Self>;
}

macro_rules! impl_record {
    ($record:ty, $domain:expr, $field:ident) => {
        impl Record for $record {
            type Key = String;

            const DOMAIN: Domain = $domain;

            fn key(&self) -> String {
                self.id.clone()
            }

            fn collection(data: &Data) -> &Collection<Self> {
                &data.$field
            }

            fn collection_mut(data: &mut Data) -> &mut Collection<Self> {
                &mut data.$field
            }
        }
    };
}

/// Kind of work a worker accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Trace,
    Report,
    Replay,
}

/// Progress of a trace, report or replay action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Unknown,
    InProgress,
    Succeeded,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Succeeded | ActionStatus::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub information: BTreeMap<String, String>,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self
    }
}

/// A (host, target) device pairing able to run operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Worker {
    pub id: String,
    pub host: String,
    pub target: String,
    pub operations: Vec<Operation>,
}

impl Worker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn supports(
        &self,
        operation: Operation,
    ) -> bool {
        self.operations.contains(&operation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub hints: Vec<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Latest package on this track
    pub head: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    pub id: String,
    pub parent: Option<String>,
    pub information: BTreeMap<String, String>,
}

impl Package {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    pub id: String,
    pub input: String,
    pub host: String,
    pub target: String,
    pub status: ActionStatus,
    pub output: Option<String>,
}

impl Trace {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub id: String,
    pub input: String,
    pub host: String,
    pub target: String,
    pub status: ActionStatus,
    pub output: Option<String>,
}

impl Report {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Replay {
    pub id: String,
    pub input: String,
    pub host: String,
    pub target: String,
    pub status: ActionStatus,
    pub output: Option<String>,
}

impl Replay {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl_record!(Device, Domain::Device, devices);
impl_record!(Worker, Domain::Worker, workers);
impl_record!(Subject, Domain::Subject, subjects);
impl_record!(Track, Domain::Track, tracks);
impl_record!(Package, Domain::Package, packages);
impl_record!(Trace, Domain::Trace, traces);
impl_record!(Report, Domain::Report, reports);
impl_record!(Replay, Domain::Replay, replays);
