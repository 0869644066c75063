use std::path::Path;
use std::sync::Arc;

use config::Config;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use super::LocalBuildStore;
use super::LocalJobManager;
use super::LocalStore;
use super::Managers;
use crate::Device;
use crate::Package;
use crate::Replay;
use crate::Report;
use crate::Result;
use crate::Subject;
use crate::Trace;
use crate::Track;
use crate::Worker;

/// Records to preload into the local managers, read from a TOML file:
///
/// ```toml
/// [[devices]]
/// id = "d1"
/// name = "pixel"
///
/// [[traces]]
/// id = "tr1"
/// status = "in_progress"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub devices: Vec<Device>,
    pub workers: Vec<Worker>,
    pub tracks: Vec<Track>,
    pub packages: Vec<Package>,
    pub subjects: Vec<Subject>,
    pub traces: Vec<Trace>,
    pub reports: Vec<Report>,
    pub replays: Vec<Replay>,
}

impl Fixtures {
    pub fn load(path: &Path) -> Result<Self> {
        let fixtures = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(fixtures)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
            + self.workers.len()
            + self.tracks.len()
            + self.packages.len()
            + self.subjects.len()
            + self.traces.len()
            + self.reports.len()
            + self.replays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One in-process store per manager stream.
pub struct LocalManagers {
    pub job: Arc<LocalJobManager>,
    pub build: Arc<LocalBuildStore>,
    pub subjects: Arc<LocalStore<Subject>>,
    pub traces: Arc<LocalStore<Trace>>,
    pub reports: Arc<LocalStore<Report>>,
    pub replays: Arc<LocalStore<Replay>>,
}

impl LocalManagers {
    pub fn new() -> Self {
        Self {
            job: Arc::new(LocalJobManager::new()),
            build: Arc::new(LocalBuildStore::new()),
            subjects: Arc::new(LocalStore::new("subject")),
            traces: Arc::new(LocalStore::new("trace")),
            reports: Arc::new(LocalStore::new("report")),
            replays: Arc::new(LocalStore::new("replay")),
        }
    }

    /// The full manager set backed by these stores.
    pub fn managers(&self) -> Managers {
        Managers::new()
            .with_job(self.job.clone())
            .with_build(self.build.clone())
            .with_subject(self.subjects.clone())
            .with_trace(self.traces.clone())
            .with_report(self.reports.clone())
            .with_replay(self.replays.clone())
    }

    /// Publishes every fixture record into its store.
    pub fn seed(
        &self,
        fixtures: Fixtures,
    ) {
        let total = fixtures.len();
        fixtures.devices.into_iter().for_each(|r| self.job.devices.publish(r));
        fixtures.workers.into_iter().for_each(|r| self.job.workers.publish(r));
        fixtures.tracks.into_iter().for_each(|r| self.build.tracks.publish(r));
        fixtures.packages.into_iter().for_each(|r| self.build.packages.publish(r));
        fixtures.subjects.into_iter().for_each(|r| self.subjects.publish(r));
        fixtures.traces.into_iter().for_each(|r| self.traces.publish(r));
        fixtures.reports.into_iter().for_each(|r| self.reports.publish(r));
        fixtures.replays.into_iter().for_each(|r| self.replays.publish(r));
        info!(records = total, "local managers seeded");
    }
}

impl Default for LocalManagers {
    fn default() -> Self {
        Self::new()
    }
}
