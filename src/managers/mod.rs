//! Capability interfaces of the monitored backend managers.
//!
//! Every manager exposes one or more continuous searches. A search in monitor
//! mode never returns under normal operation; it hands every new or changed
//! record, complete rather than as a diff, to the supplied [`RecordHandler`].
mod fixtures;
mod local_store;
pub use fixtures::*;
pub use local_store::*;

#[cfg(test)]
mod local_store_test;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;

use crate::Device;
use crate::Package;
use crate::Record;
use crate::Replay;
use crate::Report;
use crate::Result;
use crate::Subject;
use crate::Trace;
use crate::Track;
use crate::Worker;

/// Search parameters passed to a manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Query {
    /// Keep delivering changes after the current matches.
    pub monitor: bool,
}

impl Query {
    /// Every current record, then return.
    pub fn all() -> Self {
        Self { monitor: false }
    }

    /// Every current record, then every change until cancelled.
    pub fn monitor() -> Self {
        Self { monitor: true }
    }
}

/// Receives the records produced by a search. An error ends the search.
#[async_trait]
pub trait RecordHandler<R: Record>: Send + Sync + 'static {
    async fn handle(
        &self,
        record: R,
    ) -> Result<()>;
}

pub type Handler<R> = Arc<dyn RecordHandler<R>>;

/// Continuous search over one record stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Search<R: Record>: Send + Sync + 'static {
    /// Runs `query`, invoking `handler` once per delivered record.
    ///
    /// Returns when the results are exhausted (non-monitor queries), when
    /// `shutdown` is cancelled, or with an error when the stream breaks.
    async fn search(
        &self,
        query: Query,
        handler: Handler<R>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

/// Job scheduler: separate device and worker streams.
pub trait JobManager: Search<Device> + Search<Worker> {}
impl<T> JobManager for T where T: Search<Device> + Search<Worker> {}

/// Build artifact store: separate track and package streams.
pub trait BuildStore: Search<Track> + Search<Package> {}
impl<T> BuildStore for T where T: Search<Track> + Search<Package> {}

pub trait SubjectStore: Search<Subject> {}
impl<T> SubjectStore for T where T: Search<Subject> {}

pub trait TraceManager: Search<Trace> {}
impl<T> TraceManager for T where T: Search<Trace> {}

pub trait ReportManager: Search<Report> {}
impl<T> ReportManager for T where T: Search<Report> {}

pub trait ReplayManager: Search<Replay> {}
impl<T> ReplayManager for T where T: Search<Replay> {}

/// The set of managers to monitor. An absent entry leaves its domains empty.
#[derive(Clone, Default)]
pub struct Managers {
    pub job: Option<Arc<dyn JobManager>>,
    pub build: Option<Arc<dyn BuildStore>>,
    pub subject: Option<Arc<dyn SubjectStore>>,
    pub trace: Option<Arc<dyn TraceManager>>,
    pub report: Option<Arc<dyn ReportManager>>,
    pub replay: Option<Arc<dyn ReplayManager>>,
}

impl Managers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(
        mut self,
        job: Arc<dyn JobManager>,
    ) -> Self {
        self.job = Some(job);
        self
    }

    pub fn with_build(
        mut self,
        build: Arc<dyn BuildStore>,
    ) -> Self {
        self.build = Some(build);
        self
    }

    pub fn with_subject(
        mut self,
        subject: Arc<dyn SubjectStore>,
    ) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_trace(
        mut self,
        trace: Arc<dyn TraceManager>,
    ) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_report(
        mut self,
        report: Arc<dyn ReportManager>,
    ) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_replay(
        mut self,
        replay: Arc<dyn ReplayManager>,
    ) -> Self {
        self.replay = Some(replay);
        self
    }

    /// Names of the managers present in this set.
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.job.is_some() {
            names.push("job");
        }
        if self.build.is_some() {
            names.push("build");
        }
        if self.subject.is_some() {
            names.push("subject");
        }
        if self.trace.is_some() {
            names.push("trace");
        }
        if self.report.is_some() {
            names.push("report");
        }
        if self.replay.is_some() {
            names.push("replay");
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }
}

impl fmt::Debug for Managers {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Managers").field("present", &self.present()).finish()
    }
}
