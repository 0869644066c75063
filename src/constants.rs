// -
// Manager stream names, used as log fields and metric labels

pub const STREAM_JOB_DEVICES: &str = "job.devices";
pub const STREAM_JOB_WORKERS: &str = "job.workers";
pub const STREAM_BUILD_TRACKS: &str = "build.tracks";
pub const STREAM_BUILD_PACKAGES: &str = "build.packages";
pub const STREAM_SUBJECT: &str = "subject";
pub const STREAM_TRACE: &str = "trace";
pub const STREAM_REPORT: &str = "report";
pub const STREAM_REPLAY: &str = "replay";
