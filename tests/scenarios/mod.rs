mod live_snapshot;
mod stream_failures;
