//! Broadcast jobs

mod jobs;
mod runner;

pub use jobs::{JobHandle, JobRegistry, JobState, JobStatus};
pub use runner::{compose_text, run_broadcast, BroadcastJob};
