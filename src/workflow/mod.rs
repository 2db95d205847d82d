pub mod attempt_ctx;
pub mod item_job;

pub use attempt_ctx::AttemptCtx;
pub use item_job::{AttemptOutcome, ItemJob, JobState};
