mod job;
mod state;

pub use job::Job;
pub(crate) use job::new_job_id;
pub use state::{JobStatus, TransitionPolicy};
