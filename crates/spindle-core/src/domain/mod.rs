//! Domain model (ids, job, queue filter, outcome, events, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod job;
pub mod outcome;
pub mod queue;

pub use errors::{StoreError, TaskError};
pub use events::{JobEvent, JobEventKind};
pub use ids::{ClaimId, JobId, WorkerId};
pub use job::{DEFAULT_QUEUE, Job, JobArgs, JobStatus};
pub use outcome::Outcome;
pub use queue::{ANY_QUEUE_CHANNEL, QueueFilter, channels_for_enqueue, queue_channel};
