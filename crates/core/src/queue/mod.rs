//! Global FIFO admission queue for job runs.
//!
//! Jobs are started strictly in the order they were enqueued. At most
//! `concurrency` runs hold a slot at once; the next queued run starts as soon
//! as a slot frees up.

mod admission;

pub use admission::{AdmissionQueue, QueueError, QueueStatus};
