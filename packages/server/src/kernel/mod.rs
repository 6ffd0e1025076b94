//! Kernel module - infrastructure shared by all research jobs.

pub mod deps;
pub mod event_bus;
pub mod job_store;

pub use deps::ResearchDeps;
pub use event_bus::{Delivery, ProgressBus, Subscription};
pub use job_store::{InMemoryJobStore, JobStore};
