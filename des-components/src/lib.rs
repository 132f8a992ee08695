//! Pipeline stages for resiliency simulations
//!
//! Every stage is a [`des_core::Component`] handling [`StageEvent`]s, so stages
//! compose freely: a caller sends a `Call`, the callee eventually answers with
//! exactly one `Reply`. A typical pipeline reads
//!
//! ```text
//! ArrivalSource -> EntryStage (X) -> [PerRequestTimeout] -> IntermediaryStage (Y)
//!     -> model stages (timeout, retry, ...) -> StochasticResourceStage (Z)
//! ```
//!
//! Stages that observe traffic append to a shared
//! [`des_metrics::SharedRecorder`] whenever they receive `Sample`.

pub mod arrivals;
pub mod entry;
pub mod error;
pub mod hook;
pub mod intermediary;
pub mod queue;
pub mod resource;
pub mod retry;
pub mod stage;
pub mod timeout;

pub use arrivals::{start_arrivals, ArrivalSource};
pub use entry::EntryStage;
pub use error::{HookError, QueueError};
pub use hook::{key_suffix, MetadataHook};
pub use intermediary::IntermediaryStage;
pub use queue::{Admission, FifoQueue, Queue, QueueItem, ServiceQueue};
pub use resource::{ResourceConfig, StochasticResourceStage};
pub use retry::RetryStage;
pub use stage::{
    forward, reply, reply_failure, start_sampling, CallId, CallTable, ConfigChange, StageEvent,
    StageKey, Upstream,
};
pub use timeout::PerRequestTimeout;
