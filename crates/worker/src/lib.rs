//! Offline request router and cache manager for the ThinkBit Edge site.
//!
//! The worker sits between the site's pages and the network. Each
//! intercepted request is classified and resolved by one of five caching
//! strategies against two versioned partitions; contact form posts made
//! offline are parked and replayed later.
//!
//! - [`classify`]: request → category → strategy
//! - [`strategies`]: the five resolution strategies
//! - [`store`]: partition naming, install and activation housekeeping
//! - [`sync`]: deferred submissions and periodic refresh
//! - [`lifecycle`]: install/activate state machine
//! - [`worker`]: event dispatch

pub mod classify;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod offline;
pub mod store;
pub mod strategies;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{Category, Classifier, Strategy};
pub use events::{ActivationReport, Event, EventKind, EventOutcome, FetchDecision, Message, WorkerMessage};
pub use host::{ClientHost, Notification};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use store::{CacheManager, Partition};
pub use strategies::{FetchOutcome, Revalidation, StrategyContext};
pub use sync::{SyncQueue, SyncReport};
pub use worker::Worker;
