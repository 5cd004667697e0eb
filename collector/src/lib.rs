//! # Cluster Report Collector
//!
//! Concurrent metric collection across many nodes.
//!
//! A run takes a list of [`Node`](cluster_report_config::Node)s and a list of [`Collector`]s and
//! executes every (node, collector) pair on a bounded worker pool:
//!
//! - **[`Scheduler`]**: builds the cross product, limits how many collections run at once and
//!   enforces the per-task [`Deadline`]
//! - **[`Aggregator`]**: turns the stream of [`CollectionResult`]s into a deterministic
//!   [`AggregateReport`]
//! - **[`Orchestrator`]**: validates a run, wires the two together and applies the overall
//!   timeout
//!
//! Built-in collectors ([`HardwareProbe`], [`PerformanceSnapshot`], [`NetworkStats`],
//! [`CustomCommand`]) talk to
//! nodes through a [`Transport`]; [`ShellTransport`] runs commands locally or over `ssh`.
//! A failing, hanging or panicking collector only ever costs its own pair.

#[macro_use]
extern crate tracing;

mod aggregator;
mod cached;
mod collector;
mod custom;
mod deadline;
mod error;
mod hardware;
mod network;
mod orchestrator;
pub mod parse;
mod performance;
mod registry;
mod report;
mod scheduler;
#[cfg(test)]
mod testing;
mod transport;

pub use aggregator::Aggregator;
pub use cached::Cached;
pub use collector::{
    CollectFuture,
    Collector,
    DataKind,
    Metrics,
};
pub use custom::CustomCommand;
pub use deadline::Deadline;
pub use error::{
    CollectError,
    EngineError,
};
pub use hardware::HardwareProbe;
pub use network::NetworkStats;
pub use orchestrator::{
    run_collection,
    Orchestrator,
    RunOptions,
};
pub use performance::PerformanceSnapshot;
pub use registry::Registry;
pub use report::{
    AggregateReport,
    CollectionResult,
    NodeReport,
    RunSummary,
};
pub use scheduler::{
    CollectionTask,
    Scheduler,
};
pub use transport::{
    ExecFuture,
    ShellTransport,
    Transport,
};
