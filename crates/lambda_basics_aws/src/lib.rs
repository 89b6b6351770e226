//! AWS-oriented adapters and orchestration for the Lambda basics workflow.
//!
//! This crate owns SDK integration details (IAM and Lambda clients, waiter
//! loops, tracing setup) and re-exports the provider-agnostic primitives from
//! `lambda_basics_core` under a single `runtime` module boundary.
//! See `crates/lambda_basics_aws/README.md` for ownership boundaries.

pub mod adapters;
pub mod cleanup;
pub mod orchestrator;
pub mod telemetry;
pub mod waiter;

pub mod runtime {
    pub use lambda_basics_core::{config, contract, error, handler, package, policy};
}

pub use orchestrator::ResourceOrchestrator;
