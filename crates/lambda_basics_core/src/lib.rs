//! Provider-agnostic primitives for the Lambda basics workflow.
//!
//! This crate owns the role trust policy, function blueprints, waiter policy,
//! deployment packaging, the deployed handler's contract, configuration, and
//! the error taxonomy. It intentionally excludes AWS SDK and Lambda runtime
//! concerns, which live in `lambda_basics_aws`.
//! See `crates/lambda_basics_core/README.md` for ownership boundaries.

pub mod config;
pub mod contract;
pub mod error;
pub mod handler;
pub mod package;
pub mod policy;
pub mod waiter;
