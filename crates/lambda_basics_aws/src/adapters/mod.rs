//! Provider seams the orchestrator talks through.
//!
//! Each trait has an AWS SDK implementation here; tests substitute in-memory fakes.

pub mod functions;
pub mod identity;
mod sdk_error;

pub use functions::{AwsFunctionService, FunctionService};
pub use identity::{AwsIdentityService, IdentityService};
