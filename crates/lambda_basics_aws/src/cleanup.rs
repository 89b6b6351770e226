//! Bookkeeping for resources a run may have left behind.
//!
//! A create call can succeed at the provider while the operation as a whole
//! fails afterwards (policy attach refused, wait timed out or cancelled,
//! terminal state). Names are therefore recorded from the create outcome,
//! not only from a successful return.

use lambda_basics_core::error::ProvisionError;

use crate::adapters::{FunctionService, IdentityService};
use crate::ResourceOrchestrator;

const CREATE_ROLE: &str = "create_role";
const CREATE_FUNCTION: &str = "create_function";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CreatedResources {
    role_name: Option<String>,
    function_name: Option<String>,
}

impl CreatedResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the role unless the provider refused the create call itself.
    pub fn note_role<T>(&mut self, role_name: &str, outcome: &Result<T, ProvisionError>) {
        if may_exist(outcome, CREATE_ROLE) {
            self.role_name = Some(role_name.to_string());
        }
    }

    /// Records the function unless the provider refused the create call itself.
    pub fn note_function<T>(&mut self, function_name: &str, outcome: &Result<T, ProvisionError>) {
        if may_exist(outcome, CREATE_FUNCTION) {
            self.function_name = Some(function_name.to_string());
        }
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role_name.as_deref()
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.role_name.is_none() && self.function_name.is_none()
    }

    /// Deletes the function, then the role. Anything already gone counts as
    /// removed; every other failure is returned once both deletes were tried.
    pub async fn teardown<I, F>(
        &self,
        orchestrator: &ResourceOrchestrator<I, F>,
    ) -> Vec<ProvisionError>
    where
        I: IdentityService,
        F: FunctionService,
    {
        let mut failures = Vec::new();
        if let Some(function_name) = self.function_name() {
            match orchestrator.delete_function(function_name).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {
                    tracing::debug!(function = function_name, "function already absent");
                }
                Err(error) => failures.push(error),
            }
        }
        if let Some(role_name) = self.role_name() {
            match orchestrator.destroy_role(role_name).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {
                    tracing::debug!(role = role_name, "role already absent");
                }
                Err(error) => failures.push(error),
            }
        }
        failures
    }
}

/// False only when `operation` itself was answered with a refusal. A create
/// that never got an answer may still have landed.
fn may_exist<T>(outcome: &Result<T, ProvisionError>, operation: &str) -> bool {
    match outcome {
        Ok(_) => true,
        Err(ProvisionError::Rejected { operation: failed, .. })
        | Err(ProvisionError::NotFound { operation: failed, .. }) => *failed != operation,
        Err(_) => true,
    }
}
