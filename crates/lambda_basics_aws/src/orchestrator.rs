use std::collections::BTreeMap;

use lambda_basics_core::config::OrchestratorConfig;
use lambda_basics_core::contract::{
    FunctionBlueprint, FunctionPhase, FunctionRecord, InvocationRecord, RoleAction, RoleOutcome,
    RoleRecord, UpdatePhase, LOG_LEVEL_VARIABLE,
};
use lambda_basics_core::error::{ProvisionError, ServiceError};
use lambda_basics_core::package::{build_deployment_package, DIRECT_UPLOAD_LIMIT_BYTES};
use lambda_basics_core::policy::TrustPolicy;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::adapters::{FunctionService, IdentityService};
use crate::waiter::{pause, wait_until, Probe, WaitTarget};

/// Drives role and function lifecycles through explicitly supplied provider clients.
///
/// Every operation either succeeds with the provider's record or returns a
/// [`ProvisionError`] that has already been logged with the operation and
/// resource name. Nothing is rolled back automatically.
pub struct ResourceOrchestrator<I, F> {
    identity: I,
    functions: F,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl<I, F> ResourceOrchestrator<I, F>
where
    I: IdentityService,
    F: FunctionService,
{
    pub fn new(identity: I, functions: F, config: OrchestratorConfig) -> Self {
        Self {
            identity,
            functions,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the token that interrupts waits and the propagation grace period.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn identity(&self) -> &I {
        &self.identity
    }

    pub fn functions(&self) -> &F {
        &self.functions
    }

    /// Creates or destroys `role_name`. `action` must be `create` or `destroy`;
    /// anything else fails before the identity service is contacted.
    pub async fn manage_role(
        &self,
        role_name: &str,
        action: &str,
    ) -> Result<RoleOutcome, ProvisionError> {
        match action.parse::<RoleAction>()? {
            RoleAction::Create => {
                let (role, policy_document) = self.create_role(role_name).await?;
                Ok(RoleOutcome::Created {
                    role,
                    policy_document,
                })
            }
            RoleAction::Destroy => {
                self.destroy_role(role_name).await?;
                Ok(RoleOutcome::Destroyed {
                    role_name: role_name.to_string(),
                })
            }
        }
    }

    /// Creates the role, attaches the execution policy and waits until the
    /// role is visible and past the propagation grace period.
    pub async fn create_role(
        &self,
        role_name: &str,
    ) -> Result<(RoleRecord, String), ProvisionError> {
        let policy_document = TrustPolicy::lambda_execution().to_json()?;
        let policy_arn = self.config.role.execution_policy_arn.as_str();

        let role = self
            .identity
            .create_role(role_name, &policy_document)
            .await
            .map_err(|error| log_service_error("create_role", role_name, error))?;
        self.identity
            .attach_role_policy(role_name, policy_arn)
            .await
            .map_err(|error| log_service_error("attach_role_policy", role_name, error))?;

        let target = WaitTarget {
            operation: "wait_role_exists",
            resource: role_name,
        };
        let identity = &self.identity;
        wait_until(&self.config.waiter.policy(), &self.cancel, target, move || async move {
            match identity.get_role(role_name).await {
                Ok(role) => Ok(Probe::Ready(role)),
                Err(error) if error.is_not_found() => Ok(Probe::Pending(error.code)),
                Err(error) => Err(error),
            }
        })
        .await?;
        tracing::info!(role = role_name, arn = %role.arn, "created IAM role");

        let grace = self.config.role.propagation_grace();
        tracing::debug!(
            role = role_name,
            grace_secs = grace.as_secs(),
            "waiting for IAM role propagation"
        );
        pause(&self.cancel, grace, target).await?;

        Ok((role, policy_document))
    }

    /// Detaches the execution policy and deletes the role. A policy that was
    /// never attached does not stop the delete; a role that does not exist
    /// surfaces as [`ProvisionError::NotFound`] from the delete.
    pub async fn destroy_role(&self, role_name: &str) -> Result<(), ProvisionError> {
        let policy_arn = self.config.role.execution_policy_arn.as_str();
        match self.identity.detach_role_policy(role_name, policy_arn).await {
            Ok(()) => {}
            Err(error) if error.is_not_found() => {
                tracing::warn!(
                    role = role_name,
                    policy = policy_arn,
                    code = %error.code,
                    "execution policy not attached; deleting role anyway"
                );
            }
            Err(error) => return Err(log_service_error("detach_role_policy", role_name, error)),
        }
        self.identity
            .delete_role(role_name)
            .await
            .map_err(|error| log_service_error("delete_role", role_name, error))?;
        tracing::info!(role = role_name, "detached policy and deleted IAM role");
        Ok(())
    }

    /// Rebuilds the deployment archive for `source_base_name` and returns its bytes.
    pub fn create_deployment_package(
        &self,
        source_base_name: &str,
    ) -> Result<Vec<u8>, ProvisionError> {
        let layout = &self.config.package;
        let archive = build_deployment_package(layout, source_base_name).map_err(|error| {
            tracing::error!(
                operation = "create_deployment_package",
                resource = source_base_name,
                error = %error,
                "failed to build deployment package"
            );
            ProvisionError::from(error)
        })?;

        if archive.len() > DIRECT_UPLOAD_LIMIT_BYTES {
            tracing::warn!(
                resource = source_base_name,
                bytes = archive.len(),
                limit = DIRECT_UPLOAD_LIMIT_BYTES,
                "deployment package exceeds the inline upload limit; the service will reject it"
            );
        }
        tracing::debug!(
            source = %layout.source_path(source_base_name).display(),
            archive = %layout.output_path().display(),
            bytes = archive.len(),
            "packaged deployment archive"
        );
        Ok(archive)
    }

    /// Creates the function with the configured runtime and log level and waits until it is active.
    pub async fn create_function(
        &self,
        function_name: &str,
        handler: &str,
        role_arn: &str,
        deployment_package: &[u8],
    ) -> Result<FunctionRecord, ProvisionError> {
        let blueprint = FunctionBlueprint::new(
            function_name,
            handler,
            role_arn,
            self.config.function.runtime.as_str(),
            &self.config.function.log_level,
        );
        let created = self
            .functions
            .create_function(&blueprint, deployment_package)
            .await
            .map_err(|error| log_service_error("create_function", function_name, error))?;

        let target = WaitTarget {
            operation: "wait_function_active",
            resource: function_name,
        };
        let active = wait_until(&self.config.waiter.policy(), &self.cancel, target, move || {
            self.probe_active(function_name)
        })
        .await?;
        tracing::info!(
            function = %created.function_name,
            arn = ?active.function_arn,
            "function is active"
        );
        Ok(FunctionRecord {
            state: active.state,
            ..created
        })
    }

    /// Replaces the function's code and waits until the update completes.
    pub async fn update_function_code(
        &self,
        function_name: &str,
        deployment_package: &[u8],
    ) -> Result<FunctionRecord, ProvisionError> {
        self.functions
            .update_function_code(function_name, deployment_package)
            .await
            .map_err(|error| log_service_error("update_function_code", function_name, error))?;

        let updated = self
            .wait_function_updated("wait_function_code_updated", function_name)
            .await?;
        tracing::info!(function = function_name, "function code updated");
        Ok(updated)
    }

    /// Replaces the function's `LOG_LEVEL` environment variable and waits until the update completes.
    pub async fn update_function_log_level(
        &self,
        function_name: &str,
        log_level: &str,
    ) -> Result<FunctionRecord, ProvisionError> {
        let variables =
            BTreeMap::from([(LOG_LEVEL_VARIABLE.to_string(), log_level.to_string())]);
        self.functions
            .update_function_environment(function_name, &variables)
            .await
            .map_err(|error| {
                log_service_error("update_function_configuration", function_name, error)
            })?;

        let updated = self
            .wait_function_updated("wait_function_configuration_updated", function_name)
            .await?;
        tracing::info!(function = function_name, log_level, "function log level updated");
        Ok(updated)
    }

    pub async fn get_function(&self, function_name: &str) -> Result<FunctionRecord, ProvisionError> {
        self.functions
            .get_function(function_name)
            .await
            .map_err(|error| log_service_error("get_function", function_name, error))
    }

    pub async fn invoke_function(
        &self,
        function_name: &str,
        payload: &impl Serialize,
    ) -> Result<InvocationRecord, ProvisionError> {
        let body = serde_json::to_vec(payload)?;
        let record = self
            .functions
            .invoke(function_name, &body)
            .await
            .map_err(|error| log_service_error("invoke", function_name, error))?;

        if let Some(function_error) = &record.function_error {
            tracing::warn!(
                function = function_name,
                function_error = %function_error,
                payload = %record.payload,
                "function returned an error"
            );
        } else {
            tracing::debug!(function = function_name, payload = %record.payload, "function invoked");
        }
        Ok(record)
    }

    /// Invokes the function and returns the first log line containing `expected`.
    pub async fn invoke_and_verify(
        &self,
        function_name: &str,
        payload: &impl Serialize,
        expected: &str,
    ) -> Result<Option<String>, ProvisionError> {
        let record = self.invoke_function(function_name, payload).await?;
        let line = record.find_log_line(expected).map(str::to_string);
        if line.is_none() {
            tracing::warn!(
                function = function_name,
                expected,
                "expected log statement not found in invocation log tail"
            );
        }
        Ok(line)
    }

    pub async fn delete_function(&self, function_name: &str) -> Result<(), ProvisionError> {
        self.functions
            .delete_function(function_name)
            .await
            .map_err(|error| log_service_error("delete_function", function_name, error))?;
        tracing::info!(function = function_name, "deleted function");
        Ok(())
    }

    async fn probe_active(&self, function_name: &str) -> Result<Probe<FunctionRecord>, ServiceError> {
        let record = self.functions.get_function(function_name).await?;
        Ok(match record.state.clone() {
            Some(FunctionPhase::Active) => Probe::Ready(record),
            Some(FunctionPhase::Failed) => Probe::Failed {
                state: FunctionPhase::Failed.to_string(),
                reason: record.state_reason.unwrap_or_default(),
            },
            Some(other) => Probe::Pending(other.to_string()),
            None => Probe::Pending("unknown".to_string()),
        })
    }

    async fn probe_updated(&self, function_name: &str) -> Result<Probe<FunctionRecord>, ServiceError> {
        let record = self.functions.get_function(function_name).await?;
        Ok(match record.last_update_status.clone() {
            Some(UpdatePhase::Successful) => Probe::Ready(record),
            Some(UpdatePhase::Failed) => Probe::Failed {
                state: UpdatePhase::Failed.to_string(),
                reason: record.last_update_status_reason.unwrap_or_default(),
            },
            Some(other) => Probe::Pending(other.to_string()),
            None => Probe::Pending("unknown".to_string()),
        })
    }

    async fn wait_function_updated(
        &self,
        operation: &'static str,
        function_name: &str,
    ) -> Result<FunctionRecord, ProvisionError> {
        let target = WaitTarget {
            operation,
            resource: function_name,
        };
        wait_until(&self.config.waiter.policy(), &self.cancel, target, move || {
            self.probe_updated(function_name)
        })
        .await
    }
}

fn log_service_error(
    operation: &'static str,
    resource: &str,
    error: ServiceError,
) -> ProvisionError {
    tracing::error!(
        operation,
        resource,
        code = %error.code,
        error = %error.message,
        "service request failed"
    );
    ProvisionError::from_service(operation, resource, error)
}
