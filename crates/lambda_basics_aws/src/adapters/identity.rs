use lambda_basics_core::contract::RoleRecord;
use lambda_basics_core::error::ServiceError;

use super::sdk_error::service_error;

/// Role management operations of the identity service.
#[allow(async_fn_in_trait)]
pub trait IdentityService {
    async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy_document: &str,
    ) -> Result<RoleRecord, ServiceError>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str)
        -> Result<(), ServiceError>;

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str)
        -> Result<(), ServiceError>;

    /// Fails with a `NotFound` error while the role is not (yet) visible.
    async fn get_role(&self, role_name: &str) -> Result<RoleRecord, ServiceError>;

    async fn delete_role(&self, role_name: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct AwsIdentityService {
    client: aws_sdk_iam::Client,
}

impl AwsIdentityService {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_iam::Client::new(config))
    }
}

fn role_record(role: &aws_sdk_iam::types::Role) -> RoleRecord {
    RoleRecord {
        role_name: role.role_name().to_string(),
        arn: role.arn().to_string(),
        assume_role_policy_document: role.assume_role_policy_document().map(str::to_string),
    }
}

fn missing_role(operation: &str, role_name: &str) -> ServiceError {
    ServiceError::from_code(
        "MissingRole",
        format!("{operation} response for '{role_name}' did not include a role"),
    )
}

impl IdentityService for AwsIdentityService {
    async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy_document: &str,
    ) -> Result<RoleRecord, ServiceError> {
        let output = self
            .client
            .create_role()
            .role_name(role_name)
            .assume_role_policy_document(assume_role_policy_document)
            .send()
            .await
            .map_err(service_error)?;
        output
            .role()
            .map(role_record)
            .ok_or_else(|| missing_role("CreateRole", role_name))
    }

    async fn attach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), ServiceError> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(service_error)
    }

    async fn detach_role_policy(
        &self,
        role_name: &str,
        policy_arn: &str,
    ) -> Result<(), ServiceError> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map(|_| ())
            .map_err(service_error)
    }

    async fn get_role(&self, role_name: &str) -> Result<RoleRecord, ServiceError> {
        let output = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(service_error)?;
        output
            .role()
            .map(role_record)
            .ok_or_else(|| missing_role("GetRole", role_name))
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), ServiceError> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map(|_| ())
            .map_err(service_error)
    }
}
