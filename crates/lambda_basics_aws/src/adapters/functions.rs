use std::collections::BTreeMap;

use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{Environment, FunctionCode, LogType, Runtime};
use base64::Engine;
use lambda_basics_core::contract::{
    FunctionBlueprint, FunctionPhase, FunctionRecord, InvocationRecord, UpdatePhase,
};
use lambda_basics_core::error::ServiceError;

use super::sdk_error::service_error;

/// Function lifecycle operations of the serverless-function service.
#[allow(async_fn_in_trait)]
pub trait FunctionService {
    async fn create_function(
        &self,
        blueprint: &FunctionBlueprint,
        zip_file: &[u8],
    ) -> Result<FunctionRecord, ServiceError>;

    /// Current configuration, including state and last update status.
    async fn get_function(&self, function_name: &str) -> Result<FunctionRecord, ServiceError>;

    async fn update_function_code(
        &self,
        function_name: &str,
        zip_file: &[u8],
    ) -> Result<FunctionRecord, ServiceError>;

    async fn update_function_environment(
        &self,
        function_name: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<FunctionRecord, ServiceError>;

    /// Synchronous invocation with the log tail captured.
    async fn invoke(
        &self,
        function_name: &str,
        payload: &[u8],
    ) -> Result<InvocationRecord, ServiceError>;

    async fn delete_function(&self, function_name: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct AwsFunctionService {
    client: aws_sdk_lambda::Client,
}

impl AwsFunctionService {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_lambda::Client::new(config))
    }
}

// Create, update-code and update-configuration responses share these accessors
// with `FunctionConfiguration` but not a common type.
macro_rules! function_record {
    ($fallback_name:expr, $output:expr) => {{
        let output = $output;
        FunctionRecord {
            function_name: output
                .function_name()
                .map(str::to_string)
                .unwrap_or_else(|| $fallback_name.to_string()),
            function_arn: output.function_arn().map(str::to_string),
            runtime: output.runtime().map(|runtime| runtime.as_str().to_string()),
            handler: output.handler().map(str::to_string),
            state: output
                .state()
                .map(|state| FunctionPhase::from_provider(state.as_str())),
            state_reason: output.state_reason().map(str::to_string),
            last_update_status: output
                .last_update_status()
                .map(|status| UpdatePhase::from_provider(status.as_str())),
            last_update_status_reason: output.last_update_status_reason().map(str::to_string),
        }
    }};
}

impl FunctionService for AwsFunctionService {
    async fn create_function(
        &self,
        blueprint: &FunctionBlueprint,
        zip_file: &[u8],
    ) -> Result<FunctionRecord, ServiceError> {
        let environment = blueprint
            .environment
            .iter()
            .fold(Environment::builder(), |builder, (key, value)| {
                builder.variables(key, value)
            })
            .build();

        let output = self
            .client
            .create_function()
            .function_name(&blueprint.function_name)
            .handler(&blueprint.handler)
            .role(&blueprint.role_arn)
            .runtime(Runtime::from(blueprint.runtime.as_str()))
            .code(FunctionCode::builder().zip_file(Blob::new(zip_file)).build())
            .environment(environment)
            .send()
            .await
            .map_err(service_error)?;
        Ok(function_record!(blueprint.function_name, &output))
    }

    async fn get_function(&self, function_name: &str) -> Result<FunctionRecord, ServiceError> {
        let output = self
            .client
            .get_function()
            .function_name(function_name)
            .send()
            .await
            .map_err(service_error)?;
        let configuration = output.configuration().ok_or_else(|| {
            ServiceError::from_code(
                "MissingConfiguration",
                format!("GetFunction response for '{function_name}' had no configuration"),
            )
        })?;
        Ok(function_record!(function_name, configuration))
    }

    async fn update_function_code(
        &self,
        function_name: &str,
        zip_file: &[u8],
    ) -> Result<FunctionRecord, ServiceError> {
        let output = self
            .client
            .update_function_code()
            .function_name(function_name)
            .zip_file(Blob::new(zip_file))
            .send()
            .await
            .map_err(service_error)?;
        Ok(function_record!(function_name, &output))
    }

    async fn update_function_environment(
        &self,
        function_name: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<FunctionRecord, ServiceError> {
        let environment = Environment::builder()
            .set_variables(Some(variables.clone().into_iter().collect()))
            .build();
        let output = self
            .client
            .update_function_configuration()
            .function_name(function_name)
            .environment(environment)
            .send()
            .await
            .map_err(service_error)?;
        Ok(function_record!(function_name, &output))
    }

    async fn invoke(
        &self,
        function_name: &str,
        payload: &[u8],
    ) -> Result<InvocationRecord, ServiceError> {
        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .payload(Blob::new(payload))
            .log_type(LogType::Tail)
            .send()
            .await
            .map_err(service_error)?;

        let log_tail = output.log_result().and_then(|encoded| {
            base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        });
        Ok(InvocationRecord {
            status_code: output.status_code(),
            payload: output
                .payload()
                .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned())
                .unwrap_or_default(),
            function_error: output.function_error().map(str::to_string),
            log_tail,
        })
    }

    async fn delete_function(&self, function_name: &str) -> Result<(), ServiceError> {
        self.client
            .delete_function()
            .function_name(function_name)
            .send()
            .await
            .map(|_| ())
            .map_err(service_error)
    }
}
