use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;

pub const LOG_LEVEL_VARIABLE: &str = "LOG_LEVEL";
pub const DEFAULT_RUNTIME: &str = "ruby3.3";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_HANDLER: &str = "lambda_function.lambda_handler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Create,
    Destroy,
}

impl FromStr for RoleAction {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "destroy" => Ok(Self::Destroy),
            other => Err(ProvisionError::InvalidAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleRecord {
    pub role_name: String,
    pub arn: String,
    pub assume_role_policy_document: Option<String>,
}

/// Result of a role management call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleOutcome {
    Created {
        role: RoleRecord,
        policy_document: String,
    },
    Destroyed {
        role_name: String,
    },
}

impl RoleOutcome {
    pub fn role(&self) -> Option<&RoleRecord> {
        match self {
            Self::Created { role, .. } => Some(role),
            Self::Destroyed { .. } => None,
        }
    }
}

/// Everything a create-function request needs besides the code bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBlueprint {
    pub function_name: String,
    pub handler: String,
    pub role_arn: String,
    pub runtime: String,
    pub environment: BTreeMap<String, String>,
}

impl FunctionBlueprint {
    pub fn new(
        function_name: impl Into<String>,
        handler: impl Into<String>,
        role_arn: impl Into<String>,
        runtime: impl Into<String>,
        log_level: &str,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            handler: handler.into(),
            role_arn: role_arn.into(),
            runtime: runtime.into(),
            environment: BTreeMap::from([(LOG_LEVEL_VARIABLE.to_string(), log_level.to_string())]),
        }
    }
}

/// Provider-reported lifecycle state of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionPhase {
    Pending,
    Active,
    Inactive,
    Failed,
    Unknown(String),
}

impl FunctionPhase {
    pub fn from_provider(value: &str) -> Self {
        match value {
            "Pending" => Self::Pending,
            "Active" => Self::Active,
            "Inactive" => Self::Inactive,
            "Failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for FunctionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Active => f.write_str("Active"),
            Self::Inactive => f.write_str("Inactive"),
            Self::Failed => f.write_str("Failed"),
            Self::Unknown(value) => f.write_str(value),
        }
    }
}

/// Provider-reported status of the most recent code or configuration update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdatePhase {
    InProgress,
    Successful,
    Failed,
    Unknown(String),
}

impl UpdatePhase {
    pub fn from_provider(value: &str) -> Self {
        match value {
            "InProgress" => Self::InProgress,
            "Successful" => Self::Successful,
            "Failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("InProgress"),
            Self::Successful => f.write_str("Successful"),
            Self::Failed => f.write_str("Failed"),
            Self::Unknown(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub function_name: String,
    pub function_arn: Option<String>,
    pub runtime: Option<String>,
    pub handler: Option<String>,
    pub state: Option<FunctionPhase>,
    pub state_reason: Option<String>,
    pub last_update_status: Option<UpdatePhase>,
    pub last_update_status_reason: Option<String>,
}

impl FunctionRecord {
    pub fn named(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            function_arn: None,
            runtime: None,
            handler: None,
            state: None,
            state_reason: None,
            last_update_status: None,
            last_update_status_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub status_code: i32,
    pub payload: String,
    pub function_error: Option<String>,
    pub log_tail: Option<String>,
}

impl InvocationRecord {
    /// First log line containing `fragment`, if the tail was captured.
    pub fn find_log_line(&self, fragment: &str) -> Option<&str> {
        self.log_tail
            .as_deref()?
            .lines()
            .find(|line| line.contains(fragment))
    }
}
