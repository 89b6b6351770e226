use serde::{Deserialize, Serialize};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const ASSUME_ROLE_ACTION: &str = "sts:AssumeRole";
pub const BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";
pub const ROLE_NAME_SUFFIX: &str = "-role";

/// Trust policy letting a single service principal assume a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrustPolicy {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statement: Vec<TrustStatement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrustStatement {
    #[serde(rename = "Effect")]
    pub effect: String,
    #[serde(rename = "Principal")]
    pub principal: ServicePrincipal,
    #[serde(rename = "Action")]
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServicePrincipal {
    #[serde(rename = "Service")]
    pub service: String,
}

impl TrustPolicy {
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![TrustStatement {
                effect: "Allow".to_string(),
                principal: ServicePrincipal {
                    service: service.into(),
                },
                action: ASSUME_ROLE_ACTION.to_string(),
            }],
        }
    }

    /// The execution-role trust policy for Lambda functions.
    pub fn lambda_execution() -> Self {
        Self::for_service(LAMBDA_SERVICE_PRINCIPAL)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub fn role_name_for(base_name: &str) -> String {
    format!("{base_name}{ROLE_NAME_SUFFIX}")
}
