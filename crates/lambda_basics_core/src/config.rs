// Orchestrator configuration.
//
// Priority order:
// 1. Environment variables (LAMBDA_BASICS_* prefix)
// 2. Config file path from LAMBDA_BASICS_CONFIG
// 3. Default config file (./lambda_basics.toml)
// 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contract::{DEFAULT_LOG_LEVEL, DEFAULT_RUNTIME};
use crate::error::ConfigError;
use crate::package::PackageLayout;
use crate::policy::BASIC_EXECUTION_POLICY_ARN;
use crate::waiter::{WaitPolicy, DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROPAGATION_GRACE};

pub const ENV_PREFIX: &str = "LAMBDA_BASICS_";
pub const CONFIG_PATH_VARIABLE: &str = "LAMBDA_BASICS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "./lambda_basics.toml";

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub waiter: WaiterConfig,
    pub role: RoleConfig,
    pub function: FunctionConfig,
    pub package: PackageLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaiterConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
    pub jitter_millis: u64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_secs: DEFAULT_DELAY.as_secs(),
            jitter_millis: 0,
        }
    }
}

impl WaiterConfig {
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::fixed(self.max_attempts, Duration::from_secs(self.delay_secs))
            .with_jitter(Duration::from_millis(self.jitter_millis))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleConfig {
    pub execution_policy_arn: String,
    /// Extra wait after the role is visible, before Lambda can assume it.
    pub propagation_grace_secs: u64,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            execution_policy_arn: BASIC_EXECUTION_POLICY_ARN.to_string(),
            propagation_grace_secs: DEFAULT_PROPAGATION_GRACE.as_secs(),
        }
    }
}

impl RoleConfig {
    pub fn propagation_grace(&self) -> Duration {
        Duration::from_secs(self.propagation_grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FunctionConfig {
    pub runtime: String,
    pub log_level: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Read access to environment variables, swappable in tests.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl OrchestratorConfig {
    /// Loads defaults, then the config file (if any), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let env = StdEnvSource;
        let explicit = env.get(CONFIG_PATH_VARIABLE).map(PathBuf::from);
        Self::load_with(explicit.as_deref(), &env)
    }

    /// Like [`OrchestratorConfig::load`], but with an explicit file path taking
    /// precedence over `LAMBDA_BASICS_CONFIG`.
    pub fn load_with(path: Option<&Path>, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self, env: &dyn EnvSource) -> Result<(), ConfigError> {
        override_parsed(env, "WAITER_MAX_ATTEMPTS", &mut self.waiter.max_attempts)?;
        override_parsed(env, "WAITER_DELAY_SECS", &mut self.waiter.delay_secs)?;
        override_parsed(env, "WAITER_JITTER_MILLIS", &mut self.waiter.jitter_millis)?;
        override_parsed(
            env,
            "ROLE_PROPAGATION_GRACE_SECS",
            &mut self.role.propagation_grace_secs,
        )?;
        override_parsed(
            env,
            "ROLE_EXECUTION_POLICY_ARN",
            &mut self.role.execution_policy_arn,
        )?;
        override_parsed(env, "FUNCTION_RUNTIME", &mut self.function.runtime)?;
        override_parsed(env, "FUNCTION_LOG_LEVEL", &mut self.function.log_level)?;
        override_parsed(env, "PACKAGE_SOURCE_DIR", &mut self.package.source_dir)?;
        override_parsed(
            env,
            "PACKAGE_SOURCE_EXTENSION",
            &mut self.package.source_extension,
        )?;
        override_parsed(env, "PACKAGE_ENTRY_NAME", &mut self.package.entry_name)?;
        override_parsed(env, "PACKAGE_OUTPUT_FILE", &mut self.package.output_file)?;
        override_parsed(env, "PACKAGE_EXECUTABLE", &mut self.package.executable)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waiter.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "waiter.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.role.execution_policy_arn.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "role.execution_policy_arn must not be empty".to_string(),
            ));
        }
        if self.function.runtime.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "function.runtime must not be empty".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.function.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "function.log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.function.log_level
            )));
        }
        if self.package.entry_name.trim().is_empty() || self.package.output_file.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "package.entry_name and package.output_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn override_parsed<T: FromStr>(
    env: &dyn EnvSource,
    suffix: &str,
    target: &mut T,
) -> Result<(), ConfigError> {
    let key = format!("{ENV_PREFIX}{suffix}");
    let Some(value) = env.get(&key) else {
        return Ok(());
    };
    *target = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })?;
    Ok(())
}
