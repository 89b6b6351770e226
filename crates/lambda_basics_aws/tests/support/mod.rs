#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

use lambda_basics_aws::adapters::{FunctionService, IdentityService};
use lambda_basics_aws::runtime::config::OrchestratorConfig;
use lambda_basics_aws::runtime::contract::{
    FunctionBlueprint, FunctionPhase, FunctionRecord, InvocationRecord, RoleRecord, UpdatePhase,
    LOG_LEVEL_VARIABLE,
};
use lambda_basics_aws::runtime::error::{ServiceError, ServiceErrorKind};
use lambda_basics_aws::runtime::handler::{handle_event, HandlerLogLevel};
use lambda_basics_aws::ResourceOrchestrator;

pub type FakeOrchestrator = ResourceOrchestrator<FakeIdentity, FakeFunctions>;

pub fn rejected(code: &str) -> ServiceError {
    ServiceError::new(ServiceErrorKind::Rejected, code, format!("{code} injected by test"))
}

/// Config pointing the package layout at `dir`, with default waiter timings.
pub fn config_in(dir: &Path) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.package.source_dir = dir.to_path_buf();
    config
}

pub fn write_ruby_sources(dir: &Path) {
    std::fs::write(
        dir.join("lambda_function.rb"),
        "def lambda_handler(event:, context:)\n  (event['number'].to_i + 1).to_s\nend\n",
    )
    .expect("write handler");
    std::fs::write(
        dir.join("lambda_function_updated.rb"),
        "def lambda_handler(event:, context:)\n  'updated'\nend\n",
    )
    .expect("write updated handler");
}

#[derive(Default)]
struct IdentityState {
    roles: HashMap<String, RoleRecord>,
    attached: HashMap<String, Vec<String>>,
    get_role_calls: u32,
    calls: Vec<String>,
    failures: HashMap<&'static str, ServiceError>,
}

/// In-memory IAM. A new role only becomes visible to `get_role` after
/// `polls_until_visible` lookups.
#[derive(Default)]
pub struct FakeIdentity {
    state: Mutex<IdentityState>,
    polls_until_visible: u32,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_after(polls: u32) -> Self {
        Self {
            polls_until_visible: polls,
            ..Self::default()
        }
    }

    pub fn fail(&self, operation: &'static str, error: ServiceError) {
        self.state
            .lock()
            .expect("poisoned mutex")
            .failures
            .insert(operation, error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("poisoned mutex").calls.clone()
    }

    pub fn attached_policies(&self, role_name: &str) -> Vec<String> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .attached
            .get(role_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn role_exists(&self, role_name: &str) -> bool {
        self.state
            .lock()
            .expect("poisoned mutex")
            .roles
            .contains_key(role_name)
    }

    fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, IdentityState>, ServiceError> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(operation.to_string());
        if let Some(error) = state.failures.get(operation).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

fn no_such_entity(role_name: &str) -> ServiceError {
    ServiceError::from_code(
        "NoSuchEntity",
        format!("The role with name {role_name} cannot be found."),
    )
}

impl IdentityService for FakeIdentity {
    async fn create_role(
        &self,
        role_name: &str,
        assume_role_policy_document: &str,
    ) -> Result<RoleRecord, ServiceError> {
        let mut state = self.enter("create_role")?;
        if state.roles.contains_key(role_name) {
            return Err(ServiceError::from_code(
                "EntityAlreadyExists",
                format!("Role with name {role_name} already exists."),
            ));
        }
        let role = RoleRecord {
            role_name: role_name.to_string(),
            arn: format!("arn:aws:iam::123456789012:role/{role_name}"),
            assume_role_policy_document: Some(assume_role_policy_document.to_string()),
        };
        state.roles.insert(role_name.to_string(), role.clone());
        Ok(role)
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("attach_role_policy")?;
        if !state.roles.contains_key(role_name) {
            return Err(no_such_entity(role_name));
        }
        state
            .attached
            .entry(role_name.to_string())
            .or_default()
            .push(policy_arn.to_string());
        Ok(())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("detach_role_policy")?;
        let Some(policies) = state.attached.get_mut(role_name) else {
            return Err(no_such_entity(role_name));
        };
        policies.retain(|attached| attached != policy_arn);
        Ok(())
    }

    async fn get_role(&self, role_name: &str) -> Result<RoleRecord, ServiceError> {
        let mut state = self.enter("get_role")?;
        state.get_role_calls += 1;
        if state.get_role_calls <= self.polls_until_visible {
            return Err(no_such_entity(role_name));
        }
        state
            .roles
            .get(role_name)
            .cloned()
            .ok_or_else(|| no_such_entity(role_name))
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("delete_role")?;
        state.attached.remove(role_name);
        state
            .roles
            .remove(role_name)
            .map(|_| ())
            .ok_or_else(|| no_such_entity(role_name))
    }
}

struct StoredFunction {
    record: FunctionRecord,
    environment: BTreeMap<String, String>,
    code: Vec<u8>,
    polls_remaining: u32,
}

#[derive(Default)]
struct FunctionsState {
    functions: HashMap<String, StoredFunction>,
    calls: Vec<String>,
    failures: HashMap<&'static str, ServiceError>,
}

/// In-memory Lambda. New functions stay `Pending` and updates stay
/// `InProgress` for `polls_until_settled` lookups, then settle on
/// `settled_state` / `settled_update`.
pub struct FakeFunctions {
    state: Mutex<FunctionsState>,
    polls_until_settled: u32,
    settled_state: FunctionPhase,
    settled_update: UpdatePhase,
}

impl Default for FakeFunctions {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            polls_until_settled: 0,
            settled_state: FunctionPhase::Active,
            settled_update: UpdatePhase::Successful,
        }
    }
}

impl FakeFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settles_after(polls: u32) -> Self {
        Self {
            polls_until_settled: polls,
            ..Self::default()
        }
    }

    pub fn never_settles() -> Self {
        Self::settles_after(u32::MAX)
    }

    pub fn settling_on(state: FunctionPhase, update: UpdatePhase) -> Self {
        Self {
            settled_state: state,
            settled_update: update,
            ..Self::default()
        }
    }

    pub fn fail(&self, operation: &'static str, error: ServiceError) {
        self.state
            .lock()
            .expect("poisoned mutex")
            .failures
            .insert(operation, error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().expect("poisoned mutex").calls.clone()
    }

    pub fn code_of(&self, function_name: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .functions
            .get(function_name)
            .map(|stored| stored.code.clone())
    }

    pub fn environment_of(&self, function_name: &str) -> Option<BTreeMap<String, String>> {
        self.state
            .lock()
            .expect("poisoned mutex")
            .functions
            .get(function_name)
            .map(|stored| stored.environment.clone())
    }

    pub fn exists(&self, function_name: &str) -> bool {
        self.state
            .lock()
            .expect("poisoned mutex")
            .functions
            .contains_key(function_name)
    }

    fn enter(&self, operation: &'static str) -> Result<std::sync::MutexGuard<'_, FunctionsState>, ServiceError> {
        let mut state = self.state.lock().expect("poisoned mutex");
        state.calls.push(operation.to_string());
        if let Some(error) = state.failures.get(operation).cloned() {
            return Err(error);
        }
        Ok(state)
    }

    fn begin_update(&self, stored: &mut StoredFunction) {
        stored.polls_remaining = self.polls_until_settled;
        stored.record.last_update_status = Some(UpdatePhase::InProgress);
    }
}

fn function_not_found(function_name: &str) -> ServiceError {
    ServiceError::from_code(
        "ResourceNotFoundException",
        format!("Function not found: {function_name}"),
    )
}

impl FunctionService for FakeFunctions {
    async fn create_function(
        &self,
        blueprint: &FunctionBlueprint,
        zip_file: &[u8],
    ) -> Result<FunctionRecord, ServiceError> {
        let mut state = self.enter("create_function")?;
        if state.functions.contains_key(&blueprint.function_name) {
            return Err(ServiceError::from_code(
                "ResourceConflictException",
                format!("Function already exist: {}", blueprint.function_name),
            ));
        }
        let record = FunctionRecord {
            function_arn: Some(format!(
                "arn:aws:lambda:us-east-1:123456789012:function:{}",
                blueprint.function_name
            )),
            runtime: Some(blueprint.runtime.clone()),
            handler: Some(blueprint.handler.clone()),
            state: Some(FunctionPhase::Pending),
            ..FunctionRecord::named(&blueprint.function_name)
        };
        state.functions.insert(
            blueprint.function_name.clone(),
            StoredFunction {
                record: record.clone(),
                environment: blueprint.environment.clone(),
                code: zip_file.to_vec(),
                polls_remaining: self.polls_until_settled,
            },
        );
        Ok(record)
    }

    async fn get_function(&self, function_name: &str) -> Result<FunctionRecord, ServiceError> {
        let mut state = self.enter("get_function")?;
        let stored = state
            .functions
            .get_mut(function_name)
            .ok_or_else(|| function_not_found(function_name))?;
        if stored.polls_remaining > 0 {
            stored.polls_remaining -= 1;
        } else {
            stored.record.state = Some(self.settled_state.clone());
            if stored.record.last_update_status.is_some() {
                stored.record.last_update_status = Some(self.settled_update.clone());
            }
            if self.settled_state == FunctionPhase::Failed {
                stored.record.state_reason = Some("The role defined for the function cannot be assumed by Lambda.".to_string());
            }
            if self.settled_update == UpdatePhase::Failed {
                stored.record.last_update_status_reason = Some("Deployment package is invalid.".to_string());
            }
        }
        Ok(stored.record.clone())
    }

    async fn update_function_code(
        &self,
        function_name: &str,
        zip_file: &[u8],
    ) -> Result<FunctionRecord, ServiceError> {
        let mut state = self.enter("update_function_code")?;
        let stored = state
            .functions
            .get_mut(function_name)
            .ok_or_else(|| function_not_found(function_name))?;
        stored.code = zip_file.to_vec();
        self.begin_update(stored);
        Ok(stored.record.clone())
    }

    async fn update_function_environment(
        &self,
        function_name: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<FunctionRecord, ServiceError> {
        let mut state = self.enter("update_function_environment")?;
        let stored = state
            .functions
            .get_mut(function_name)
            .ok_or_else(|| function_not_found(function_name))?;
        stored.environment = variables.clone();
        self.begin_update(stored);
        Ok(stored.record.clone())
    }

    async fn invoke(&self, function_name: &str, payload: &[u8]) -> Result<InvocationRecord, ServiceError> {
        let state = self.enter("invoke")?;
        let stored = state
            .functions
            .get(function_name)
            .ok_or_else(|| function_not_found(function_name))?;
        let level = HandlerLogLevel::from_env_value(
            stored.environment.get(LOG_LEVEL_VARIABLE).map(String::as_str),
        );
        let event: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|error| ServiceError::from_code("InvalidRequestContentException", error.to_string()))?;

        let mut log = vec!["START RequestId: 00000000-test".to_string()];
        if level == HandlerLogLevel::Debug {
            log.push("DEBUG This is a debug log message.".to_string());
        }
        let record = match handle_event(&event) {
            Ok(reply) => {
                if level != HandlerLogLevel::Error {
                    log.push(format!("INFO {}", reply.summary));
                }
                InvocationRecord {
                    status_code: 200,
                    payload: serde_json::to_string(&reply.result).expect("string serializes"),
                    function_error: None,
                    log_tail: None,
                }
            }
            Err(error) => {
                log.push(format!("ERROR {error}"));
                InvocationRecord {
                    status_code: 200,
                    payload: serde_json::json!({ "errorMessage": error.to_string() }).to_string(),
                    function_error: Some("Unhandled".to_string()),
                    log_tail: None,
                }
            }
        };
        log.push("END RequestId: 00000000-test".to_string());
        Ok(InvocationRecord {
            log_tail: Some(log.join("\n")),
            ..record
        })
    }

    async fn delete_function(&self, function_name: &str) -> Result<(), ServiceError> {
        let mut state = self.enter("delete_function")?;
        state
            .functions
            .remove(function_name)
            .map(|_| ())
            .ok_or_else(|| function_not_found(function_name))
    }
}
