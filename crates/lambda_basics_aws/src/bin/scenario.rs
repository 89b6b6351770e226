//! Walks through the full Lambda lifecycle against a live AWS account:
//! role → package → create → invoke → update → invoke → reconfigure → teardown.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lambda_basics_aws::adapters::{AwsFunctionService, AwsIdentityService};
use lambda_basics_aws::cleanup::CreatedResources;
use lambda_basics_aws::runtime::config::OrchestratorConfig;
use lambda_basics_aws::runtime::contract::DEFAULT_HANDLER;
use lambda_basics_aws::runtime::error::ProvisionError;
use lambda_basics_aws::runtime::package::PackageLayout;
use lambda_basics_aws::runtime::policy::role_name_for;
use lambda_basics_aws::telemetry::init_tracing;
use lambda_basics_aws::ResourceOrchestrator;
use rand::Rng;
use serde_json::json;
use tokio_util::sync::CancellationToken;

type AwsOrchestrator = ResourceOrchestrator<AwsIdentityService, AwsFunctionService>;

#[derive(Parser)]
#[command(
    name = "scenario",
    about = "Create, invoke, update and delete a Lambda function with its IAM role"
)]
struct Cli {
    /// Base name for the function; a random suffix is appended
    #[arg(long, default_value = "lambda-function")]
    name_prefix: String,
    /// TOML config file (defaults to LAMBDA_BASICS_CONFIG or ./lambda_basics.toml)
    #[arg(long, env = "LAMBDA_BASICS_CONFIG")]
    config: Option<PathBuf>,
    /// Deploy the native `bootstrap` handler from this directory on `provided.al2023`
    #[arg(long)]
    native_handler: Option<PathBuf>,
    /// Leave the function and role in place when the scenario ends
    #[arg(long)]
    keep_resources: bool,
    /// Do not wait for confirmation before touching the account
    #[arg(long, short)]
    yes: bool,
}

fn step(number: u32, title: &str) {
    eprintln!("\n=== STEP {number} === {title}");
}

fn confirm_begin() -> bool {
    eprint!("Press Enter to continue (Ctrl-D to abort). ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    matches!(std::io::stdin().lock().read_line(&mut line), Ok(read) if read > 0)
}

fn load_config(cli: &Cli) -> Result<OrchestratorConfig, String> {
    let env = lambda_basics_aws::runtime::config::StdEnvSource;
    let mut config = OrchestratorConfig::load_with(cli.config.as_deref(), &env)
        .map_err(|error| format!("failed to load configuration: {error}"))?;
    if let Some(dir) = &cli.native_handler {
        config.package = PackageLayout::bootstrap(dir);
        config.function.runtime = "provided.al2023".to_string();
    }
    Ok(config)
}

async fn run(
    orchestrator: &AwsOrchestrator,
    cli: &Cli,
    function_name: &str,
    created: &mut CreatedResources,
) -> Result<(), ProvisionError> {
    let role_name = role_name_for(function_name);
    let (source, updated_source) = if cli.native_handler.is_some() {
        ("bootstrap", "bootstrap")
    } else {
        ("lambda_function", "lambda_function_updated")
    };

    step(1, "Create an IAM role for the function");
    let outcome = orchestrator.manage_role(&role_name, "create").await;
    created.note_role(&role_name, &outcome);
    let outcome = outcome?;
    let role = outcome.role().ok_or(ProvisionError::MissingField {
        operation: "create_role",
        field: "role",
    })?;
    eprintln!("Created role {} ({})", role.role_name, role.arn);

    step(2, "Package the handler and create the function");
    let package = orchestrator.create_deployment_package(source)?;
    let function = orchestrator
        .create_function(function_name, DEFAULT_HANDLER, &role.arn, &package)
        .await;
    created.note_function(function_name, &function);
    let function = function?;
    eprintln!(
        "Function {} is {}",
        function.function_name,
        function
            .state
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string())
    );

    step(3, "Invoke the function");
    let invocation = orchestrator
        .invoke_function(function_name, &json!({ "number": 4 }))
        .await?;
    eprintln!("Incrementing 4 returned {}", invocation.payload);

    step(4, "Update the function code and verify the new behaviour");
    let updated_package = orchestrator.create_deployment_package(updated_source)?;
    orchestrator
        .update_function_code(function_name, &updated_package)
        .await?;
    let payload = json!({ "action": "product", "first_number": 4, "second_number": 4 });
    match orchestrator
        .invoke_and_verify(function_name, &payload, "The product of 4 and 4 is 16")
        .await?
    {
        Some(line) => eprintln!("Found log statement: {line}"),
        None => eprintln!("Log statement not found; is LOG_LEVEL at least info?"),
    }

    step(5, "Turn on debug logging");
    orchestrator
        .update_function_log_level(function_name, "debug")
        .await?;
    if let Some(line) = orchestrator
        .invoke_and_verify(function_name, &json!({ "number": 1 }), "debug log message")
        .await?
    {
        eprintln!("Debug output: {line}");
    }

    Ok(())
}

async fn teardown(orchestrator: &AwsOrchestrator, created: &CreatedResources) {
    step(6, "Delete the function and its role");
    for error in created.teardown(orchestrator).await {
        eprintln!("Cleanup incomplete: {error}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing("info,aws_config=warn,aws_smithy_runtime=warn");
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("This scenario creates and deletes an IAM role and a Lambda function in your account.");
    if !cli.yes && !confirm_begin() {
        return ExitCode::SUCCESS;
    }

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let orchestrator = ResourceOrchestrator::new(
        AwsIdentityService::from_conf(&aws_config),
        AwsFunctionService::from_conf(&aws_config),
        config,
    )
    .with_cancellation(cancel);

    let function_name = format!(
        "{}-{}",
        cli.name_prefix,
        rand::thread_rng().gen_range(0..10_000)
    );
    let mut created = CreatedResources::new();

    let result = run(&orchestrator, &cli, &function_name, &mut created).await;
    if let Err(error) = &result {
        eprintln!("\nScenario stopped: {error} ({:?})", error.kind());
    }

    if created.is_empty() {
        eprintln!("\nNothing was created.");
    } else if cli.keep_resources {
        eprintln!("\nLeaving resources in place as requested.");
    } else {
        teardown(&orchestrator, &created).await;
    }

    if result.is_ok() {
        eprintln!("\nScenario complete.");
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
