use lambda_basics_aws::runtime::contract::LOG_LEVEL_VARIABLE;
use lambda_basics_aws::runtime::handler::{handle_event, HandlerLogLevel};
use lambda_basics_aws::telemetry::init_handler_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<String, Error> {
    tracing::debug!("This is a debug log message.");
    tracing::info!("This is an info log message. Code executed successfully!");

    let reply = handle_event(&event.payload).map_err(|error| {
        tracing::error!(error = %error, "rejected event");
        Error::from(error.to_string())
    })?;
    tracing::info!("{}", reply.summary);
    Ok(reply.result)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let level = HandlerLogLevel::from_env_value(std::env::var(LOG_LEVEL_VARIABLE).ok().as_deref());
    init_handler_tracing(level);
    lambda_runtime::run(service_fn(handle_request)).await
}
