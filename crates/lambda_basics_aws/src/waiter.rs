use std::future::Future;
use std::time::Duration;

use lambda_basics_core::error::{ProvisionError, ServiceError};
use lambda_basics_core::waiter::WaitPolicy;
use tokio_util::sync::CancellationToken;

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    /// Not there yet; the string describes the observed state.
    Pending(String),
    /// The resource reached a state it will not leave on its own.
    Failed { state: String, reason: String },
}

/// Identifies the wait in errors and log lines.
#[derive(Debug, Clone, Copy)]
pub struct WaitTarget<'a> {
    pub operation: &'static str,
    pub resource: &'a str,
}

/// Polls `probe` until it reports ready, a terminal failure, or the policy's
/// attempt budget runs out. Probe errors end the wait immediately.
pub async fn wait_until<T, F, Fut>(
    policy: &WaitPolicy,
    cancel: &CancellationToken,
    target: WaitTarget<'_>,
    mut probe: F,
) -> Result<T, ProvisionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, ServiceError>>,
{
    tracing::debug!(
        operation = target.operation,
        resource = target.resource,
        max_attempts = policy.max_attempts,
        max_wait_secs = policy.max_wait().as_secs(),
        "waiting"
    );
    let mut last_observed = String::from("none");
    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(cancelled(target));
        }

        match probe().await {
            Ok(Probe::Ready(value)) => {
                tracing::debug!(
                    operation = target.operation,
                    resource = target.resource,
                    attempt,
                    "wait satisfied"
                );
                return Ok(value);
            }
            Ok(Probe::Pending(observed)) => {
                tracing::debug!(
                    operation = target.operation,
                    resource = target.resource,
                    attempt,
                    state = %observed,
                    "still waiting"
                );
                last_observed = observed;
            }
            Ok(Probe::Failed { state, reason }) => {
                tracing::error!(
                    operation = target.operation,
                    resource = target.resource,
                    state = %state,
                    reason = %reason,
                    "resource entered a failed state"
                );
                return Err(ProvisionError::TerminalState {
                    operation: target.operation,
                    resource: target.resource.to_string(),
                    state,
                    reason,
                });
            }
            Err(error) => {
                tracing::error!(
                    operation = target.operation,
                    resource = target.resource,
                    error = %error,
                    "wait probe failed"
                );
                return Err(ProvisionError::from_service(
                    target.operation,
                    target.resource,
                    error,
                ));
            }
        }

        if attempt < policy.max_attempts {
            let delay = policy.next_delay(&mut rand::thread_rng());
            pause(cancel, delay, target).await?;
        }
    }

    tracing::error!(
        operation = target.operation,
        resource = target.resource,
        attempts = policy.max_attempts,
        state = %last_observed,
        "gave up waiting"
    );
    Err(ProvisionError::TimedOut {
        operation: target.operation,
        resource: target.resource.to_string(),
        attempts: policy.max_attempts,
        last_observed,
    })
}

/// Sleeps for `duration` unless `cancel` fires first.
pub async fn pause(
    cancel: &CancellationToken,
    duration: Duration,
    target: WaitTarget<'_>,
) -> Result<(), ProvisionError> {
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(cancelled(target)),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

fn cancelled(target: WaitTarget<'_>) -> ProvisionError {
    tracing::warn!(
        operation = target.operation,
        resource = target.resource,
        "wait cancelled"
    );
    ProvisionError::Cancelled {
        operation: target.operation,
        resource: target.resource.to_string(),
    }
}
