use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use lambda_basics_core::error::{ServiceError, ServiceErrorKind};

/// Flattens an SDK failure into a provider-agnostic [`ServiceError`].
///
/// Modeled service errors keep their code; everything else (dispatch failure,
/// timeout, unparseable response) is `Unavailable`.
pub(crate) fn service_error<E, R>(error: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match error.as_service_error() {
        Some(service) => {
            let code = service.code().unwrap_or("Unknown").to_string();
            let message = service
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&error).to_string());
            ServiceError::from_code(code, message)
        }
        None => ServiceError::new(
            ServiceErrorKind::Unavailable,
            "Unavailable",
            DisplayErrorContext(&error).to_string(),
        ),
    }
}
