//! Shared request plumbing for the JSON endpoints.

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{FilesError, Result};

/// Execute `request` and turn transport failures and non-2xx statuses into
/// [`FilesError::Transport`].
pub(crate) async fn send(
    http: &dyn HttpClient,
    request: HttpRequest,
    policy: RetryPolicy,
    operation: &str,
) -> Result<HttpResponse> {
    let url = request.url.clone();
    let response = http
        .execute_with_retry(request, policy)
        .await
        .map_err(|e| {
            warn!(operation, url = %url, error = %e, "Request failed");
            FilesError::transport(operation, e)
        })?;

    if !response.is_success() {
        let message = response.error_message();
        warn!(operation, url = %url, status = response.status, "Server rejected request");
        return Err(FilesError::transport(operation, message));
    }

    Ok(response)
}

pub(crate) fn decode_body<T: DeserializeOwned>(response: &HttpResponse, operation: &str) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| FilesError::decode(format!("{} response: {}", operation, e)))
}
