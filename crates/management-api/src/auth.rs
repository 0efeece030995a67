//! Authentication middleware in front of every management route.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use spi::AuthenticationService;
use tracing::debug;

use crate::ApiError;

/// Rejects requests the [`AuthenticationService`] does not accept with
/// `401 Unauthorized`.
pub async fn authenticate(
    State(auth): State<Arc<dyn AuthenticationService>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = header_map(request.headers());
    if !auth.is_authenticated(&headers) {
        debug!(
            method = %request.method(),
            uri = %request.uri(),
            "Rejected unauthenticated request"
        );
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

/// Lower-cased header names to every value sent under them. Values that are
/// not valid UTF-8 are skipped.
fn header_map(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.as_str().to_ascii_lowercase())
                .or_default()
                .push(value.to_owned());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn repeated_headers_keep_every_value() {
        let mut headers = HeaderMap::new();
        headers.append("X-Api-Key", HeaderValue::from_static("one"));
        headers.append("x-api-key", HeaderValue::from_static("two"));

        let map = header_map(&headers);
        assert_eq!(map["x-api-key"], vec!["one", "two"]);
    }
}
