use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use metrics::counter;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::auth::Identity;
use crate::application::error::ErrorReport;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_INBOUND_REQUEST_ID: usize = 64;

/// Per-request correlation data, available to handlers via extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Reuse a sane inbound `x-request-id`, otherwise mint a fresh one.
    fn from_request(request: &Request<Body>) -> Self {
        let inbound = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| {
                !value.is_empty()
                    && value.len() <= MAX_INBOUND_REQUEST_ID
                    && value
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            });
        Self {
            request_id: inbound
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Everything worth logging about a request that ended in 4xx/5xx.
struct FailedRequest {
    status: StatusCode,
    method: Method,
    uri: Uri,
    elapsed_ms: u128,
    request_id: String,
    user_id: Option<i64>,
    report: Option<ErrorReport>,
}

impl FailedRequest {
    fn emit(self) {
        let server_side = self.status.is_server_error();
        counter!(
            "audiochan_http_failed_requests_total",
            "class" => if server_side { "5xx" } else { "4xx" }
        )
        .increment(1);

        let (source, chain) = match self.report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = chain.first().map(String::as_str).unwrap_or("-");
        let user_id = self.user_id.map(|id| id.to_string()).unwrap_or_default();

        if server_side {
            error!(
                target: "audiochan::http",
                status = self.status.as_u16(),
                method = %self.method,
                path = self.uri.path(),
                query = self.uri.query().unwrap_or(""),
                elapsed_ms = self.elapsed_ms,
                source,
                detail,
                chain = ?chain,
                request_id = %self.request_id,
                user_id = %user_id,
                "request failed"
            );
        } else {
            warn!(
                target: "audiochan::http",
                status = self.status.as_u16(),
                method = %self.method,
                path = self.uri.path(),
                source,
                detail,
                request_id = %self.request_id,
                user_id = %user_id,
                "request rejected"
            );
        }
    }
}

/// Logs and counts failed requests using the [`ErrorReport`] the handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    FailedRequest {
        status,
        method,
        uri,
        elapsed_ms: start.elapsed().as_millis(),
        request_id,
        user_id: response
            .extensions()
            .get::<Identity>()
            .map(|identity| identity.user_id),
        report: response.extensions_mut().remove::<ErrorReport>(),
    }
    .emit();

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(id: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/audios");
        if let Some(id) = id {
            builder = builder.header("x-request-id", id);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn inbound_request_ids_are_reused() {
        let ctx = RequestContext::from_request(&request_with(Some("edge-42")));
        assert_eq!(ctx.request_id, "edge-42");
    }

    #[test]
    fn unusable_request_ids_are_replaced() {
        let too_long = "x".repeat(65);
        for id in ["", "has spaces", too_long.as_str()] {
            let ctx = RequestContext::from_request(&request_with(Some(id)));
            assert_ne!(ctx.request_id, id);
            assert!(Uuid::parse_str(&ctx.request_id).is_ok());
        }
        let ctx = RequestContext::from_request(&request_with(None));
        assert!(Uuid::parse_str(&ctx.request_id).is_ok());
    }
}
