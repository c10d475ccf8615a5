use axum::{extract::Request, http::Method, Router};
use tower_http::trace::{
    DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, OnFailure, OnRequest, OnResponse,
    TraceLayer,
};
use tracing::{Level, Span};

// Clients poll OPTIONS constantly. Only log it when it fails.
const TRACING_QUIET_METHODS: [Method; 1] = [Method::OPTIONS];

pub fn with_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request| {
                let user = request
                    .headers()
                    .get(crate::dav_server::AUTHENTICATED_USER_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string();

                if TRACING_QUIET_METHODS.contains(request.method()) {
                    tracing::span!(
                        Level::INFO,
                        "request",
                        method = %request.method(),
                        uri = ?request.uri(),
                        user = %user,
                        quiet = true
                    )
                } else {
                    tracing::span!(
                        Level::INFO,
                        "request",
                        method = %request.method(),
                        uri = ?request.uri(),
                        user = %user,
                    )
                }
            })
            .on_request(|request: &Request, span: &Span| {
                if span.has_field("quiet") {
                    return;
                }
                DefaultOnRequest::new().on_request(request, span);
            })
            .on_response(
                |response: &axum::response::Response, latency: std::time::Duration, span: &Span| {
                    if span.has_field("quiet") && response.status().is_success() {
                        return;
                    }
                    DefaultOnResponse::new().on_response(response, latency, span);
                },
            )
            .on_failure(
                |error: tower_http::classify::ServerErrorsFailureClass,
                 latency: std::time::Duration,
                 span: &Span| {
                    DefaultOnFailure::new().on_failure(error, latency, span);
                },
            ),
    )
}
