//! Metrics middleware for API routes.

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response,
};
use std::time::Instant;

use crate::metrics::{
    route_label, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
///
/// Requests are labelled by route template, never by the raw URI.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = route_label(
        request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
        request.uri().path(),
    );

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    fn app() -> Router {
        let api = Router::new()
            .route("/middleware-check", get(dummy_handler))
            .route("/middleware-items/{name}", get(dummy_handler));
        Router::new()
            .nest("/api/v1", api)
            .layer(middleware::from_fn(metrics_middleware))
    }

    async fn send(app: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    fn count(path: &str, status: &str) -> u64 {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", path, status])
            .get()
    }

    #[tokio::test]
    async fn test_metrics_middleware_counts_requests() {
        let before = count("/api/v1/middleware-check", "200");

        assert_eq!(send(app(), "/api/v1/middleware-check").await, StatusCode::OK);

        assert_eq!(count("/api/v1/middleware-check", "200"), before + 1);
    }

    #[tokio::test]
    async fn test_metrics_middleware_labels_by_template() {
        let before = count("/api/v1/middleware-items/{name}", "200");

        assert_eq!(send(app(), "/api/v1/middleware-items/a").await, StatusCode::OK);
        assert_eq!(send(app(), "/api/v1/middleware-items/b").await, StatusCode::OK);

        assert_eq!(count("/api/v1/middleware-items/{name}", "200"), before + 2);
        assert_eq!(count("/api/v1/middleware-items/a", "200"), 0);
    }

    #[tokio::test]
    async fn test_metrics_middleware_collapses_unknown_paths() {
        let before = count("/{unmatched}", "404");

        let status = send(app(), "/api/v1/scanner-path-7f3a").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert!(count("/{unmatched}", "404") > before);
        assert_eq!(count("/api/v1/scanner-path-7f3a", "404"), 0);
    }
}
