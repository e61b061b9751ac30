use crate::tracing::{scope_request_id, RequestId};
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_CALLER_ID_LEN: usize = 128;

/// Accepts a caller-supplied id only if it is short printable ASCII.
fn caller_request_id(request: &Request) -> Option<RequestId> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let usable = !raw.is_empty()
        && raw.len() <= MAX_CALLER_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| RequestId::new(raw))
}

/// Tags the request with an id, exposes it to handlers and echoes it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = caller_request_id(&request).unwrap_or_default();
    let header = HeaderName::from_static(REQUEST_ID_HEADER);

    // ids are printable ASCII at this point
    let value = HeaderValue::from_str(request_id.as_str()).ok();
    if let Some(value) = &value {
        request.headers_mut().insert(header.clone(), value.clone());
    }
    request.extensions_mut().insert(request_id.clone());

    let mut response = scope_request_id(request_id, next.run(request)).await;
    if let Some(value) = value {
        response.headers_mut().insert(header, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::Request as HttpRequest,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<RequestId>| async move { id.to_string() }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn call(header: Option<&str>) -> (Option<String>, String) {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(REQUEST_ID_HEADER, h);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let echoed = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn generated_id_is_echoed_and_visible_to_handlers() {
        let (echoed, seen) = call(None).await;
        assert_eq!(echoed.as_deref(), Some(seen.as_str()));
        assert_eq!(seen.len(), 36);
    }

    #[tokio::test]
    async fn caller_id_is_kept() {
        let (echoed, seen) = call(Some("portal-42")).await;
        assert_eq!(echoed.as_deref(), Some("portal-42"));
        assert_eq!(seen, "portal-42");
    }

    #[tokio::test]
    async fn oversized_caller_id_is_replaced() {
        let long = "x".repeat(MAX_CALLER_ID_LEN + 1);
        let (echoed, seen) = call(Some(&long)).await;
        assert_ne!(seen, long);
        assert_eq!(echoed.as_deref(), Some(seen.as_str()));
    }
}
