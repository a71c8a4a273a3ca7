use crate::error::{ErrorKind, WorkflowError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InsufficientBalance | ErrorKind::PaymentFailed => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Integrity => StatusCode::LOCKED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    category: ErrorKind,
    message: String,
}

fn with_headers(status: StatusCode, body: Bytes, json: bool) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if json {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => with_headers(status, Bytes::from(body), true),
        Err(e) => error_response(&WorkflowError::from(e)),
    }
}

/// Every failure carries its stable code, its category and a human message.
pub fn error_response(error: &WorkflowError) -> Response<Full<Bytes>> {
    let kind = error.kind();
    let message = match kind {
        // Internal details stay in the logs.
        ErrorKind::Internal => "internal server error".to_string(),
        _ => error.to_string(),
    };
    let body = ErrorBody {
        kind: error.code(),
        category: kind,
        message,
    };
    let bytes = serde_json::to_vec(&body).map(Bytes::from).unwrap_or_else(|_| {
        Bytes::from_static(br#"{"kind":"internal","category":"internal","message":"internal server error"}"#)
    });
    with_headers(status_for(kind), bytes, true)
}

pub fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = with_headers(StatusCode::NO_CONTENT, Bytes::new(), false);
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "kind": "route_not_found",
            "category": ErrorKind::NotFound,
            "message": format!("no route for {path}"),
        }),
    )
}
