//! Request routing for the `/api` surface.
//!
//! The router is generic over the request body so that it can be driven by
//! hyper's `Incoming` in the server and by `Full<Bytes>` in tests.

use super::responses::{error_response, json_response, not_found_response, preflight_response};
use crate::application::Platform;
use crate::application::accounts::Registration;
use crate::application::booking::BookingRequest;
use crate::application::contact::ContactMessage;
use crate::application::dispatch::OrderRequest;
use crate::application::ledger::DEFAULT_LEADERBOARD_SIZE;
use crate::domain::access::Caller;
use crate::domain::ids::{AttractionId, BookingId, OrderId, RegionId, ReviewId, SubmissionId, TaskId};
use crate::domain::review::ModerationAction;
use crate::error::{ErrorKind, Result, WorkflowError};
use crate::infrastructure::token::bearer_token;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::header::AUTHORIZATION;
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::error::Error as StdError;
use tracing::{debug, error, warn};

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

type ApiResponse = Result<Response<Full<Bytes>>>;

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct ReviewBody {
    rating: i64,
    comment: String,
}

#[derive(Deserialize)]
struct TaskProof {
    task_id: TaskId,
    #[serde(alias = "image_base64")]
    image: String,
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<usize>,
}

/// One request on its way through the router.
struct ApiRequest<B> {
    parts: Parts,
    body: B,
}

impl<B> ApiRequest<B>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    fn token(&self) -> Result<String> {
        let header = self
            .parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        bearer_token(header)
            .map(str::to_string)
            .ok_or_else(|| WorkflowError::Unauthorized("missing bearer token".to_string()))
    }

    async fn bytes(self) -> Result<Bytes> {
        Limited::new(self.body, MAX_BODY_BYTES)
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| WorkflowError::ValidationError(format!("unreadable request body: {e}")))
    }

    async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WorkflowError::ValidationError(format!("invalid request body: {e}")))
    }

    /// JSON body, or the query string when the body is empty or `{}`.
    async fn json_or_query<T: DeserializeOwned>(self) -> Result<T> {
        let query = self.parts.uri.query().unwrap_or_default().to_string();
        let bytes = self.bytes().await?;
        if is_blank_json(&bytes) {
            serde_urlencoded::from_str(&query)
                .map_err(|e| WorkflowError::ValidationError(format!("invalid query: {e}")))
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| WorkflowError::ValidationError(format!("invalid request body: {e}")))
        }
    }

    fn query<T: DeserializeOwned>(&self) -> Result<T> {
        serde_urlencoded::from_str(self.parts.uri.query().unwrap_or_default())
            .map_err(|e| WorkflowError::ValidationError(format!("invalid query: {e}")))
    }
}

fn is_blank_json(bytes: &[u8]) -> bool {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return true;
    }
    matches!(
        serde_json::from_slice::<serde_json::Value>(bytes),
        Ok(serde_json::Value::Object(map)) if map.is_empty()
    )
}

fn ok<T: serde::Serialize + ?Sized>(value: &T) -> ApiResponse {
    Ok(json_response(StatusCode::OK, value))
}

fn created<T: serde::Serialize + ?Sized>(value: &T) -> ApiResponse {
    Ok(json_response(StatusCode::CREATED, value))
}

fn moderation(action: &str) -> Result<ModerationAction> {
    match action {
        "approve" => Ok(ModerationAction::Approve),
        "reject" => Ok(ModerationAction::Reject),
        other => Err(WorkflowError::ValidationError(format!(
            "unknown moderation action '{other}'"
        ))),
    }
}

/// Entry point: never fails, every error becomes a JSON error response.
pub async fn handle<B>(platform: &Platform, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%method, %path, "request");

    match route(platform, req).await {
        Ok(response) => response,
        Err(e) => {
            match e.kind() {
                ErrorKind::Internal | ErrorKind::Integrity => {
                    error!(%method, %path, code = e.code(), "request failed: {e}")
                }
                _ => warn!(%method, %path, code = e.code(), "request rejected: {e}"),
            }
            error_response(&e)
        }
    }
}

async fn route<B>(platform: &Platform, req: Request<B>) -> ApiResponse
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let request = ApiRequest { parts, body };

    match (&method, segments.as_slice()) {
        (&Method::GET, ["health"] | ["api", "health"]) => ok(&json!({ "status": "ok" })),
        (&Method::POST, ["api", "auth", "register"]) => {
            let registration: Registration = request.json().await?;
            created(&platform.accounts.register(registration).await?)
        }
        (&Method::POST, ["api", "auth", "login"]) => {
            let credentials: Credentials = request.json().await?;
            ok(&platform.accounts.login(&credentials.email, &credentials.password).await?)
        }
        (&Method::POST, ["api", "contact", "send"]) => {
            let message: ContactMessage = request.json_or_query().await?;
            created(&platform.contact.send(message).await?)
        }
        (_, ["api", ..]) => {
            let token = request.token()?;
            let caller = platform.accounts.authenticate(&token).await?;
            authenticated(platform, &method, &segments, &caller, request).await
        }
        _ => Ok(not_found_response(&path)),
    }
}

async fn authenticated<B>(
    platform: &Platform,
    method: &Method,
    segments: &[&str],
    caller: &Caller,
    request: ApiRequest<B>,
) -> ApiResponse
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match (method, segments) {
        (&Method::GET, ["api", "auth", "me"]) => ok(&platform.accounts.me(caller).await?),

        // Catalog
        (&Method::GET, ["api", "regions"]) => ok(&platform.catalog.regions(caller).await?),
        (&Method::GET, ["api", "regions", region, "attractions"]) => {
            ok(&platform.catalog.attractions(caller, &RegionId::from(*region)).await?)
        }
        (&Method::GET, ["api", "attractions", id]) => {
            ok(&platform.catalog.attraction(caller, &AttractionId::from(*id)).await?)
        }
        (&Method::GET, ["api", "hotels", region]) => {
            ok(&platform.catalog.hotels(caller, &RegionId::from(*region)).await?)
        }
        (&Method::GET, ["api", "charging-stations"]) => ok(&platform.catalog.stations(caller).await?),

        // Reviews
        (&Method::GET, ["api", "attractions", id, "reviews"]) => {
            ok(&platform.reviews.for_attraction(caller, &AttractionId::from(*id)).await?)
        }
        (&Method::POST, ["api", "attractions", id, "reviews"]) => {
            let body: ReviewBody = request.json().await?;
            let review = platform
                .reviews
                .submit(caller, &AttractionId::from(*id), body.rating, &body.comment)
                .await?;
            created(&review)
        }
        (&Method::GET, ["api", "admin", "reviews"]) => ok(&platform.reviews.queue(caller).await?),
        (&Method::POST, ["api", "admin", "reviews", id, action]) => {
            let action = moderation(action)?;
            ok(&platform.reviews.resolve(caller, &ReviewId::from(*id), action).await?)
        }

        // Bookings
        (&Method::POST, ["api", "hotels", "book"]) => {
            let booking: BookingRequest = request.json_or_query().await?;
            created(&platform.bookings.book(caller, booking).await?)
        }
        (&Method::GET, ["api", "bookings"]) => ok(&platform.bookings.bookings(caller).await?),
        (&Method::POST, ["api", "bookings", id, "cancel"]) => {
            ok(&platform.bookings.cancel(caller, &BookingId::from(*id)).await?)
        }

        // Tasks
        (&Method::GET, ["api", "tasks"]) => ok(&platform.tasks.tasks(caller).await?),
        (&Method::POST, ["api", "tasks", "submit"]) => {
            let proof: TaskProof = request.json().await?;
            created(&platform.tasks.submit(caller, &proof.task_id, &proof.image).await?)
        }
        (&Method::GET, ["api", "tasks", "submissions"]) => ok(&platform.tasks.submissions(caller).await?),
        (&Method::GET, ["api", "admin", "submissions"]) => ok(&platform.tasks.pending(caller).await?),
        (&Method::POST, ["api", "admin", "submissions", id, "approve"]) => {
            ok(&platform.tasks.approve(caller, &SubmissionId::from(*id)).await?)
        }
        (&Method::POST, ["api", "admin", "submissions", id, "reject"]) => {
            ok(&platform.tasks.reject(caller, &SubmissionId::from(*id)).await?)
        }

        // Ledger
        (&Method::GET, ["api", "ecocoins", "balance"]) => {
            let balance = platform.ledger.balance(caller, &caller.account_id).await?;
            ok(&json!({ "balance": balance }))
        }
        (&Method::GET, ["api", "ecocoins", "transactions"]) => {
            ok(&platform.ledger.history(caller, &caller.account_id).await?)
        }
        (&Method::GET, ["api", "ecocoins", "leaderboard"]) => {
            let query: LeaderboardQuery = request.query()?;
            let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_SIZE);
            ok(&platform.ledger.leaderboard(caller, limit).await?)
        }
        (&Method::GET, ["api", "admin", "ledger", "audit"]) => ok(&platform.ledger.audit(caller).await?),

        // Dispatch
        (&Method::POST, ["api", "taxi", "order"]) => {
            let order: OrderRequest = request.json().await?;
            created(&platform.dispatch.order(caller, &order).await?)
        }
        (&Method::GET, ["api", "taxi", "orders"]) => ok(&platform.dispatch.orders(caller).await?),
        (&Method::POST, ["api", "taxi", "accept", id]) => {
            ok(&platform.dispatch.accept(caller, &OrderId::from(*id)).await?)
        }
        (&Method::POST, ["api", "taxi", "complete", id]) => {
            ok(&platform.dispatch.complete(caller, &OrderId::from(*id)).await?)
        }
        (&Method::POST, ["api", "taxi", "cancel", id]) => {
            ok(&platform.dispatch.cancel(caller, &OrderId::from(*id)).await?)
        }

        (&Method::GET, ["api", "admin", "stats"]) => ok(&platform.stats.snapshot(caller).await?),
        (&Method::GET, ["api", "admin", "contact"]) => ok(&platform.contact.inbox(caller).await?),

        _ => Ok(not_found_response(request.parts.uri.path())),
    }
}
