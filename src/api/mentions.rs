//! Webmention and pingback endpoints
//!
//! - POST /api/webmention - `application/x-www-form-urlencoded` source/target
//! - POST /api/pingback - XML-RPC `pingback.ping`
//! - /api/admin/mentions - List, delete, clear

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::api::common::{AffectedResponse, IdsRequest, ListResponse, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, ClientInfo};
use crate::models::{Mention, MentionWorker};
use crate::services::mention::xmlrpc;
use crate::services::MentionServiceError;

/// XML-RPC fault for a request that is not a `pingback.ping` call
const FAULT_PARSE_ERROR: i32 = -32700;

#[derive(Debug, Deserialize)]
pub struct WebmentionForm {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

/// Public receivers, merged at the API root
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webmention", post(receive_webmention))
        .route("/pingback", post(receive_pingback))
}

/// Admin routes, nested under `/admin/mentions`
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mentions).delete(delete_mentions))
        .route("/all", delete(clear_mentions))
}

/// POST /api/webmention
///
/// A mention already on record is accepted again without a new entry.
async fn receive_webmention(
    State(state): State<AppState>,
    client: ClientInfo,
    Form(form): Form<WebmentionForm>,
) -> Result<StatusCode, ApiError> {
    if form.source.trim().is_empty() || form.target.trim().is_empty() {
        return Err(ApiError::validation_error("Both source and target are required"));
    }

    match state
        .mentions
        .receive(&form.source, &form.target, MentionWorker::Webmention, client.ip.as_deref())
        .await
    {
        Ok(_) | Err(MentionServiceError::Duplicate(_)) => Ok(StatusCode::ACCEPTED),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/pingback
///
/// Faults are delivered in the XML-RPC body with a 200 status.
async fn receive_pingback(State(state): State<AppState>, client: ClientInfo, body: String) -> Response {
    let xml = match xmlrpc::parse_pingback_request(&body) {
        Some((source, target)) => match state
            .mentions
            .receive(&source, &target, MentionWorker::Pingback, client.ip.as_deref())
            .await
        {
            Ok(mention) => xmlrpc::success_response(&format!(
                "Pingback from {} to {} registered",
                mention.source_url, target
            )),
            Err(MentionServiceError::InternalError(e)) => {
                tracing::error!("Failed to process pingback: {:#}", e);
                xmlrpc::fault_response(0, "Internal error")
            }
            Err(e) => xmlrpc::fault_response(e.fault_code(), &e.to_string()),
        },
        None => xmlrpc::fault_response(FAULT_PARSE_ERROR, "Invalid pingback request"),
    };

    ([(header::CONTENT_TYPE, "text/xml; charset=utf-8")], xml).into_response()
}

/// GET /api/admin/mentions
async fn list_mentions(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Mention>>, ApiError> {
    let result = state.mentions.list(&query.params(20)).await?;
    Ok(Json(result.into()))
}

/// DELETE /api/admin/mentions
async fn delete_mentions(
    State(state): State<AppState>,
    Json(body): Json<IdsRequest>,
) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state.mentions.delete(&body.ids).await?;
    Ok(Json(AffectedResponse { affected }))
}

/// DELETE /api/admin/mentions/all
async fn clear_mentions(State(state): State<AppState>) -> Result<Json<AffectedResponse>, ApiError> {
    let affected = state.mentions.clear().await?;
    Ok(Json(AffectedResponse { affected }))
}
