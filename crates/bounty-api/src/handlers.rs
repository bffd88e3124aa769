//! API Handlers
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bounty_core::{Address, BountyDocument, BountyError, BountyForm, ErrorKind, MetadataResponse, SubmissionDocument};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CidQuery {
    pub cid: Option<String>,
}

impl CidQuery {
    fn require(&self) -> Option<&str> {
        self.cid.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub reward: String,
    pub deadline: String,
    pub creator_address: Option<Address>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub title: String,
    pub description: String,
    pub submitter_address: Option<Address>,
}

fn status_for(err: &BountyError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Decode | ErrorKind::Network => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(err: &BountyError) -> (StatusCode, Json<Value>) {
    (status_for(err), Json(json!({ "success": false, "error": err.to_string() })))
}

fn missing_cid() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": "CID parameter is required" })),
    )
}

/// `GET /v1/metadata?cid=`: the envelope the metadata cache consumes.
pub async fn get_metadata(State(state): State<AppState>, Query(query): Query<CidQuery>) -> (StatusCode, Json<Value>) {
    state.metrics.metadata_lookups_total.inc();
    let Some(cid) = query.require() else {
        state.metrics.metadata_failures_total.inc();
        return missing_cid();
    };

    match state.uploader.retrieve_bounty(cid).await {
        Ok(data) => {
            info!(cid, "metadata resolved");
            (StatusCode::OK, Json(json!(MetadataResponse::ok(cid, data))))
        }
        Err(err) => {
            warn!(cid, error = %err, "metadata lookup failed");
            state.metrics.metadata_failures_total.inc();
            let body = MetadataResponse::failed(format!("Failed to fetch metadata: {}", err));
            (status_for(&err), Json(json!(body)))
        }
    }
}

/// `POST /v1/upload`: wrap the form in a bounty document and store it.
pub async fn upload_bounty(State(state): State<AppState>, Json(req): Json<UploadRequest>) -> (StatusCode, Json<Value>) {
    let form = BountyForm {
        title: req.title,
        description: req.description,
        reward: req.reward,
        deadline: req.deadline,
        tags: req.tags,
    };
    let document = BountyDocument::from_form(
        &form,
        req.creator_address.as_ref(),
        &state.platform,
        &state.network,
        Utc::now(),
    );

    match state.uploader.upload_bounty(&document).await {
        Ok(cid) => {
            state.metrics.uploads_total.inc();
            (StatusCode::OK, Json(json!({ "success": true, "cid": cid })))
        }
        Err(err) => {
            state.metrics.upload_failures_total.inc();
            warn!(error = %err, "bounty upload rejected");
            failure(&err)
        }
    }
}

/// `GET /v1/upload?cid=`
pub async fn get_bounty(State(state): State<AppState>, Query(query): Query<CidQuery>) -> (StatusCode, Json<Value>) {
    let Some(cid) = query.require() else {
        return missing_cid();
    };

    match state.uploader.retrieve_bounty(cid).await {
        Ok(metadata) => (StatusCode::OK, Json(json!({ "success": true, "metadata": metadata }))),
        Err(err) => failure(&err),
    }
}

/// `POST /v1/submission`
pub async fn upload_submission(
    State(state): State<AppState>,
    Json(req): Json<SubmissionRequest>,
) -> (StatusCode, Json<Value>) {
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        state.metrics.upload_failures_total.inc();
        return failure(&BountyError::Validation(
            "Missing required fields: title and description are required".to_string(),
        ));
    }

    let document = SubmissionDocument::new(
        &req.title,
        &req.description,
        req.submitter_address.as_ref(),
        &state.platform,
        Utc::now(),
    );
    match state.uploader.upload_submission(&document).await {
        Ok(cid) => {
            state.metrics.uploads_total.inc();
            (StatusCode::OK, Json(json!({ "success": true, "cid": cid })))
        }
        Err(err) => {
            state.metrics.upload_failures_total.inc();
            failure(&err)
        }
    }
}

/// `GET /v1/submission?cid=`; documents of another type are refused.
pub async fn get_submission(State(state): State<AppState>, Query(query): Query<CidQuery>) -> (StatusCode, Json<Value>) {
    let Some(cid) = query.require() else {
        return missing_cid();
    };

    match state.uploader.retrieve_submission(cid).await {
        Ok(submission) => (StatusCode::OK, Json(json!({ "success": true, "submission": submission }))),
        Err(err) => failure(&err),
    }
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            err.to_string(),
        ),
    }
}
