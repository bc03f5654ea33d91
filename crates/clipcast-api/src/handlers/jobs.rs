//! Job handlers (§4.13): create/query/caption-edit/refresh, plus progress history for the
//! WebSocket-disconnected polling fallback.

use axum::extract::{Path, Query, State};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use clipcast_models::{CaptionEdit, Identity, Job, JobId, JobState, RegenStatus};

use crate::auth::AuthUser;
use crate::auth::{MaybeAuthUser, SESSION_COOKIE_NAME};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub source_url: String,
    pub duration_secs: f64,
    #[serde(default)]
    pub start_offset: Option<f64>,
    #[serde(default)]
    pub end_offset: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
    pub anonymous: bool,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub state: String,
    pub regen_status: String,
    pub progress: u8,
    pub message: String,
    pub final_path: Option<String>,
    pub subtitle_path: Option<String>,
    pub error_message: Option<String>,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            state: job.state.as_str().to_string(),
            regen_status: job.regen_status.as_str().to_string(),
            progress: job.progress,
            message: job.message.clone(),
            final_path: job.artifacts.final_path.clone(),
            subtitle_path: job.artifacts.subtitle_path.clone(),
            error_message: job.error_message.clone(),
        }
    }
}

/// POST /api/jobs
///
/// Creates a job for a validated YouTube source. A caller with no valid credentials is
/// issued a fresh anonymous session, signed into a `clipcast_session` cookie on the response
/// (§4.13).
pub async fn create_job(
    State(state): State<AppState>,
    maybe_user: MaybeAuthUser,
    jar: CookieJar,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<(CookieJar, Json<CreateJobResponse>)> {
    let source_url = crate::security::validate_video_url(&body.source_url)
        .into_result()
        .map_err(ApiError::bad_request)?;
    let body = CreateJobRequest { source_url, ..body };

    let (owner, jar) = match maybe_user.0 {
        Some(identity) => (identity, jar),
        None => {
            let session_id = Uuid::new_v4().to_string();
            let signed = state.session_signer.sign(&session_id);
            let cookie = Cookie::build((SESSION_COOKIE_NAME, signed))
                .http_only(true)
                .path("/")
                .build();
            (Identity::session(session_id), jar.add(cookie))
        }
    };

    info!(owner = %owner, source_url = %body.source_url, "creating job");

    let anonymous = owner.is_anonymous();
    let job_id = state
        .orchestrator
        .create_job(owner, body.source_url, body.duration_secs, body.start_offset, body.end_offset)
        .await?;

    Ok((
        jar,
        Json(CreateJobResponse {
            job_id: job_id.to_string(),
            anonymous,
        }),
    ))
}

/// GET /api/jobs/:job_id
pub async fn query_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<JobResponse>> {
    let job_id = JobId::from_string(job_id);
    let job = state.orchestrator.query_job(&caller, &job_id).await?;
    Ok(Json(JobResponse::from(&job)))
}

#[derive(Debug, Deserialize)]
pub struct GetJobHistoryQuery {
    #[serde(default)]
    pub since: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct JobHistoryResponse {
    pub job_id: String,
    pub events: Vec<serde_json::Value>,
}

/// GET /api/jobs/:job_id/history
pub async fn get_job_history(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<GetJobHistoryQuery>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<JobHistoryResponse>> {
    let job_id_typed = JobId::from_string(job_id.clone());
    state.orchestrator.query_job(&caller, &job_id_typed).await?;

    let since = query.since.unwrap_or(0);
    let history = state.progress.get_history_since(&job_id_typed, since).await?;

    let events = history
        .into_iter()
        .filter_map(|e| serde_json::to_value(&e).ok())
        .collect();

    Ok(Json(JobHistoryResponse { job_id, events }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaptionsRequest {
    pub edits: Vec<CaptionEdit>,
}

#[derive(Debug, Serialize)]
pub struct UpdateCaptionsResponse {
    pub regen_job_id: String,
}

/// PATCH /api/jobs/:job_id/captions
///
/// Returns `409 busy` if a regeneration is already in flight for this job (§5).
pub async fn update_captions(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    AuthUser(caller): AuthUser,
    Json(body): Json<UpdateCaptionsRequest>,
) -> ApiResult<Json<UpdateCaptionsResponse>> {
    let job_id = JobId::from_string(job_id);
    let regen_job_id = state
        .orchestrator
        .update_captions(&caller, &job_id, body.edits)
        .await?;

    Ok(Json(UpdateCaptionsResponse {
        regen_job_id: regen_job_id.to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RefreshVideoResponse {
    pub final_url: String,
    pub captions: Vec<CaptionView>,
}

#[derive(Debug, Serialize)]
pub struct CaptionView {
    pub index: usize,
    pub speaker_label: String,
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// POST /api/jobs/:job_id/refresh
///
/// Returns a cache-busted final video URL and the current caption projection, for clients
/// that polled rather than held a WebSocket connection open through a regeneration.
pub async fn refresh_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<RefreshVideoResponse>> {
    let job_id = JobId::from_string(job_id);
    let (final_url, captions) = state.orchestrator.refresh_video(&caller, &job_id).await?;

    let captions = captions
        .into_iter()
        .map(|(index, speaker_label, text, start, end)| CaptionView {
            index,
            speaker_label,
            text,
            start,
            end,
        })
        .collect();

    Ok(Json(RefreshVideoResponse { final_url, captions }))
}

#[allow(dead_code)]
fn is_valid_job_id(id: &str) -> bool {
    if id.is_empty() || id.len() > 64 || id.len() < 8 {
        return false;
    }
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_job_ids() {
        assert!(is_valid_job_id("12345678"));
        assert!(is_valid_job_id("abc-1234-def"));
    }

    #[test]
    fn test_invalid_job_ids() {
        assert!(!is_valid_job_id(""));
        assert!(!is_valid_job_id("short"));
        assert!(!is_valid_job_id("has space"));
    }

    #[test]
    fn test_job_response_from_job() {
        let job = Job::new(
            Identity::user("user-1"),
            clipcast_models::JobRequest {
                source_url: "https://youtu.be/abc".to_string(),
                duration_secs: 30.0,
                start_offset: None,
                end_offset: None,
            },
        );
        let response = JobResponse::from(&job);
        assert_eq!(response.state, JobState::Pending.as_str());
        assert_eq!(response.regen_status, RegenStatus::Idle.as_str());
    }
}
