//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs ids and sizes, never form contents.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use chrono::Local;
use tracing::{info, instrument, warn};

use crate::export::ExportKind;
use crate::json_extract::extract_first_json;
use crate::logic::{dispatch, PlannerError};
use crate::protocol::*;
use crate::resources::generate_links;
use crate::session::{Action, ContextUpdate, SkillDraft};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct ApiError {
  status: StatusCode,
  message: String,
}

impl ApiError {
  pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
    Self { status, message: msg.into() }
  }
}

impl From<PlannerError> for ApiError {
  fn from(e: PlannerError) -> Self {
    let status = match &e {
      PlannerError::UnknownSession(_) => StatusCode::NOT_FOUND,
      PlannerError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Self::new(status, e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = serde_json::json!({ "error": self.message });
    (self.status, Json(body)).into_response()
  }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, generation_enabled: state.generator.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (id, form) = state.create_session().await;
  (StatusCode::CREATED, Json(to_out(&id, &form)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionOut>, ApiError> {
  let form = state
    .get_session(&id)
    .await
    .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown session: {id}")))?;
  Ok(Json(to_out(&id, &form)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if state.remove_session(&id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::new(StatusCode::NOT_FOUND, format!("unknown session: {id}")))
  }
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_put_context(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ContextUpdate>,
) -> Result<Json<SessionOut>, ApiError> {
  let d = dispatch(&state, &id, Action::UpdateContext(body)).await?;
  Ok(Json(to_out(&id, &d.state)))
}

#[instrument(level = "info", skip(state, body), fields(%id, skill_len = body.skill.len(), indicator_len = body.indicator.len()))]
pub async fn http_post_skill(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<SkillDraft>,
) -> Result<Json<SessionOut>, ApiError> {
  let d = dispatch(&state, &id, Action::AddSkill(body)).await?;
  info!(target: "planner", session = %id, skills = d.state.skills.len(), "Skill form submitted");
  Ok(Json(to_out(&id, &d.state)))
}

#[instrument(level = "info", skip(state, body), fields(%id, format = ?body.format))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<SessionOut>, ApiError> {
  let d = dispatch(&state, &id, Action::Generate { format: body.format }).await?;
  info!(target: "planner", session = %id, has_plan = d.state.plan.is_some(), failed = d.state.last_error.is_some(), "Generate handled");
  Ok(Json(to_out(&id, &d.state)))
}

#[instrument(level = "info", skip(state), fields(%id, %kind))]
pub async fn http_get_export(
  State(state): State<Arc<AppState>>,
  Path((id, kind)): Path<(String, String)>,
) -> Result<Response, ApiError> {
  let kind = ExportKind::parse(&kind)
    .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, format!("unknown export kind: {kind}")))?;
  let d = dispatch(&state, &id, Action::Export { kind, at: Local::now() }).await?;

  let Some(artifact) = d.artifact else {
    let message = d.state.last_error.unwrap_or_else(|| "nothing to export".into());
    warn!(target: "planner", session = %id, "Export refused");
    return Err(ApiError::new(StatusCode::CONFLICT, message));
  };

  let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
  Ok((
    [(header::CONTENT_TYPE, artifact.mime.to_string()), (header::CONTENT_DISPOSITION, disposition)],
    artifact.bytes,
  )
    .into_response())
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionOut>, ApiError> {
  let d = dispatch(&state, &id, Action::Reset).await?;
  Ok(Json(to_out(&id, &d.state)))
}

#[instrument(level = "info", skip(body), fields(text_len = body.text.len()))]
pub async fn http_post_extract(Json(body): Json<ExtractIn>) -> Response {
  match extract_first_json(&body.text) {
    Ok(json) => Json(ExtractOut { json: json.to_string() }).into_response(),
    Err(kind) => (
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(ExtractErrorOut { error: kind.to_string(), kind }),
    )
      .into_response(),
  }
}

#[instrument(level = "info", skip(state, body), fields(keywords = body.keywords.len()))]
pub async fn http_post_links(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LinksIn>,
) -> impl IntoResponse {
  let links = generate_links(&body.keywords, &state.config.resources.platforms);
  Json(LinksOut { links })
}
