//! Effect runner shared by all HTTP handlers.
//!
//! Handlers translate a request into a session `Action`; `dispatch` runs the
//! pure transition, performs the effects it asks for (model call, document
//! rendering), feeds effect outcomes back as actions and stores the result.

use std::collections::VecDeque;

use tracing::{debug, error, info, instrument};

use crate::export::{self, ExportError};
use crate::generator::{GenerationError, GenerationParams};
use crate::session::{reduce, Action, Effect, FormState};
use crate::state::AppState;

/// A rendered download.
#[derive(Clone, Debug)]
pub struct Artifact {
  pub file_name: String,
  pub mime: &'static str,
  pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct Dispatch {
  pub state: FormState,
  pub artifact: Option<Artifact>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
  #[error("unknown session: {0}")]
  UnknownSession(String),
  #[error(transparent)]
  Export(#[from] ExportError),
}

#[instrument(level = "info", skip(app, action), fields(action = action.name()))]
pub async fn dispatch(app: &AppState, session_id: &str, action: Action) -> Result<Dispatch, PlannerError> {
  let current = app
    .get_session(session_id)
    .await
    .ok_or_else(|| PlannerError::UnknownSession(session_id.to_string()))?;

  let transition = reduce(&current, action, &app.config);
  let mut state = transition.state;
  let mut effects: VecDeque<Effect> = transition.effects.into();
  let mut artifact = None;

  while let Some(effect) = effects.pop_front() {
    match effect {
      Effect::CallModel { prompt, params } => {
        let outcome = run_model(app, &prompt, &params).await;
        let t = reduce(&state, outcome, &app.config);
        state = t.state;
        effects.extend(t.effects);
      }
      Effect::WriteDocument { kind, file_name } => {
        let plan = state
          .plan
          .as_ref()
          .ok_or_else(|| ExportError::NotExportable("no plan generated".into()))?;
        let bytes = export::render(kind, plan)?;
        info!(target: "planner", %session_id, %file_name, bytes = bytes.len(), "Export ready");
        artifact = Some(Artifact { file_name, mime: kind.mime(), bytes });
      }
    }
  }

  if let Some(err) = &state.last_error {
    debug!(target: "planner", %session_id, error = %err, "Action finished with a user-facing error");
  }

  // Sessions are driven by one user at a time; last write wins.
  if !app.store_session(session_id, state.clone()).await {
    return Err(PlannerError::UnknownSession(session_id.to_string()));
  }
  Ok(Dispatch { state, artifact })
}

/// Call the generator and turn its outcome into the follow-up action.
async fn run_model(app: &AppState, prompt: &str, params: &GenerationParams) -> Action {
  let result = match &app.generator {
    Some(g) => {
      debug!(target: "planner", provider = g.name(), prompt_len = prompt.len(), "Calling text generator");
      g.generate(prompt, params).await
    }
    None => Err(GenerationError::Disabled),
  };
  match result {
    Ok(text) => Action::GenerationSucceeded { text },
    Err(e) => {
      error!(target: "planner", error = %e, "Plan generation failed");
      Action::GenerationFailed { message: format!("Error al generar el plan: {e}") }
    }
  }
}
