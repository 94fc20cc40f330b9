//! Per-session form state and its explicit state-transition function.
//!
//! `reduce` is pure: it takes the current state plus one user action and
//! returns the next state together with the side effects the caller must
//! perform (model call, document write). The effect runner lives in
//! `logic.rs`; outcomes of effects come back in as further actions.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::PlannerConfig;
use crate::domain::{
  ErrorKind, GeneratedPlan, PlanContext, PlanFormat, PlanResult, SkillEntry, SkillRecord, DEFAULT_AGE, MAX_AGE,
  MIN_AGE,
};
use crate::export::ExportKind;
use crate::generator::GenerationParams;
use crate::json_extract::{extract_first_json, ExtractError};
use crate::prompt::build_prompt;
use crate::resources::{extract_resource_markers, suggestions_for};
use crate::util::normalize_text;

pub const MSG_SKILL_INCOMPLETE: &str = "Completa la destreza y el indicador antes de agregar.";
pub const MSG_MISSING_FIELDS: &str = "Faltan campos obligatorios.";
pub const MSG_NO_PLAN: &str = "Genera un plan antes de exportar.";
pub const MSG_NOT_JSON: &str = "La respuesta no contenía JSON; se muestra como texto.";

/// Serializable form state owned by one session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormState {
  pub subject: String,
  pub grade: String,
  pub age: u8,
  pub insertion_topic: String,
  pub skills: Vec<SkillEntry>,
  pub plan: Option<GeneratedPlan>,
  /// Format of the generation currently in flight.
  pub pending: Option<PlanFormat>,
  pub last_error: Option<String>,
  pub notice: Option<String>,
}

impl Default for FormState {
  fn default() -> Self {
    Self {
      subject: String::new(),
      grade: String::new(),
      age: DEFAULT_AGE,
      insertion_topic: String::new(),
      skills: Vec::new(),
      plan: None,
      pending: None,
      last_error: None,
      notice: None,
    }
  }
}

impl FormState {
  pub fn context(&self) -> PlanContext {
    PlanContext {
      subject: self.subject.clone(),
      grade: self.grade.clone(),
      age: self.age,
      insertion_topic: self.insertion_topic.clone(),
      skills: self.skills.clone(),
    }
  }
}

/// Partial update of the basic form fields; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ContextUpdate {
  #[serde(default)] pub subject: Option<String>,
  #[serde(default)] pub grade: Option<String>,
  #[serde(default)] pub age: Option<i64>,
  #[serde(default)] pub insertion_topic: Option<String>,
}

/// Raw "add skill" form submission, normalized by `reduce`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SkillDraft {
  #[serde(default)] pub skill: String,
  #[serde(default)] pub indicator: String,
  #[serde(default)] pub study_topic: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
  UpdateContext(ContextUpdate),
  AddSkill(SkillDraft),
  Generate { format: PlanFormat },
  GenerationSucceeded { text: String },
  GenerationFailed { message: String },
  Export { kind: ExportKind, at: DateTime<Local> },
  Reset,
}

impl Action {
  pub fn name(&self) -> &'static str {
    match self {
      Action::UpdateContext(_) => "update_context",
      Action::AddSkill(_) => "add_skill",
      Action::Generate { .. } => "generate",
      Action::GenerationSucceeded { .. } => "generation_succeeded",
      Action::GenerationFailed { .. } => "generation_failed",
      Action::Export { .. } => "export",
      Action::Reset => "reset",
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
  CallModel { prompt: String, params: GenerationParams },
  WriteDocument { kind: ExportKind, file_name: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
  pub state: FormState,
  pub effects: Vec<Effect>,
}

impl Transition {
  fn done(state: FormState) -> Self {
    Self { state, effects: Vec::new() }
  }

  fn fail(mut state: FormState, message: impl Into<String>) -> Self {
    state.last_error = Some(message.into());
    Self::done(state)
  }
}

pub fn reduce(state: &FormState, action: Action, cfg: &PlannerConfig) -> Transition {
  let mut next = state.clone();
  next.last_error = None;
  next.notice = None;

  match action {
    Action::UpdateContext(update) => {
      if let Some(age) = update.age {
        if age < i64::from(MIN_AGE) || age > i64::from(MAX_AGE) {
          return Transition::fail(next, format!("La edad debe estar entre {MIN_AGE} y {MAX_AGE}."));
        }
        next.age = age as u8;
      }
      if let Some(s) = update.subject { next.subject = normalize_text(&s); }
      if let Some(s) = update.grade { next.grade = normalize_text(&s); }
      if let Some(s) = update.insertion_topic { next.insertion_topic = normalize_text(&s); }
      Transition::done(next)
    }

    Action::AddSkill(draft) => {
      let skill = normalize_text(&draft.skill);
      let indicator = normalize_text(&draft.indicator);
      if skill.is_empty() || indicator.is_empty() {
        return Transition::fail(next, MSG_SKILL_INCOMPLETE);
      }
      next.skills.push(SkillEntry { skill, indicator, study_topic: normalize_text(&draft.study_topic) });
      Transition::done(next)
    }

    Action::Generate { format } => {
      if next.subject.is_empty() || next.grade.is_empty() || next.skills.is_empty() {
        return Transition::fail(next, MSG_MISSING_FIELDS);
      }
      let prompt = build_prompt(&next.context(), format, &cfg.prompts);
      next.pending = Some(format);
      Transition {
        state: next,
        effects: vec![Effect::CallModel { prompt, params: GenerationParams::from(&cfg.generation) }],
      }
    }

    Action::GenerationSucceeded { text } => {
      let Some(format) = next.pending.take() else {
        return Transition::fail(next, "No hay ninguna generación en curso.");
      };
      let (plan, notice) = build_plan(text, format, &next.context(), cfg);
      next.notice = notice;
      next.plan = Some(plan);
      Transition::done(next)
    }

    Action::GenerationFailed { message } => {
      next.pending = None;
      Transition::fail(next, message)
    }

    Action::Export { kind, at } => {
      let Some(plan) = &next.plan else {
        return Transition::fail(next, MSG_NO_PLAN);
      };
      if let PlanResult::ExtractionError { message, .. } = &plan.result {
        let message = format!("No se puede exportar: {message}");
        return Transition::fail(next, message);
      }
      let file_name = format!("plan_{}.{}", at.format("%Y%m%d_%H%M%S"), kind.extension());
      Transition { state: next, effects: vec![Effect::WriteDocument { kind, file_name }] }
    }

    Action::Reset => Transition::done(FormState::default()),
  }
}

fn build_plan(
  raw_text: String,
  format: PlanFormat,
  ctx: &PlanContext,
  cfg: &PlannerConfig,
) -> (GeneratedPlan, Option<String>) {
  let (result, notice) = interpret(&raw_text, format);
  let groups = match &result {
    PlanResult::Text { text } => extract_resource_markers(text),
    PlanResult::Structured { records } => records.iter().map(|r| r.resource_keywords.clone()).collect(),
    PlanResult::ExtractionError { .. } => Vec::new(),
  };
  let resources = suggestions_for(groups, &cfg.resources.platforms);
  let plan = GeneratedPlan {
    format,
    language: ctx.language(),
    raw_text,
    result,
    skills: ctx.skills.clone(),
    resources,
  };
  (plan, notice)
}

/// Decide once what a model response is. JSON mode falls back to text only
/// when the response holds no JSON at all; any other failure is surfaced.
pub fn interpret(text: &str, format: PlanFormat) -> (PlanResult, Option<String>) {
  if format == PlanFormat::Text {
    return (PlanResult::Text { text: text.to_string() }, None);
  }

  let json = match extract_first_json(text) {
    Ok(json) => json,
    Err(ExtractError::NoJsonFound) => {
      warn!(target: "planner", "JSON requested but response had none; keeping it as text");
      return (PlanResult::Text { text: text.to_string() }, Some(MSG_NOT_JSON.to_string()));
    }
    Err(e) => {
      warn!(target: "planner", error = %e, "JSON extraction failed");
      return (PlanResult::ExtractionError { kind: e.into(), message: e.to_string() }, None);
    }
  };

  match parse_records(json) {
    Ok(records) if records.is_empty() => (
      PlanResult::ExtractionError { kind: ErrorKind::InvalidRecords, message: "the JSON array holds no records".into() },
      None,
    ),
    Ok(records) => (PlanResult::Structured { records }, None),
    Err(e) => {
      warn!(target: "planner", error = %e, "JSON did not match the per-skill schema");
      (PlanResult::ExtractionError { kind: ErrorKind::InvalidRecords, message: e.to_string() }, None)
    }
  }
}

/// An array of records, or a single record object.
fn parse_records(json: &str) -> Result<Vec<SkillRecord>, serde_json::Error> {
  let value: serde_json::Value = serde_json::from_str(json)?;
  if value.is_array() {
    serde_json::from_value(value)
  } else {
    Ok(vec![serde_json::from_value(value)?])
  }
}
