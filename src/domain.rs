//! Domain models: skill entries, request context, parsed per-skill records and
//! the tagged plan result consumed by the exporters.

use serde::{Deserialize, Deserializer, Serialize};

use crate::json_extract::ExtractError;
use crate::resources::ResourceSuggestion;

pub const MIN_AGE: u8 = 3;
pub const MAX_AGE: u8 = 99;
pub const DEFAULT_AGE: u8 = 12;

/// One skill/indicator pair as entered by the teacher. Never mutated after add.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillEntry {
  pub skill: String,
  pub indicator: String,
  #[serde(default)]
  pub study_topic: String,
}

/// Everything a prompt is built from. Assembled fresh for each generate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanContext {
  pub subject: String,
  pub grade: String,
  pub age: u8,
  pub insertion_topic: String,
  pub skills: Vec<SkillEntry>,
}

impl PlanContext {
  pub fn language(&self) -> Language {
    Language::for_subject(&self.subject)
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
  Spanish,
  English,
}

impl Language {
  /// English lessons are planned in English, everything else in Spanish.
  pub fn for_subject(subject: &str) -> Self {
    let s = crate::util::normalize_text(subject).to_lowercase();
    match s.as_str() {
      "ingles" | "inglés" | "english" => Language::English,
      _ => Language::Spanish,
    }
  }

  pub fn plan_title(self) -> &'static str {
    match self {
      Language::Spanish => "Plan de Clase",
      Language::English => "Lesson Plan",
    }
  }
}

/// Output mode requested from the model.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanFormat {
  #[default]
  Text,
  Json,
}

/// One per-skill object as returned by the model in JSON mode.
/// Keys follow the Spanish schema the prompts ask for.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillRecord {
  #[serde(rename = "destreza")]
  pub skill: String,
  #[serde(rename = "indicador", default)]
  pub indicator: String,
  #[serde(rename = "tema_estudio", default)]
  pub study_topic: String,
  #[serde(rename = "anticipacion", default, deserialize_with = "one_or_many")]
  pub anticipation: Vec<String>,
  #[serde(rename = "construccion", default, deserialize_with = "one_or_many")]
  pub construction: Vec<String>,
  #[serde(rename = "consolidacion", default, deserialize_with = "one_or_many")]
  pub consolidation: Vec<String>,
  #[serde(rename = "recursos", default, deserialize_with = "one_or_many")]
  pub resources: Vec<String>,
  #[serde(rename = "evaluacion", default, deserialize_with = "one_or_many")]
  pub evaluation: Vec<String>,
  #[serde(rename = "palabras_clave", default, deserialize_with = "one_or_many")]
  pub resource_keywords: Vec<String>,
}

impl SkillRecord {
  /// Labelled list sections in document order.
  pub fn sections(&self, lang: Language) -> [(&'static str, &[String]); 5] {
    let labels = match lang {
      Language::Spanish => ["Anticipación", "Construcción", "Consolidación", "Recursos", "Evaluación"],
      Language::English => ["Anticipation", "Construction", "Consolidation", "Resources", "Evaluation"],
    };
    [
      (labels[0], self.anticipation.as_slice()),
      (labels[1], self.construction.as_slice()),
      (labels[2], self.consolidation.as_slice()),
      (labels[3], self.resources.as_slice()),
      (labels[4], self.evaluation.as_slice()),
    ]
  }
}

/// Models sometimes answer a list field with a single string; accept both.
fn one_or_many<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
    Nothing(()),
  }
  Ok(match OneOrMany::deserialize(de)? {
    OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
    OneOrMany::One(s) => vec![s],
    OneOrMany::Many(v) => v,
    OneOrMany::Nothing(()) => Vec::new(),
  })
}

/// Why a JSON-mode response could not become structured records.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NoJsonFound,
  MalformedJson,
  IncompleteJson,
  InvalidRecords,
}

impl From<ExtractError> for ErrorKind {
  fn from(e: ExtractError) -> Self {
    match e {
      ExtractError::NoJsonFound => ErrorKind::NoJsonFound,
      ExtractError::MalformedJson => ErrorKind::MalformedJson,
      ExtractError::IncompleteJson => ErrorKind::IncompleteJson,
    }
  }
}

/// Decided once right after generation; exporters match on it exhaustively.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanResult {
  Text { text: String },
  Structured { records: Vec<SkillRecord> },
  ExtractionError { kind: ErrorKind, message: String },
}

/// The last generated plan held by a session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedPlan {
  pub format: PlanFormat,
  pub language: Language,
  pub raw_text: String,
  pub result: PlanResult,
  /// Skills the prompt was built from; later additions to the form do not
  /// belong to this plan.
  #[serde(default)]
  pub skills: Vec<SkillEntry>,
  #[serde(default)]
  pub resources: Vec<ResourceSuggestion>,
}
