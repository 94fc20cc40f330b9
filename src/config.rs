//! Loading planner configuration (prompts, generation parameters, resource
//! platforms, session limits) from TOML.
//!
//! See `PlannerConfig` for the expected schema. Every section is optional and
//! falls back to built-in defaults.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{error, info};

use crate::resources::default_platforms;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PlannerConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationConfig,
  #[serde(default)]
  pub resources: ResourcesConfig,
  #[serde(default)]
  pub sessions: SessionsConfig,
}

/// In-memory session store limits. Sessions idle longer than `ttl_secs` are
/// dropped, and at most `max_sessions` are kept (oldest idle first).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
  pub ttl_secs: u64,
  pub max_sessions: usize,
}

impl Default for SessionsConfig {
  fn default() -> Self {
    Self { ttl_secs: 2 * 60 * 60, max_sessions: 1000 }
  }
}

/// Sampling parameters and provider settings. Environment variables win over
/// anything set here (see `OpenAiGenerator::from_env`).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
  pub base_url: String,
  pub api_key: Option<String>,
  pub timeout_secs: u64,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      model: "gpt-4o-mini".into(),
      temperature: 0.3,
      max_tokens: 2800,
      base_url: "https://api.openai.com/v1".into(),
      api_key: None,
      timeout_secs: 60,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
  /// Platform name -> search URL template containing `{query}`.
  pub platforms: BTreeMap<String, String>,
}

impl Default for ResourcesConfig {
  fn default() -> Self {
    Self { platforms: default_platforms() }
  }
}

/// Prompt templates. Placeholders: `{subject}`, `{grade}`, `{age}`,
/// `{insertion_topic}`, `{skills}`; skill lines use `{skill}`, `{indicator}`,
/// `{study_topic}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub text_es: String,
  pub text_en: String,
  pub json_es: String,
  pub json_en: String,
  pub skill_line_es: String,
  pub skill_line_en: String,
  pub study_topic_es: String,
  pub study_topic_en: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      text_es: concat!(
        "Eres un experto en diseño curricular y planificación educativa. Genera un PLAN DE CLASE en ESPAÑOL ",
        "en formato TEXTO estructurado y detallado.\n\n",
        "Asignatura: {subject}\nGrado: {grade}\nEdad: {age}\nTema de Inserción: {insertion_topic}\n\n",
        "### DESTREZAS E INDICADORES\n{skills}\n",
        "### ANTICIPACIÓN\n- Actividades que activen conocimientos previos (todas empiezan con verbos en infinitivo).\n\n",
        "### CONSTRUCCIÓN\n- Al menos 6 actividades en secuencia pedagógica (todas con verbos en infinitivo).\n",
        "- Incluir actividades DUA (Diseño Universal de Aprendizaje).\n\n",
        "### CONSOLIDACIÓN\n- Actividades para aplicar lo aprendido y reforzar conocimientos.\n\n",
        "### RECURSOS\n- Listar recursos físicos y tecnológicos (pizarra, cuaderno, proyector, etc.)\n",
        "- Termina esta sección con una línea exacta 'Recurso sugerido: <2 a 4 palabras clave separadas por comas>'.\n\n",
        "### ORIENTACIONES PARA LA EVALUACIÓN\n- Actividades de evaluación en relación con el indicador.\n",
        "- Incluir orientaciones DUA para la evaluación.\n",
      )
      .into(),
      text_en: concat!(
        "You are an expert in curriculum design and lesson planning. Generate a LESSON PLAN in U.S. ENGLISH ",
        "with clear, structured, and detailed text.\n\n",
        "Subject: {subject}\nGrade: {grade}\nAge: {age}\nTransversal Topic: {insertion_topic}\n\n",
        "### SKILLS AND INDICATORS\n{skills}\n",
        "### ANTICIPATION\n- Activities that activate prior knowledge (all must start with verbs in infinitive form).\n\n",
        "### CONSTRUCTION\n- At least 6 sequenced activities (all starting with verbs in infinitive form).\n",
        "- Include UDL (Universal Design for Learning) activities.\n\n",
        "### CONSOLIDATION\n- Activities to apply and reinforce knowledge.\n\n",
        "### RESOURCES\n- List physical and technological resources (board, notebook, projector, etc.)\n",
        "- End this section with the exact line 'Suggested resource: <2 to 4 comma-separated keywords>'.\n\n",
        "### EVALUATION GUIDELINES\n- Evaluation activities aligned with the indicator.\n",
        "- Include UDL strategies for evaluation.\n",
      )
      .into(),
      json_es: concat!(
        "Eres un experto en diseño curricular y planificación educativa. Genera una planificación en ESPAÑOL.\n\n",
        "Asignatura: {subject}\nGrado: {grade}\nEdad: {age}\nTema de Inserción: {insertion_topic}\n\n",
        "### DESTREZAS E INDICADORES\n{skills}\n",
        "Responde ÚNICAMENTE con un arreglo JSON con un objeto por destreza, en el mismo orden. Cada objeto tiene las claves:\n",
        "\"destreza\", \"indicador\", \"tema_estudio\" (texto), y \"anticipacion\", \"construccion\" (al menos 6), ",
        "\"consolidacion\", \"recursos\", \"evaluacion\", \"palabras_clave\" (2 a 4 palabras para buscar recursos) como listas de textos.\n",
        "Todas las actividades empiezan con verbos en infinitivo e incluyen orientaciones DUA. Integra el tema de inserción.\n",
      )
      .into(),
      json_en: concat!(
        "You are an expert in curriculum design and lesson planning. Generate a lesson plan in U.S. ENGLISH.\n\n",
        "Subject: {subject}\nGrade: {grade}\nAge: {age}\nTransversal Topic: {insertion_topic}\n\n",
        "### SKILLS AND INDICATORS\n{skills}\n",
        "Reply ONLY with a JSON array holding one object per skill, in the same order. Each object has the keys:\n",
        "\"destreza\", \"indicador\", \"tema_estudio\" (text), and \"anticipacion\", \"construccion\" (at least 6), ",
        "\"consolidacion\", \"recursos\", \"evaluacion\", \"palabras_clave\" (2 to 4 resource search keywords) as lists of strings.\n",
        "Every activity starts with an infinitive verb and includes UDL strategies. Weave in the transversal topic.\n",
      )
      .into(),
      skill_line_es: "- Destreza: {skill} | Indicador: {indicator}{study_topic}".into(),
      skill_line_en: "- Skill: {skill} | Indicator: {indicator}{study_topic}".into(),
      study_topic_es: " | Tema de estudio: {study_topic}".into(),
      study_topic_en: " | Study topic: {study_topic}".into(),
    }
  }
}

/// Load `PlannerConfig` from PLANNER_CONFIG_PATH (unset means defaults; any
/// IO/parse error is logged and also yields defaults), then apply
/// OPENAI_MODEL on top.
pub fn load_planner_config_from_env() -> PlannerConfig {
  let mut cfg = match std::env::var("PLANNER_CONFIG_PATH") {
    Ok(path) => load_file(&path),
    Err(_) => PlannerConfig::default(),
  };
  if let Some(model) = std::env::var("OPENAI_MODEL").ok().filter(|m| !m.trim().is_empty()) {
    cfg.generation.model = model;
  }
  cfg
}

fn load_file(path: &str) -> PlannerConfig {
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_planner_config(&s) {
      Ok(cfg) => {
        info!(target: "lesson_planner", %path, "Loaded planner config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "lesson_planner", %path, error = %e, "Failed to parse TOML config; using defaults");
        PlannerConfig::default()
      }
    },
    Err(e) => {
      error!(target: "lesson_planner", %path, error = %e, "Failed to read TOML config file; using defaults");
      PlannerConfig::default()
    }
  }
}

pub fn parse_planner_config(s: &str) -> Result<PlannerConfig, toml::de::Error> {
  toml::from_str::<PlannerConfig>(s)
}
