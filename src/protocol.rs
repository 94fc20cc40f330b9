//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{PlanFormat, SkillEntry, GeneratedPlan};
use crate::json_extract::ExtractError;
use crate::session::FormState;

/// DTO for a session's form state.
#[derive(Debug, Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub subject: String,
    pub grade: String,
    pub age: u8,
    pub insertion_topic: String,
    pub skills: Vec<SkillEntry>,
    pub plan: Option<GeneratedPlan>,
    pub generating: bool,
    pub last_error: Option<String>,
    pub notice: Option<String>,
}

/// Convert the internal session state to the public DTO.
pub fn to_out(session_id: &str, s: &FormState) -> SessionOut {
    SessionOut {
        session_id: session_id.to_string(),
        subject: s.subject.clone(),
        grade: s.grade.clone(),
        age: s.age,
        insertion_topic: s.insertion_topic.clone(),
        skills: s.skills.clone(),
        plan: s.plan.clone(),
        generating: s.pending.is_some(),
        last_error: s.last_error.clone(),
        notice: s.notice.clone(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    #[serde(default)]
    pub format: PlanFormat,
}

#[derive(Debug, Deserialize)]
pub struct ExtractIn {
    pub text: String,
}
#[derive(Debug, Serialize)]
pub struct ExtractOut {
    pub json: String,
}
#[derive(Debug, Serialize)]
pub struct ExtractErrorOut {
    pub error: String,
    pub kind: ExtractError,
}

#[derive(Debug, Deserialize)]
pub struct LinksIn {
    #[serde(default)]
    pub keywords: Vec<String>,
}
#[derive(Debug, Serialize)]
pub struct LinksOut {
    pub links: BTreeMap<String, String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation_enabled: bool,
}
