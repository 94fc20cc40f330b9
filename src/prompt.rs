//! Prompt assembly for lesson plans (Spanish by default, U.S. English for
//! English-language subjects).

use crate::config::Prompts;
use crate::domain::{Language, PlanContext, PlanFormat};
use crate::util::fill_template;

pub fn build_prompt(ctx: &PlanContext, format: PlanFormat, prompts: &Prompts) -> String {
  let lang = ctx.language();
  let (tpl, line_tpl, topic_tpl) = match (lang, format) {
    (Language::Spanish, PlanFormat::Text) => (&prompts.text_es, &prompts.skill_line_es, &prompts.study_topic_es),
    (Language::Spanish, PlanFormat::Json) => (&prompts.json_es, &prompts.skill_line_es, &prompts.study_topic_es),
    (Language::English, PlanFormat::Text) => (&prompts.text_en, &prompts.skill_line_en, &prompts.study_topic_en),
    (Language::English, PlanFormat::Json) => (&prompts.json_en, &prompts.skill_line_en, &prompts.study_topic_en),
  };

  let mut skills = String::new();
  for s in &ctx.skills {
    let topic = if s.study_topic.is_empty() {
      String::new()
    } else {
      fill_template(topic_tpl, &[("study_topic", s.study_topic.as_str())])
    };
    skills.push_str(&fill_template(
      line_tpl,
      &[("skill", s.skill.as_str()), ("indicator", s.indicator.as_str()), ("study_topic", topic.as_str())],
    ));
    skills.push('\n');
  }

  let age = ctx.age.to_string();
  fill_template(
    tpl,
    &[
      ("subject", ctx.subject.as_str()),
      ("grade", ctx.grade.as_str()),
      ("age", age.as_str()),
      ("insertion_topic", ctx.insertion_topic.as_str()),
      ("skills", skills.as_str()),
    ],
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::SkillEntry;

  fn ctx(subject: &str) -> PlanContext {
    PlanContext {
      subject: subject.into(),
      grade: "Quinto".into(),
      age: 10,
      insertion_topic: "Cuidado del agua".into(),
      skills: vec![
        SkillEntry { skill: "Resolver sumas".into(), indicator: "Suma correctamente".into(), study_topic: String::new() },
        SkillEntry { skill: "Leer fracciones".into(), indicator: "Identifica fracciones".into(), study_topic: "Fracciones".into() },
      ],
    }
  }

  #[test]
  fn spanish_text_prompt_lists_context_and_skills_in_order() {
    let p = build_prompt(&ctx("Matemática"), PlanFormat::Text, &Prompts::default());
    assert!(p.contains("Asignatura: Matemática"));
    assert!(p.contains("Edad: 10"));
    assert!(p.contains("Tema de Inserción: Cuidado del agua"));
    let first = p.find("- Destreza: Resolver sumas | Indicador: Suma correctamente\n").unwrap();
    let second = p
      .find("- Destreza: Leer fracciones | Indicador: Identifica fracciones | Tema de estudio: Fracciones\n")
      .unwrap();
    assert!(first < second);
    assert!(p.contains("Recurso sugerido:"));
    assert!(!p.contains("{skills}"));
  }

  #[test]
  fn english_subject_uses_english_templates() {
    let p = build_prompt(&ctx("English"), PlanFormat::Text, &Prompts::default());
    assert!(p.contains("Subject: English"));
    assert!(p.contains("- Skill: Resolver sumas | Indicator: Suma correctamente"));
    assert!(p.contains("Suggested resource:"));
  }

  #[test]
  fn json_prompt_names_the_record_keys() {
    let p = build_prompt(&ctx("Ciencias"), PlanFormat::Json, &Prompts::default());
    for key in ["\"destreza\"", "\"indicador\"", "\"construccion\"", "\"palabras_clave\""] {
      assert!(p.contains(key), "missing {key}");
    }
    assert!(!p.contains("{subject}"));
  }
}
