//! Word (.docx) and Excel (.xlsx) exports of a generated plan.
//!
//! Layout is decided by pure helpers (`document_blocks`, `spreadsheet_rows`)
//! so it can be tested without unzipping office files; `render` hands the
//! result to docx-rs / rust_xlsxwriter and returns the binary buffer.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{GeneratedPlan, Language, PlanResult};

const SHEET_NAME: &str = "Planificacion";
/// Excel's per-cell limit, in characters.
const XLSX_MAX_CELL_CHARS: usize = 32_767;
const CLIPPED_MARKER: &str = "\n[…] (texto recortado; ver el documento Word)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
  Docx,
  Xlsx,
}

impl ExportKind {
  pub fn extension(self) -> &'static str {
    match self {
      ExportKind::Docx => "docx",
      ExportKind::Xlsx => "xlsx",
    }
  }

  pub fn mime(self) -> &'static str {
    match self {
      ExportKind::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
      ExportKind::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "docx" | "word" => Some(ExportKind::Docx),
      "xlsx" | "excel" => Some(ExportKind::Xlsx),
      _ => None,
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
  #[error("plan has no exportable content: {0}")]
  NotExportable(String),
  #[error("failed to write docx: {0}")]
  Docx(String),
  #[error("failed to write xlsx: {0}")]
  Xlsx(#[from] XlsxError),
}

/// A document building block, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
  Heading { text: String, level: u8 },
  Paragraph(String),
  /// Two-column label/value table; values may span several lines.
  Table(Vec<(String, Vec<String>)>),
}

#[instrument(level = "info", skip(plan), fields(skills = plan.skills.len()))]
pub fn render(kind: ExportKind, plan: &GeneratedPlan) -> Result<Vec<u8>, ExportError> {
  let bytes = match kind {
    ExportKind::Docx => write_docx(&document_blocks(plan)?)?,
    ExportKind::Xlsx => {
      let (header, rows) = spreadsheet_rows(plan)?;
      write_xlsx(&header, &rows)?
    }
  };
  debug!(target: "planner", bytes = bytes.len(), "Export rendered");
  Ok(bytes)
}

pub fn document_blocks(plan: &GeneratedPlan) -> Result<Vec<Block>, ExportError> {
  let lang = plan.language;
  let mut blocks = vec![Block::Heading { text: lang.plan_title().to_string(), level: 1 }];

  match &plan.result {
    PlanResult::Text { text } => {
      blocks.extend(
        text.lines()
          .filter(|l| !l.trim().is_empty())
          .map(|l| Block::Paragraph(l.to_string())),
      );
    }
    PlanResult::Structured { records } => {
      let (skill_l, indicator_l, topic_l) = match lang {
        Language::Spanish => ("Destreza", "Indicador", "Tema de estudio"),
        Language::English => ("Skill", "Indicator", "Study topic"),
      };
      for (i, r) in records.iter().enumerate() {
        blocks.push(Block::Heading { text: format!("{} {}: {}", skill_l, i + 1, r.skill), level: 2 });
        let mut rows = vec![(indicator_l.to_string(), vec![r.indicator.clone()])];
        if !r.study_topic.is_empty() {
          rows.push((topic_l.to_string(), vec![r.study_topic.clone()]));
        }
        for (label, items) in r.sections(lang) {
          if !items.is_empty() {
            rows.push((label.to_string(), items.to_vec()));
          }
        }
        blocks.push(Block::Table(rows));
      }
    }
    PlanResult::ExtractionError { message, .. } => return Err(ExportError::NotExportable(message.clone())),
  }

  if !plan.resources.is_empty() {
    let title = match lang {
      Language::Spanish => "Recursos sugeridos",
      Language::English => "Suggested resources",
    };
    blocks.push(Block::Heading { text: title.to_string(), level: 2 });
    for s in &plan.resources {
      blocks.push(Block::Paragraph(s.keywords.join(", ")));
      blocks.extend(s.links.iter().map(|(name, url)| Block::Paragraph(format!("{name}: {url}"))));
    }
  }
  Ok(blocks)
}

/// Header plus data rows. Text plans get one row per skill the plan was
/// generated for, with the whole plan text alongside; structured plans get
/// one row per record.
pub fn spreadsheet_rows(plan: &GeneratedPlan) -> Result<(Vec<String>, Vec<Vec<String>>), ExportError> {
  match &plan.result {
    PlanResult::Text { text } => {
      let header = ["DESTREZA", "INDICADOR", "TEMA", "PLAN DE CLASE"].map(String::from).to_vec();
      let rows = plan
        .skills
        .iter()
        .map(|s| vec![s.skill.clone(), s.indicator.clone(), s.study_topic.clone(), text.clone()])
        .collect();
      Ok((header, rows))
    }
    PlanResult::Structured { records } => {
      let header = [
        "DESTREZA", "INDICADOR", "TEMA", "ANTICIPACION", "CONSTRUCCION", "CONSOLIDACION", "RECURSOS", "EVALUACION",
        "PALABRAS CLAVE",
      ]
      .map(String::from)
      .to_vec();
      let rows = records
        .iter()
        .map(|r| {
          vec![
            r.skill.clone(),
            r.indicator.clone(),
            r.study_topic.clone(),
            r.anticipation.join("\n"),
            r.construction.join("\n"),
            r.consolidation.join("\n"),
            r.resources.join("\n"),
            r.evaluation.join("\n"),
            r.resource_keywords.join(", "),
          ]
        })
        .collect();
      Ok((header, rows))
    }
    PlanResult::ExtractionError { message, .. } => Err(ExportError::NotExportable(message.clone())),
  }
}

fn text_paragraph(text: &str, bold: bool, size: Option<usize>) -> Paragraph {
  let mut run = Run::new().add_text(text);
  if bold {
    run = run.bold();
  }
  if let Some(sz) = size {
    run = run.size(sz);
  }
  Paragraph::new().add_run(run)
}

fn write_docx(blocks: &[Block]) -> Result<Vec<u8>, ExportError> {
  let mut doc = Docx::new();
  for block in blocks {
    doc = match block {
      // Sizes are half-points.
      Block::Heading { text, level } => doc.add_paragraph(text_paragraph(text, true, Some(if *level <= 1 { 32 } else { 26 }))),
      Block::Paragraph(text) => doc.add_paragraph(text_paragraph(text, false, None)),
      Block::Table(rows) => {
        let rows = rows
          .iter()
          .map(|(label, values)| {
            let label_cell = TableCell::new().add_paragraph(text_paragraph(label, true, None));
            let value_cell = values
              .iter()
              .fold(TableCell::new(), |cell, v| cell.add_paragraph(text_paragraph(v, false, None)));
            TableRow::new(vec![label_cell, value_cell])
          })
          .collect();
        doc.add_table(Table::new(rows))
      }
    };
  }

  let mut buf = Cursor::new(Vec::new());
  doc.build().pack(&mut buf).map_err(|e| ExportError::Docx(e.to_string()))?;
  Ok(buf.into_inner())
}

/// Cut a value to fit one spreadsheet cell, ending it with a visible marker.
fn clip_cell(value: &str) -> String {
  if value.chars().count() <= XLSX_MAX_CELL_CHARS {
    return value.to_string();
  }
  let keep = XLSX_MAX_CELL_CHARS - CLIPPED_MARKER.chars().count();
  let mut out: String = value.chars().take(keep).collect();
  out.push_str(CLIPPED_MARKER);
  out
}

fn write_xlsx(header: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>, ExportError> {
  let mut workbook = Workbook::new();
  let bold = Format::new().set_bold();
  let wrap = Format::new().set_text_wrap();
  {
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, title) in header.iter().enumerate() {
      let col = col as u16;
      sheet.write_string_with_format(0, col, title, &bold)?;
      sheet.set_column_width(col, 30)?;
    }
    for (r, row) in rows.iter().enumerate() {
      for (c, value) in row.iter().enumerate() {
        sheet.write_string_with_format(r as u32 + 1, c as u16, clip_cell(value), &wrap)?;
      }
    }
  }
  Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ErrorKind, PlanFormat, SkillEntry, SkillRecord};
  use crate::resources::ResourceSuggestion;
  use std::collections::BTreeMap;

  fn skills() -> Vec<SkillEntry> {
    vec![
      SkillEntry { skill: "Sumar".into(), indicator: "Suma bien".into(), study_topic: "Sumas".into() },
      SkillEntry { skill: "Restar".into(), indicator: "Resta bien".into(), study_topic: String::new() },
    ]
  }

  fn plan(result: PlanResult) -> GeneratedPlan {
    GeneratedPlan {
      format: PlanFormat::Text,
      language: Language::Spanish,
      raw_text: String::new(),
      result,
      skills: skills(),
      resources: Vec::new(),
    }
  }

  fn record() -> SkillRecord {
    serde_json::from_value(serde_json::json!({
      "destreza": "Sumar",
      "indicador": "Suma bien",
      "anticipacion": ["Cantar"],
      "construccion": ["Contar", "Agrupar"],
      "palabras_clave": ["sumas"]
    }))
    .unwrap()
  }

  #[test]
  fn text_plan_document_skips_blank_lines() {
    let p = plan(PlanResult::Text { text: "Uno\n\n  \nDos".into() });
    let blocks = document_blocks(&p).unwrap();
    assert_eq!(
      blocks,
      vec![
        Block::Heading { text: "Plan de Clase".into(), level: 1 },
        Block::Paragraph("Uno".into()),
        Block::Paragraph("Dos".into()),
      ]
    );
  }

  #[test]
  fn structured_plan_document_has_one_table_per_record() {
    let mut p = plan(PlanResult::Structured { records: vec![record()] });
    p.resources = vec![ResourceSuggestion {
      keywords: vec!["sumas".into()],
      links: BTreeMap::from([("Google".to_string(), "https://www.google.com/search?q=sumas".to_string())]),
    }];
    let blocks = document_blocks(&p).unwrap();
    assert_eq!(blocks[1], Block::Heading { text: "Destreza 1: Sumar".into(), level: 2 });
    match &blocks[2] {
      Block::Table(rows) => {
        assert_eq!(rows[0], ("Indicador".to_string(), vec!["Suma bien".to_string()]));
        assert!(rows.iter().any(|(l, v)| l == "Construcción" && v.len() == 2));
        assert!(!rows.iter().any(|(l, _)| l == "Evaluación"));
      }
      other => panic!("expected table, got {other:?}"),
    }
    assert!(blocks.contains(&Block::Paragraph("Google: https://www.google.com/search?q=sumas".into())));
  }

  #[test]
  fn text_plan_spreadsheet_repeats_plan_per_skill() {
    let p = plan(PlanResult::Text { text: "El plan".into() });
    let (header, rows) = spreadsheet_rows(&p).unwrap();
    assert_eq!(header, vec!["DESTREZA", "INDICADOR", "TEMA", "PLAN DE CLASE"]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["Sumar", "Suma bien", "Sumas", "El plan"]);
    assert_eq!(rows[1][2], "");
  }

  #[test]
  fn structured_spreadsheet_joins_lists() {
    let p = plan(PlanResult::Structured { records: vec![record()] });
    let (header, rows) = spreadsheet_rows(&p).unwrap();
    assert_eq!(header.len(), rows[0].len());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][4], "Contar\nAgrupar");
  }

  #[test]
  fn extraction_errors_are_not_exportable() {
    let p = plan(PlanResult::ExtractionError { kind: ErrorKind::MalformedJson, message: "bad".into() });
    assert!(matches!(render(ExportKind::Docx, &p), Err(ExportError::NotExportable(_))));
    assert!(matches!(render(ExportKind::Xlsx, &p), Err(ExportError::NotExportable(_))));
  }

  #[test]
  fn rendered_files_are_zip_containers() {
    let p = plan(PlanResult::Structured { records: vec![record()] });
    for kind in [ExportKind::Docx, ExportKind::Xlsx] {
      let bytes = render(kind, &p).unwrap();
      assert!(bytes.starts_with(b"PK"), "{kind:?} is not a zip");
    }
  }

  #[test]
  fn oversized_cells_are_clipped_with_marker() {
    assert_eq!(clip_cell("corto"), "corto");
    let clipped = clip_cell(&"á".repeat(40_000));
    assert_eq!(clipped.chars().count(), XLSX_MAX_CELL_CHARS);
    assert!(clipped.ends_with(CLIPPED_MARKER));

    let p = plan(PlanResult::Text { text: "x".repeat(40_000) });
    assert!(render(ExportKind::Xlsx, &p).unwrap().starts_with(b"PK"));
  }

  #[test]
  fn kind_parsing_and_mime() {
    assert_eq!(ExportKind::parse("Word"), Some(ExportKind::Docx));
    assert_eq!(ExportKind::parse("xlsx"), Some(ExportKind::Xlsx));
    assert_eq!(ExportKind::parse("pdf"), None);
    assert!(ExportKind::Xlsx.mime().ends_with("spreadsheetml.sheet"));
  }
}
