//! Locate the first balanced JSON object/array inside arbitrary model output.
//!
//! Models like to wrap JSON in prose or Markdown fences. This scanner finds the
//! first `{` or `[` and walks forward until the structure it opened is closed,
//! skipping delimiters that appear inside JSON strings. The returned slice is
//! borrowed from the input unchanged; nothing after it is looked at.

use serde::Serialize;

/// Why no JSON value could be located.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ExtractError {
  #[error("no JSON object or array found in the response")]
  NoJsonFound,
  #[error("unbalanced closing delimiter in JSON")]
  MalformedJson,
  #[error("response ended before the JSON value was closed")]
  IncompleteJson,
}

/// Return the exact substring of the first balanced JSON object or array.
///
/// Single left-to-right pass, O(n) time and O(depth) extra space.
/// A closer of the wrong kind (`[1, 2}`) is `MalformedJson`, not a match.
pub fn extract_first_json(text: &str) -> Result<&str, ExtractError> {
  let start = text.find(&['{', '['][..]).ok_or(ExtractError::NoJsonFound)?;

  let mut stack: Vec<char> = Vec::new();
  let mut in_string = false;
  let mut escape = false;

  for (offset, ch) in text[start..].char_indices() {
    // An escaping backslash consumes exactly one following character.
    if escape {
      escape = false;
      continue;
    }
    if ch == '\\' {
      escape = true;
      continue;
    }
    if ch == '"' {
      in_string = !in_string;
      continue;
    }
    if in_string {
      continue;
    }

    match ch {
      '{' | '[' => stack.push(ch),
      '}' | ']' => {
        let opener = stack.pop().ok_or(ExtractError::MalformedJson)?;
        if !closes(opener, ch) {
          return Err(ExtractError::MalformedJson);
        }
        if stack.is_empty() {
          let end = start + offset + ch.len_utf8();
          return Ok(&text[start..end]);
        }
      }
      _ => {}
    }
  }

  Err(ExtractError::IncompleteJson)
}

fn closes(opener: char, closer: char) -> bool {
  matches!((opener, closer), ('{', '}') | ('[', ']'))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_without_openers_has_no_json() {
    assert_eq!(extract_first_json(""), Err(ExtractError::NoJsonFound));
    assert_eq!(
      extract_first_json("Lo siento, no puedo generar esto."),
      Err(ExtractError::NoJsonFound)
    );
    assert_eq!(
      extract_first_json("no json here ] more text"),
      Err(ExtractError::NoJsonFound)
    );
  }

  #[test]
  fn prose_around_array_is_ignored() {
    let input = "Here is your plan:\n[{\"destreza\": \"Resolver sumas\", \"indicador\": \"Suma correctamente\"}]\nGracias.";
    assert_eq!(
      extract_first_json(input).unwrap(),
      r#"[{"destreza": "Resolver sumas", "indicador": "Suma correctamente"}]"#
    );
  }

  #[test]
  fn prefix_and_suffix_do_not_change_the_match() {
    let values = [
      serde_json::json!({"a": 1}),
      serde_json::json!([1, 2, {"b": [true, null]}]),
      serde_json::json!({"deep": {"x": [[[{"y": "z"}]]]}}),
      serde_json::json!([]),
      serde_json::json!({"s": "tab\tand \"quote\" and \\ backslash"}),
    ];
    let prefixes = ["", "Respuesta: ", "```json\n", "line one\nline two: "];
    let suffixes = ["", "\n```", " trailing } ] text", "{\"second\": 2}"];

    for v in &values {
      let serialized = serde_json::to_string(v).unwrap();
      for p in prefixes {
        for s in suffixes {
          let input = format!("{p}{serialized}{s}");
          let got = extract_first_json(&input).unwrap();
          assert_eq!(got, serialized, "input: {input:?}");
          let reparsed: serde_json::Value = serde_json::from_str(got).unwrap();
          assert_eq!(&reparsed, v);
        }
      }
    }
  }

  #[test]
  fn delimiters_and_escaped_quotes_inside_strings() {
    let input = r#"{"a": "}{][\"x\""}"#;
    assert_eq!(extract_first_json(input).unwrap(), input);
  }

  #[test]
  fn doubled_backslash_does_not_escape_closing_quote() {
    let input = r#"{"a": "\\"} tail"#;
    assert_eq!(extract_first_json(input).unwrap(), r#"{"a": "\\"}"#);

    let input = r#"x {"p": "C:\\dir\\", "q": ["\\\"]"]} y"#;
    assert_eq!(
      extract_first_json(input).unwrap(),
      r#"{"p": "C:\\dir\\", "q": ["\\\"]"]}"#
    );
  }

  #[test]
  fn truncated_input_is_incomplete() {
    assert_eq!(extract_first_json(r#"{"a": [1, 2"#), Err(ExtractError::IncompleteJson));
    assert_eq!(extract_first_json(r#"[{"a": "unterminated }]"#), Err(ExtractError::IncompleteJson));
  }

  #[test]
  fn stray_closer_after_match_is_ignored() {
    assert_eq!(extract_first_json(r#"{"a": 1} }"#).unwrap(), r#"{"a": 1}"#);
  }

  #[test]
  fn mismatched_closer_is_malformed() {
    assert_eq!(extract_first_json("[1, 2}"), Err(ExtractError::MalformedJson));
    assert_eq!(extract_first_json(r#"{"a": [1}"#), Err(ExtractError::MalformedJson));
  }

  #[test]
  fn non_ascii_prefix_and_content() {
    let input = "Planificación → {\"tema\": \"niños y niñas\"} ¡listo!";
    assert_eq!(extract_first_json(input).unwrap(), "{\"tema\": \"niños y niñas\"}");
  }

  #[test]
  fn repeated_calls_give_the_same_result() {
    let input = "noise [1, [2, 3]] noise";
    assert_eq!(extract_first_json(input), extract_first_json(input));
  }
}
