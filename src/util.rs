//! Small utility helpers used across modules.

use unicode_normalization::UnicodeNormalization;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single pass, so braces inside a value are never expanded again. Unknown
/// `{...}` runs are kept as they are.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, *v)));
    match value {
      Some((close, v)) => {
        out.push_str(v);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// NFKC-normalize and trim user input. Full-width digits, ligatures and
/// non-breaking spaces collapse to their plain forms.
pub fn normalize_text(s: &str) -> String {
  s.nfkc().collect::<String>().trim().to_string()
}

/// Log-safe preview of large strings (char boundary aware).
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let count = s.chars().count();
  if count <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("{a}-{b}-{a}", &[("a", "1"), ("b", "2")]);
    assert_eq!(out, "1-2-1");
  }

  #[test]
  fn fill_template_does_not_expand_placeholders_inside_values() {
    let out = fill_template("{subject} / {skills}", &[("subject", "{skills}"), ("skills", "- Sumar")]);
    assert_eq!(out, "{skills} / - Sumar");
    assert_eq!(fill_template("{x} {y", &[("y", "1")]), "{x} {y");
    assert_eq!(fill_template("{{a}}", &[("a", "1")]), "{1}");
  }

  #[test]
  fn normalize_text_trims_and_folds_compatibility_forms() {
    assert_eq!(normalize_text("  Matemática\u{00A0} "), "Matemática");
    assert_eq!(normalize_text("５º"), "5o");
    assert_eq!(normalize_text("   "), "");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    assert_eq!(trunc_for_log("ñandú", 10), "ñandú");
    assert_eq!(trunc_for_log("ñandú", 2), "ña… (5 chars total)");
  }
}
