//! Resource suggestions: keyword markers found in plan text and the search
//! links built from them.
//!
//! Links are plain string templating over a platform table; nothing here
//! touches the network or checks that a URL resolves.

use std::collections::BTreeMap;

use serde::Serialize;
use url::form_urlencoded;

use crate::util::{fill_template, normalize_text};

/// Keywords suggested for one plan section plus their ready-to-open links.
#[derive(Clone, Debug, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ResourceSuggestion {
  pub keywords: Vec<String>,
  pub links: BTreeMap<String, String>,
}

/// Built-in platform table: name -> URL template with a `{query}` placeholder.
pub fn default_platforms() -> BTreeMap<String, String> {
  [
    ("YouTube", "https://www.youtube.com/results?search_query={query}"),
    ("Google", "https://www.google.com/search?q={query}"),
    ("Khan Academy", "https://es.khanacademy.org/search?page_search_query={query}"),
    ("Wikipedia", "https://es.wikipedia.org/w/index.php?search={query}"),
  ]
  .into_iter()
  .map(|(k, v)| (k.to_string(), v.to_string()))
  .collect()
}

/// Build the `+`-joined query fragment: normalize each keyword, collapse inner
/// whitespace, drop empties, and form-url-encode everything else.
pub fn query_fragment<S: AsRef<str>>(keywords: &[S]) -> String {
  let words: Vec<String> = keywords
    .iter()
    .map(|k| normalize_text(k.as_ref()))
    .filter(|k| !k.is_empty())
    .flat_map(|k| k.split_whitespace().map(str::to_string).collect::<Vec<_>>())
    .collect();

  words
    .iter()
    .map(|w| form_urlencoded::byte_serialize(w.as_bytes()).collect::<String>())
    .collect::<Vec<_>>()
    .join("+")
}

/// One search URL per platform, or an empty map when no keyword survives.
pub fn generate_links<S: AsRef<str>>(
  keywords: &[S],
  platforms: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
  let fragment = query_fragment(keywords);
  if fragment.is_empty() {
    return BTreeMap::new();
  }
  platforms
    .iter()
    .map(|(name, tpl)| (name.clone(), fill_template(tpl, &[("query", fragment.as_str())])))
    .collect()
}

/// Longer labels first so the plural never leaves a stray "s".
const MARKER_LABELS: [&str; 4] = ["recursos sugeridos", "recurso sugerido", "suggested resources", "suggested resource"];
const EMPHASIS: &[char] = &['*', '_'];

/// Text after `Recurso sugerido:` on a marker line, bullets and Markdown
/// emphasis removed; None for any other line.
fn marker_body(line: &str) -> Option<&str> {
  let line = line.trim_start().trim_start_matches(&['-', '*', '•'][..]).trim_start();
  let line = line.trim_start_matches(EMPHASIS);
  let label = MARKER_LABELS
    .iter()
    .find(|l| line.get(..l.len()).is_some_and(|head| head.eq_ignore_ascii_case(l)))?;
  let rest = line[label.len()..].trim_start_matches(EMPHASIS).trim_start();
  let rest = rest.strip_prefix(':')?;
  Some(rest.trim_matches(|c: char| c.is_whitespace() || EMPHASIS.contains(&c)))
}

/// Find `Recurso sugerido: a, b` / `Suggested resource: a; b` lines and split
/// each into its keywords. Lines with no usable keyword are skipped.
pub fn extract_resource_markers(text: &str) -> Vec<Vec<String>> {
  text
    .lines()
    .filter_map(marker_body)
    .filter_map(|body| {
      let keywords: Vec<String> = body
        .split(&[',', ';'][..])
        .map(|k| normalize_text(k.trim_matches(|c: char| c == '*' || c == '_' || c == '.')))
        .filter(|k| !k.is_empty())
        .collect();
      if keywords.is_empty() { None } else { Some(keywords) }
    })
    .collect()
}

/// Turn keyword groups into suggestions, skipping groups that yield no links.
pub fn suggestions_for(
  groups: Vec<Vec<String>>,
  platforms: &BTreeMap<String, String>,
) -> Vec<ResourceSuggestion> {
  groups
    .into_iter()
    .filter_map(|keywords| {
      let links = generate_links(&keywords, platforms);
      if links.is_empty() { None } else { Some(ResourceSuggestion { keywords, links }) }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn links_substitute_joined_keywords_into_every_platform() {
    let platforms = default_platforms();
    let links = generate_links(&["fracciones", "quinto grado"], &platforms);
    assert_eq!(links.len(), platforms.len());
    for (name, url) in &links {
      assert!(url.contains("fracciones+quinto+grado"), "{name}: {url}");
      assert!(!url.contains("{query}"));
    }
    assert_eq!(
      links["Google"],
      "https://www.google.com/search?q=fracciones+quinto+grado"
    );
  }

  #[test]
  fn no_keywords_means_no_links() {
    let empty: [&str; 0] = [];
    assert!(generate_links(&empty, &default_platforms()).is_empty());
    assert!(generate_links(&["  ", ""], &default_platforms()).is_empty());
  }

  #[test]
  fn fragment_collapses_whitespace_and_encodes_reserved_chars() {
    assert_eq!(query_fragment(&["  suma   y resta "]), "suma+y+resta");
    assert_eq!(query_fragment(&["división"]), "divisi%C3%B3n");
    assert_eq!(query_fragment(&["a&b"]), "a%26b");
  }

  #[test]
  fn markers_are_found_in_both_languages() {
    let text = "### RECURSOS\n- Pizarra\n- **Recurso sugerido:** fracciones, quinto grado\nSuggested resource: photosynthesis; plants\nRecurso sugerido:   \n";
    let found = extract_resource_markers(text);
    assert_eq!(
      found,
      vec![
        vec!["fracciones".to_string(), "quinto grado".to_string()],
        vec!["photosynthesis".to_string(), "plants".to_string()],
      ]
    );
  }

  #[test]
  fn marker_label_must_be_followed_by_colon() {
    assert!(extract_resource_markers("Recursos sugeridos para la clase").is_empty());
    assert_eq!(
      extract_resource_markers("* __RECURSOS SUGERIDOS__: mapas."),
      vec![vec!["mapas".to_string()]]
    );
  }

  #[test]
  fn suggestions_skip_empty_groups() {
    let s = suggestions_for(vec![vec![], vec!["mapas".into()]], &default_platforms());
    assert_eq!(s.len(), 1);
    assert_eq!(s[0].keywords, vec!["mapas".to_string()]);
  }
}
