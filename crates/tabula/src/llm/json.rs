// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Pulling JSON and SQL out of chatty model output.

use serde_json::Value;

/// Finds the first JSON document in `content`: a fenced ```json block, the
/// whole text, or the first balanced `{...}` / `[...]` span that parses.
pub fn extract_json(content: &str) -> Option<Value> {
    if let Some(block) = fenced_block(content, "json") {
        if let Ok(value) = serde_json::from_str(block) {
            return Some(value);
        }
    }
    if let Ok(value) = serde_json::from_str(content.trim()) {
        return Some(value);
    }
    let start = content.find(['{', '['])?;
    balanced_span(&content[start..]).and_then(|span| serde_json::from_str(span).ok())
}

/// Strips a ```sql (or bare ```) fence and a trailing semicolon.
pub fn extract_sql(content: &str) -> String {
    let body = fenced_block(content, "sql")
        .or_else(|| fenced_block(content, ""))
        .unwrap_or(content);
    body.trim().trim_end_matches(';').trim().to_string()
}

fn fenced_block<'a>(content: &'a str, tag: &str) -> Option<&'a str> {
    let opener = format!("```{tag}");
    let start = content.find(&opener)? + opener.len();
    let rest = &content[start..];
    // skip to the end of the opening line
    let body_start = rest.find('\n').map_or(0, |i| i + 1);
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn balanced_span(content: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;
    for (i, ch) in content.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&content[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_is_preferred() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nand {\"b\": 2}";
        assert_eq!(extract_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn balanced_object_inside_prose() {
        let text = r#"Sure! {"config": {"title": "a } in a string"}} Hope that helps."#;
        assert_eq!(
            extract_json(text),
            Some(json!({"config": {"title": "a } in a string"}}))
        );
    }

    #[test]
    fn arrays_are_found_too() {
        let text = "The sections are [{\"section\": \"SELECT\"}]";
        assert_eq!(extract_json(text), Some(json!([{"section": "SELECT"}])));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn sql_fences_and_semicolons_are_stripped() {
        assert_eq!(
            extract_sql("```sql\nSELECT * FROM unicorns;\n```"),
            "SELECT * FROM unicorns"
        );
        assert_eq!(extract_sql("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(extract_sql("  SELECT 2;  "), "SELECT 2");
    }
}
