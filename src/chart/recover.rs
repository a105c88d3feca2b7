use log::{debug, info, warn};
use regex::Regex;
use serde_json::Value;

use crate::chart::feedback::{format_bullets, FeedbackRecord, LIST_FIELDS};
use crate::chart::lenient::{lenient_values, strip_code_fence};
use crate::error::AppError;

/// Which recovery tier produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    /// The reply was valid JSON (possibly inside a markdown fence)
    Strict,
    /// Valid after relaxing the grammar (trailing commas, single quotes, ...)
    Lenient,
    /// Scraped field by field with regexes
    Pattern,
}

/// A record together with the tier that recovered it.
#[derive(Debug, Clone)]
pub struct Recovered {
    pub record: FeedbackRecord,
    pub tier: ParseTier,
}

/// Turn a model reply into a `FeedbackRecord` using a 3-tier cascade:
///
/// 1. strict JSON
/// 2. lenient JSON
/// 3. per-field regex extraction
///
/// All five fields must be recovered by a single tier; partial records are never returned.
pub fn recover_feedback(raw: &str) -> Result<Recovered, AppError> {
    if let Some(record) = try_strict(raw) {
        debug!("[recover] strict JSON parse succeeded");
        return Ok(Recovered {
            record,
            tier: ParseTier::Strict,
        });
    }
    if let Some(record) = try_lenient(raw) {
        info!("[recover] reply was not strict JSON; lenient parse succeeded");
        return Ok(Recovered {
            record,
            tier: ParseTier::Lenient,
        });
    }
    match try_patterns(raw) {
        Ok(record) => {
            info!("[recover] JSON parsing failed; recovered fields by pattern extraction");
            Ok(Recovered {
                record,
                tier: ParseTier::Pattern,
            })
        }
        Err(missing) => {
            warn!(
                "[recover] No tier could read the reply ({} chars); missing fields: {}",
                raw.len(),
                missing.join(", ")
            );
            Err(AppError::UnparseableResponse { missing })
        }
    }
}

/// Render a parsed JSON value as field text. Arrays become bullet lists.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            Some(format_bullets(&items))
        }
        _ => None,
    }
}

fn record_from_value(value: &Value) -> Option<FeedbackRecord> {
    let object = value.as_object()?;
    FeedbackRecord::from_fields(|field| object.get(field).and_then(field_text)).ok()
}

/// Tier 1: standard JSON, as-is or unwrapped from a markdown fence.
pub fn try_strict(raw: &str) -> Option<FeedbackRecord> {
    [raw.trim(), strip_code_fence(raw)]
        .into_iter()
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find_map(|value| record_from_value(&value))
}

/// Tier 2: the relaxed grammar in `lenient`. The first candidate object holding every field wins.
pub fn try_lenient(raw: &str) -> Option<FeedbackRecord> {
    lenient_values(raw).find_map(|value| record_from_value(&value))
}

/// Tier 3: scrape each field independently. On failure returns the fields nothing matched.
pub fn try_patterns(raw: &str) -> Result<FeedbackRecord, Vec<&'static str>> {
    FeedbackRecord::from_fields(|field| extract_field(raw, field))
}

/// First non-blank match for `field`, trying list, backtick, multi-line quoted, then single-line quoted.
pub fn extract_field(raw: &str, field: &str) -> Option<String> {
    let key = regex::escape(field);
    let list = if LIST_FIELDS.iter().any(|f| *f == field) {
        extract_list(raw, &key)
    } else {
        None
    };

    list.or_else(|| extract_backtick(raw, &key))
        .or_else(|| extract_quoted_multiline(raw, &key))
        .or_else(|| extract_quoted_line(raw, &key))
        .filter(|value| !value.trim().is_empty())
}

/// `"field": ["a", "b"]` rendered as bullets.
fn extract_list(raw: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#"(?s)"{}"\s*:\s*\[((?:\s*"(?:[^"\\]|\\.)*"\s*,?)*)\s*\]"#,
        key
    ))
    .ok()?;
    let body = re.captures(raw)?.get(1)?.as_str();

    let item_re = Regex::new(r#"(?s)"((?:[^"\\]|\\.)*)""#).ok()?;
    let items: Vec<String> = item_re
        .captures_iter(body)
        .map(|cap| unescape(&cap[1]))
        .collect();
    if items.is_empty() {
        return None;
    }
    Some(format_bullets(&items))
}

/// `"field": `...`` captured verbatim, newlines and all.
fn extract_backtick(raw: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r#""{}"\s*:\s*`([^`]*)`"#, key)).ok()?;
    Some(re.captures(raw)?[1].to_string())
}

/// `"field": "..."` spanning lines, ending at a quote followed by the next key or by a
/// closing brace that ends its line. Unescaped quotes inside the value are kept.
fn extract_quoted_multiline(raw: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#"(?sm)"{}"\s*:\s*"((?:[^\\]|\\.)*?)"\s*(?:,\s*"[A-Za-z_][A-Za-z0-9_]*"\s*:|,?\s*\}}\s*(?:```)?\s*$)"#,
        key
    ))
    .ok()?;
    Some(unescape(&re.captures(raw)?[1]))
}

/// `"field": "..."` on a single line, up to the last quote on that line.
fn extract_quoted_line(raw: &str, key: &str) -> Option<String> {
    let re = Regex::new(&format!(r#""{}"\s*:\s*"([^\n]*)""#, key)).ok()?;
    Some(unescape(&re.captures(raw)?[1]))
}

/// Undo JSON-style escapes in a scraped value. Unknown escapes are kept as written.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::feedback::REQUIRED_FIELDS;

    const CANONICAL: &str = r#"{"strengths": ["Clear axis"], "weaknesses": ["No title"], "suggestions": ["Add title"], "roast": "Bland.", "plotCode": "Plot.plot({})"}"#;

    fn canonical_record() -> FeedbackRecord {
        FeedbackRecord {
            strengths: "• Clear axis".into(),
            weaknesses: "• No title".into(),
            suggestions: "• Add title".into(),
            roast: "Bland.".into(),
            plot_code: "Plot.plot({})".into(),
        }
    }

    #[test]
    fn test_strict_end_to_end() {
        let recovered = recover_feedback(CANONICAL).unwrap();
        assert_eq!(recovered.tier, ParseTier::Strict);
        assert_eq!(recovered.record, canonical_record());
    }

    #[test]
    fn test_strict_string_fields_pass_through() {
        let raw = r#"{"strengths": "Good colors", "weaknesses": "Tiny font", "suggestions": "Bigger font", "roast": "Squint-worthy.", "plotCode": "Plot.plot({marks: [Plot.barY(data, {x: \"a\", y: \"b\"})]})", "extra": 1}"#;
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Strict);
        assert_eq!(recovered.record.strengths, "Good colors");
        assert_eq!(
            recovered.record.plot_code,
            r#"Plot.plot({marks: [Plot.barY(data, {x: "a", y: "b"})]})"#
        );
    }

    #[test]
    fn test_strict_inside_markdown_fence() {
        let raw = format!("```json\n{}\n```", CANONICAL);
        let recovered = recover_feedback(&raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Strict);
        assert_eq!(recovered.record, canonical_record());
    }

    #[test]
    fn test_array_fields_bulleted_in_order() {
        let raw = r#"{"strengths": ["A", "B", "C"], "weaknesses": [], "suggestions": ["x", 3], "roast": "r", "plotCode": "p"}"#;
        let record = recover_feedback(raw).unwrap().record;
        assert_eq!(record.strengths, "• A\n• B\n• C");
        assert_eq!(record.weaknesses, "• ");
        assert_eq!(record.suggestions, "• x\n• 3");
    }

    #[test]
    fn test_lenient_matches_canonical() {
        let raw = "{strengths: ['Clear axis',], weaknesses: ['No title'], suggestions: ['Add title'], roast: 'Bland.', plotCode: 'Plot.plot({})',}";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Lenient);
        assert_eq!(recovered.record, canonical_record());
    }

    #[test]
    fn test_lenient_handles_commentary_and_raw_newlines() {
        let raw = "Here is my analysis:\n{\"strengths\": [\"Clear axis\"], \"weaknesses\": [\"No title\"], \"suggestions\": [\"Add title\"], \"roast\": \"Bland.\", \"plotCode\": \"Plot.plot({\n  marks: []\n})\"}\nLet me know!";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Lenient);
        assert_eq!(recovered.record.plot_code, "Plot.plot({\n  marks: []\n})");
    }

    #[test]
    fn test_pattern_backtick_plot_code_keeps_newlines() {
        let raw = "{\"strengths\": [\"Clear axis\"], \"weaknesses\": [\"No title\"], \"suggestions\": [\"Add title\"], \"roast\": \"Bland.\", \"plotCode\": `Plot.plot({\n  marks: [...]\n})`}";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Pattern);
        assert_eq!(recovered.record.plot_code, "Plot.plot({\n  marks: [...]\n})");
        assert_eq!(recovered.record.strengths, "• Clear axis");
        assert_eq!(recovered.record.roast, "Bland.");
    }

    #[test]
    fn test_pattern_unescapes_quotes_and_backslashes() {
        // The missing comma before "roast" breaks both JSON tiers.
        let raw = "{\"strengths\": [\"Uses \\\"real\\\" data\"], \"weaknesses\": [\"Path C:\\\\tmp\"], \"suggestions\": [\"Add title\"] \"roast\": \"She said \\\"meh\\\".\", \"plotCode\": \"Plot.text([\\\"a\\\\b\\\"])\"}";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Pattern);
        assert_eq!(recovered.record.strengths, "• Uses \"real\" data");
        assert_eq!(recovered.record.weaknesses, "• Path C:\\tmp");
        assert_eq!(recovered.record.roast, "She said \"meh\".");
        assert_eq!(recovered.record.plot_code, "Plot.text([\"a\\b\"])");
    }

    #[test]
    fn test_pattern_multiline_quoted_value() {
        // Stray semicolons make the document invalid even for the lenient reader.
        let raw = "{;; \"strengths\": \"Good\", \"weaknesses\": \"Busy\", \"suggestions\": \"Trim\", \"roast\": \"Too much\nink.\", \"plotCode\": \"Plot.plot({\n  y: {grid: true}\n})\"}";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Pattern);
        assert_eq!(recovered.record.strengths, "Good");
        assert_eq!(recovered.record.roast, "Too much\nink.");
        assert_eq!(recovered.record.plot_code, "Plot.plot({\n  y: {grid: true}\n})");
    }

    #[test]
    fn test_pattern_plot_code_with_raw_quotes_and_newlines() {
        let raw = "{\"strengths\": [\"Clear axis\"], \"weaknesses\": [\"No title\"], \"suggestions\": [\"Add title\"], \"roast\": \"Bland.\", \"plotCode\": \"Plot.plot({\n  marks: [Plot.barY(data, {x: \"month\", y: \"sales\"})]\n})\"\n}";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Pattern);
        assert_eq!(
            recovered.record.plot_code,
            "Plot.plot({\n  marks: [Plot.barY(data, {x: \"month\", y: \"sales\"})]\n})"
        );
        assert_eq!(recovered.record.roast, "Bland.");
    }

    #[test]
    fn test_pattern_single_line_keeps_raw_quotes() {
        assert_eq!(
            extract_field("\"plotCode\": \"Plot.dot(data, {x: \"a\"}).plot()\" <- try this", "plotCode"),
            Some("Plot.dot(data, {x: \"a\"}).plot()".to_string())
        );
    }

    #[test]
    fn test_lenient_skips_stray_braces() {
        let raw = "Sure {ok} here: {strengths: ['a'], weaknesses: ['b'], suggestions: ['c'], roast: 'r', plotCode: 'p'} } :}";
        let recovered = recover_feedback(raw).unwrap();
        assert_eq!(recovered.tier, ParseTier::Lenient);
        assert_eq!(recovered.record.strengths, "• a");
        assert_eq!(recovered.record.plot_code, "p");
    }

    #[test]
    fn test_pattern_single_line_fallback() {
        assert_eq!(
            extract_field("\"roast\": \"Bland.\" and then the model rambled", "roast"),
            Some("Bland.".to_string())
        );
    }

    #[test]
    fn test_partial_extraction_is_total_failure() {
        let raw = "\"strengths\": [\"Clear axis\"], \"roast\": \"Bland.\"";
        match recover_feedback(raw).unwrap_err() {
            AppError::UnparseableResponse { missing } => {
                assert_eq!(missing, vec!["weaknesses", "suggestions", "plotCode"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_values_do_not_count() {
        let raw = "{\"strengths\": \"a\", \"weaknesses\": \"b\", \"suggestions\": \"c\", \"roast\": \"   \", \"plotCode\": `x` !!";
        match recover_feedback(raw).unwrap_err() {
            AppError::UnparseableResponse { missing } => assert_eq!(missing, vec!["roast"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_and_unrelated_text_fail() {
        for raw in ["", "   ", "I'm sorry, I can't see an image in your message."] {
            match recover_feedback(raw).unwrap_err() {
                AppError::UnparseableResponse { missing } => {
                    assert_eq!(missing, REQUIRED_FIELDS.to_vec())
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_strict_missing_key_falls_through() {
        let raw = r#"{"strengths": ["a"], "weaknesses": ["b"], "suggestions": ["c"], "plotCode": "p"}"#;
        assert!(try_strict(raw).is_none());
        assert!(try_lenient(raw).is_none());
        assert_eq!(try_patterns(raw).unwrap_err(), vec!["roast"]);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a \"b\" c"#), "a \"b\" c");
        assert_eq!(unescape(r"C:\\dir"), "C:\\dir");
        assert_eq!(unescape(r"line\nnext"), "line\nnext");
        assert_eq!(unescape(r"\u00e9 \q"), "\\u00e9 \\q");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }
}
