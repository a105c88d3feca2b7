//! A forgiving JSON reader for model replies.
//!
//! Accepts the usual ways models bend JSON: trailing commas, unquoted keys,
//! single-quoted strings, `//` and `/* */` comments, raw newlines inside
//! strings, a surrounding markdown fence and chatter around the object.
//! The input is rewritten into strict JSON and handed to `serde_json`.

use serde_json::Value;

/// Remove a surrounding ```json (or bare ```) fence.
pub fn strip_code_fence(value: &str) -> &str {
    let trimmed = value.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (e.g. `json`) up to the end of the opening line.
    let body = match rest.find('\n') {
        Some(pos) if rest[..pos].chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => &rest[pos + 1..],
        _ => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Candidate `{ ... }` spans: every balanced object in order of its opening brace,
/// then the span from the first `{` to the last `}`. Quoted text is skipped when
/// counting braces, so stray braces in commentary or strings do not spoil the match.
pub fn object_candidates(value: &str) -> Vec<&str> {
    let bytes = value.as_bytes();
    let mut spans: Vec<&str> = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'{')
        .filter_map(|(start, _)| balanced_end(bytes, start).map(|end| &value[start..=end]))
        .collect();

    if let (Some(start), Some(end)) = (value.find('{'), value.rfind('}')) {
        if end > start && !spans.contains(&&value[start..=end]) {
            spans.push(&value[start..=end]);
        }
    }
    spans
}

/// Index of the `}` closing the `{` at `start`.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Every candidate object in `raw` that reads as JSON under the relaxed grammar.
pub fn lenient_values(raw: &str) -> impl Iterator<Item = Value> + '_ {
    object_candidates(strip_code_fence(raw))
        .into_iter()
        .filter_map(|candidate| serde_json::from_str(&normalize(candidate)?).ok())
}

/// Parse `raw` with the relaxed grammar. Returns `None` if it still is not JSON.
pub fn parse_lenient(raw: &str) -> Option<Value> {
    lenient_values(raw).next()
}

/// Rewrite relaxed JSON into strict JSON. `None` on an unterminated string or comment.
pub fn normalize(input: &str) -> Option<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                i = read_string(&chars, i, &mut out)?;
            }
            '/' if chars.get(i + 1) == Some(&'/') || chars.get(i + 1) == Some(&'*') => {
                i = skip_comment(&chars, i)?;
            }
            ',' => {
                let next = skip_trivia(&chars, i + 1)?;
                if !matches!(chars.get(next), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                // Numbers pass through whole so exponents are not mistaken for keys.
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '-' | '+' | '.'))
                {
                    if chars[i] != '+' || i > 0 && matches!(chars[i - 1], 'e' | 'E') {
                        out.push(chars[i]);
                    }
                    i += 1;
                }
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "true" | "false" | "null" => out.push_str(&word),
                    _ => {
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Some(out)
}

/// Copy the string starting at `chars[start]` (a quote) into `out` as a strict JSON string.
/// Returns the index just past the closing quote.
fn read_string(chars: &[char], start: usize, out: &mut String) -> Option<usize> {
    let quote = chars[start];
    let mut i = start + 1;
    out.push('"');

    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            out.push('"');
            return Some(i + 1);
        }
        match c {
            '\\' => {
                let escaped = *chars.get(i + 1)?;
                match escaped {
                    '\'' => out.push('\''),
                    '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u' => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    '\n' => {}
                    other => out.push(other),
                }
                i += 2;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            '\n' => {
                out.push_str("\\n");
                i += 1;
            }
            '\r' => {
                out.push_str("\\r");
                i += 1;
            }
            '\t' => {
                out.push_str("\\t");
                i += 1;
            }
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    None
}

fn skip_comment(chars: &[char], start: usize) -> Option<usize> {
    if chars[start + 1] == '/' {
        let mut i = start + 2;
        while i < chars.len() && chars[i] != '\n' {
            i += 1;
        }
        Some(i)
    } else {
        let mut i = start + 2;
        while i + 1 < chars.len() {
            if chars[i] == '*' && chars[i + 1] == '/' {
                return Some(i + 2);
            }
            i += 1;
        }
        None
    }
}

/// Index of the next character that is neither whitespace nor part of a comment.
fn skip_trivia(chars: &[char], mut i: usize) -> Option<usize> {
    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if chars.get(i) == Some(&'/') && matches!(chars.get(i + 1), Some('/') | Some('*')) {
            i = skip_comment(chars, i)?;
        } else {
            return Some(i);
        }
    }
}
