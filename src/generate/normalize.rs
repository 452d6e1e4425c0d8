//! Normalization of externally generated card text
//!
//! The text provider is asked for a JSON object with a `cards` list, but
//! what comes back is raw model output: often fenced in markdown, and
//! often carrying unescaped LaTeX commands (`\alpha`, `\frac`) that are
//! invalid inside JSON strings. The pipeline here is strict-first with
//! one targeted repair pass, and it never fabricates output: a payload
//! that cannot be parsed surfaces as a typed error carrying the original
//! text for diagnostics.

use regex::Regex;
use thiserror::Error;

use super::models::{CardDraft, GeneratedPayload, NormalizedBatch};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("unparsable generated payload: {source}")]
    Parse {
        /// The original raw text, kept for diagnostics and retry prompts
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Normalize one raw generation payload into validated card drafts.
///
/// Entries with an empty question or answer (after trimming) are dropped
/// individually and counted; a few malformed entries never discard an
/// otherwise-good batch.
pub fn normalize_generated(raw: &str) -> Result<NormalizedBatch> {
    let stripped = strip_fences(raw);

    // Strict parse first. A success that left control characters in the
    // strings is not trusted: `"\frac"` is valid JSON (form feed + "rac"),
    // so a LaTeX command can parse cleanly while corrupting the text.
    let strict: Option<GeneratedPayload> = match serde_json::from_str(&stripped) {
        Ok(payload) if !has_control_chars(&payload) => Some(payload),
        Ok(_) => None,
        Err(_) => None,
    };

    let payload: GeneratedPayload = match strict {
        Some(payload) => payload,
        None => {
            let repaired = repair_backslashes(&stripped);
            match serde_json::from_str::<GeneratedPayload>(&repaired) {
                Ok(mut payload) => {
                    log::debug!("generated payload needed backslash repair");
                    if has_control_chars(&payload) {
                        restore_control_chars(&mut payload);
                    }
                    payload
                }
                Err(source) => {
                    return Err(GenerateError::Parse { raw: raw.to_string(), source });
                }
            }
        }
    };

    let mut drafts = Vec::new();
    let mut dropped = 0;
    for entry in payload.cards {
        let question = entry.question.trim();
        let answer = entry.answer.trim();
        if question.is_empty() || answer.is_empty() {
            dropped += 1;
            continue;
        }
        drafts.push(CardDraft {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    if dropped > 0 {
        log::warn!("dropped {} incomplete generated entries", dropped);
    }
    Ok(NormalizedBatch { drafts, dropped })
}

/// Whether any question or answer carries an ASCII control character,
/// the footprint of a LaTeX command swallowed by a valid JSON escape.
fn has_control_chars(payload: &GeneratedPayload) -> bool {
    payload
        .cards
        .iter()
        .flat_map(|entry| [&entry.question, &entry.answer])
        .any(|s| s.chars().any(|c| (c as u32) < 0x20))
}

/// Rewrite control characters that survived the repair back into their
/// literal backslash-letter form.
///
/// The repair pass keeps `\n`, `\t` and `\r` as JSON escapes, so a LaTeX
/// command starting with one of those letters (`\times`, `\theta`,
/// `\neq`, `\rho`) parses as a control character plus the command tail.
/// In card text a control character is never intentional; turning it back
/// into backslash-plus-letter recovers the command.
fn restore_control_chars(payload: &mut GeneratedPayload) {
    for entry in &mut payload.cards {
        entry.question = restore_string(&entry.question);
        entry.answer = restore_string(&entry.answer);
    }
}

fn restore_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        match c {
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Remove surrounding markdown code fences, with or without a language tag.
fn strip_fences(raw: &str) -> String {
    let opening = Regex::new(r"^```[A-Za-z]*[ \t]*\r?\n?").unwrap();

    let mut s = raw.trim();
    let trimmed = opening.replace(s, "");
    s = trimmed.trim();
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }
    s.to_string()
}

/// Escape every backslash that precedes a letter, then restore the valid
/// escape sequences the blanket rule would have broken.
///
/// LaTeX commands (`\alpha`, `\frac`) are the characteristic failure: a
/// lone backslash before a letter is invalid JSON, so it gets doubled
/// into a literal backslash. The valid letter escapes `\n`, `\t` and `\r`
/// are kept as-is, and a backslash pair is already an escape and passes
/// through untouched (quote and backslash escapes are not letters, so the
/// blanket rule never sees them). A command starting with one of those
/// letters, such as `\theta`, therefore still parses as the control
/// character here; [`restore_control_chars`] recovers it after the parse.
fn repair_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek().copied() {
            Some('\\') => {
                chars.next();
                out.push_str("\\\\");
            }
            Some(next @ ('n' | 't' | 'r')) => {
                chars.next();
                out.push('\\');
                out.push(next);
            }
            Some(next) if next.is_ascii_alphabetic() => {
                chars.next();
                out.push_str("\\\\");
                out.push(next);
            }
            _ => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_payload() {
        let batch =
            normalize_generated(r#"{"cards":[{"question":"Q","answer":"A"}]}"#).unwrap();
        assert_eq!(batch.drafts.len(), 1);
        assert_eq!(batch.dropped, 0);
        assert_eq!(batch.drafts[0].question, "Q");
    }

    #[test]
    fn test_fenced_payload_with_latex() {
        let raw = "```json\n{\"cards\":[{\"question\":\"Q\",\"answer\":\"\\alpha\"}]}\n```";
        let batch = normalize_generated(raw).unwrap();

        assert_eq!(batch.dropped, 0);
        assert_eq!(batch.drafts.len(), 1);
        assert_eq!(batch.drafts[0].answer, "\\alpha");
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "```\n{\"cards\":[]}\n```";
        let batch = normalize_generated(raw).unwrap();
        assert!(batch.drafts.is_empty());
        assert_eq!(batch.dropped, 0);
    }

    #[test]
    fn test_latex_commands_with_escape_letter_prefix() {
        // \t and \n are valid JSON escapes, so \times and \neq parse as a
        // control character plus the command tail; the restoration pass
        // must hand back the literal commands.
        let raw = r#"{"cards":[
            {"question":"2 \times 2","answer":"\theta = \neq"},
            {"question":"Q","answer":"\rho"}
        ]}"#;
        let batch = normalize_generated(raw).unwrap();

        assert_eq!(batch.drafts[0].question, r"2 \times 2");
        assert_eq!(batch.drafts[0].answer, r"\theta = \neq");
        assert_eq!(batch.drafts[1].answer, r"\rho");
    }

    #[test]
    fn test_mixed_escape_and_command() {
        let raw = r#"{"cards":[{"question":"line\nbreak","answer":"\frac{1}{2}"}]}"#;
        let batch = normalize_generated(raw).unwrap();

        // The newline survives the parse and is textualized alongside the
        // repaired command; card text never keeps raw control characters.
        assert_eq!(batch.drafts[0].question, r"line\nbreak");
        assert_eq!(batch.drafts[0].answer, r"\frac{1}{2}");
    }

    #[test]
    fn test_latex_command_hidden_behind_valid_escape() {
        // "\frac" parses strictly as form feed + "rac"; the control
        // character must trigger the repair path instead.
        let raw = r#"{"cards":[{"question":"Q","answer":"\frac{1}{2}"}]}"#;
        let batch = normalize_generated(raw).unwrap();
        assert_eq!(batch.drafts[0].answer, "\\frac{1}{2}");
    }

    #[test]
    fn test_empty_question_dropped_with_count() {
        let raw = r#"{"cards":[{"question":"","answer":"A"}]}"#;
        let batch = normalize_generated(raw).unwrap();
        assert!(batch.drafts.is_empty());
        assert_eq!(batch.dropped, 1);
    }

    #[test]
    fn test_partial_batch_survives() {
        let raw = r#"{"cards":[
            {"question":"good","answer":"card"},
            {"question":"   ","answer":"whitespace only"},
            {"question":"missing answer"}
        ]}"#;
        let batch = normalize_generated(raw).unwrap();
        assert_eq!(batch.drafts.len(), 1);
        assert_eq!(batch.dropped, 2);
    }

    #[test]
    fn test_unrecoverable_payload_keeps_raw_text() {
        let raw = "the model replied with prose instead of JSON";
        let err = normalize_generated(raw).unwrap_err();
        let GenerateError::Parse { raw: kept, .. } = err;
        assert_eq!(kept, raw);
    }

    #[test]
    fn test_drafts_are_trimmed() {
        let raw = r#"{"cards":[{"question":"  Q  ","answer":"  A  "}]}"#;
        let batch = normalize_generated(raw).unwrap();
        assert_eq!(batch.drafts[0], CardDraft { question: "Q".into(), answer: "A".into() });
    }

    #[test]
    fn test_repair_preserves_escaped_backslash_pairs() {
        assert_eq!(repair_backslashes(r"a\\b"), r"a\\b");
        assert_eq!(repair_backslashes(r"\alpha"), r"\\alpha");
        assert_eq!(repair_backslashes(r"\n"), r"\n");
        assert_eq!(repair_backslashes(r"end\"), r"end\");
    }
}
