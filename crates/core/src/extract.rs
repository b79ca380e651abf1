//! Structured parameter extraction from generated text.
//!
//! Models asked for "a dictionary" reply with anything from clean JSON to a
//! Python literal wrapped in prose or a code fence. The extractor looks for
//! the first `{`, parses one object from there and ignores whatever follows.
//! If strict JSON fails, the object text is normalized (single quoted strings
//! become double quoted ones, `True`/`False`/`None` become JSON literals) and
//! parsed again.
//!
//! This stays a best-effort parse: nothing forces the model to answer with a
//! well-formed object.

use serde_json::{Deserializer, Map, Value};
use thiserror::Error;

/// Why no parameter set could be extracted.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The text contains no `{ ... }` pair.
    #[error("no object found in the generated text")]
    MissingObject,
    /// The object could not be parsed, even after normalization.
    #[error("malformed object: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Extracts a parameter set from generated text.
pub fn parameters(text: &str) -> Result<Map<String, Value>, ExtractionError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ExtractionError::MissingObject);
    };
    if end < start {
        return Err(ExtractionError::MissingObject);
    }

    let candidate = &text[start..];
    let strict_err = match parse_leading_object(candidate) {
        Ok(map) => return Ok(map),
        Err(err) => err,
    };
    trace!("strict parse failed ({strict_err}), normalizing");

    let normalized = normalize(&text[start..=end]);
    parse_leading_object(&normalized).map_err(ExtractionError::Malformed)
}

/// Parses the object at the start of `text`, ignoring anything after it.
fn parse_leading_object(text: &str) -> Result<Map<String, Value>, serde_json::Error> {
    let mut stream = Deserializer::from_str(text).into_iter::<Map<String, Value>>();
    match stream.next() {
        Some(result) => result,
        None => serde_json::from_str(text),
    }
}

/// Rewrites Python-literal syntax into JSON.
///
/// Quotes are only swapped at string boundaries, so an apostrophe inside a
/// double quoted string survives untouched.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => match c {
                '\\' => {
                    let Some(escaped) = chars.next() else {
                        out.push(c);
                        break;
                    };
                    if escaped == '\'' {
                        out.push('\'');
                    } else {
                        out.push('\\');
                        out.push(escaped);
                    }
                }
                c if c == q => {
                    out.push('"');
                    quote = None;
                }
                '"' => out.push_str("\\\""),
                c => out.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    out.push('"');
                    quote = Some(c);
                }
                c if c.is_ascii_alphabetic() => {
                    let mut word = String::from(c);
                    while let Some(&next) = chars.peek() {
                        if !next.is_ascii_alphanumeric() && next != '_' {
                            break;
                        }
                        word.push(next);
                        chars.next();
                    }
                    out.push_str(match word.as_str() {
                        "True" => "true",
                        "False" => "false",
                        "None" => "null",
                        _ => &word,
                    });
                }
                c => out.push(c),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_surrounding_text() {
        let params = parameters(r#"prefix {"a": 1, "b": 2} suffix"#).unwrap();
        assert_eq!(params, object(json!({ "a": 1, "b": 2 })));
        assert_eq!(params.keys().collect::<Vec<_>>(), ["a", "b"]);

        let fenced = "Sure!\n```json\n{\"path\": \"/tmp\", \"depth\": 2}\n```\nDone {really}";
        assert_eq!(
            parameters(fenced).unwrap(),
            object(json!({ "path": "/tmp", "depth": 2 }))
        );
    }

    #[test]
    fn test_python_literals() {
        let params =
            parameters("{'name': 'Ada', 'admin': True, 'note': None, 'tags': ['x']}")
                .unwrap();
        assert_eq!(
            params,
            object(json!({
                "name": "Ada",
                "admin": true,
                "note": null,
                "tags": ["x"],
            }))
        );

        let params = parameters(r#"{'text': "it's fine", 'quote': 'say "hi"'}"#).unwrap();
        assert_eq!(
            params,
            object(json!({ "text": "it's fine", "quote": "say \"hi\"" }))
        );
    }

    #[test]
    fn test_nested_objects() {
        let params = parameters(r#"{"outer": {"inner": [1, 2]}} and {"other": 1}"#).unwrap();
        assert_eq!(params, object(json!({ "outer": { "inner": [1, 2] } })));
    }

    #[test]
    fn test_missing_object() {
        assert!(matches!(
            parameters("a = 1, b = 2"),
            Err(ExtractionError::MissingObject)
        ));
        assert!(matches!(
            parameters("} backwards {"),
            Err(ExtractionError::MissingObject)
        ));
        assert!(matches!(parameters(""), Err(ExtractionError::MissingObject)));
    }

    #[test]
    fn test_malformed_object() {
        assert!(matches!(
            parameters("{a: 1}"),
            Err(ExtractionError::Malformed(_))
        ));
        assert!(matches!(
            parameters("{\"a\": }"),
            Err(ExtractionError::Malformed(_))
        ));
    }
}
