//! Reference parser for `{name}`, `{{name}}` and `${...}` syntax
//!
//! Scans a string left to right and returns every reference with its byte
//! span. Forms are tried in priority order: structured, braced, simple.
//! Text that looks like a simple or braced reference but does not hold a
//! usable name (JSON objects, empty braces) is left as literal text; a
//! malformed structured reference is an error.

use std::iter::Peekable;
use std::ops::Range;
use std::str::Chars;

use courier_domain::{PathSegment, ReferenceExpression};

use crate::error::ReferenceError;

/// A reference found in an input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    /// The parsed expression.
    pub expression: ReferenceExpression,

    /// Byte range in the original string where this reference appears.
    pub span: Range<usize>,
}

/// Parses a string and extracts all reference expressions.
///
/// # Errors
///
/// Returns [`ReferenceError::Parse`] if a `${` is never closed or its
/// content does not follow the segment grammar.
///
/// # Examples
///
/// ```
/// use courier_application::variable_resolver::parser::parse_references;
/// use courier_domain::ReferenceExpression;
///
/// let refs = parse_references("{{host}}/users/{id}").unwrap();
/// assert_eq!(refs[0].expression, ReferenceExpression::Braced("host".into()));
/// assert_eq!(refs[1].expression, ReferenceExpression::Simple("id".into()));
/// ```
pub fn parse_references(input: &str) -> Result<Vec<ParsedReference>, ReferenceError> {
    let bytes = input.as_bytes();
    let mut references = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'$' if bytes.get(pos + 1) == Some(&b'{') => {
                let end = find_structured_end(bytes, pos + 2).ok_or_else(|| {
                    ReferenceError::Parse {
                        position: pos,
                        message: "unterminated structured reference".to_string(),
                    }
                })?;
                let segments = parse_segments(&input[pos + 2..end])
                    .map_err(|message| ReferenceError::Parse {
                        position: pos,
                        message,
                    })?;
                references.push(ParsedReference {
                    expression: ReferenceExpression::Structured(segments),
                    span: pos..end + 1,
                });
                pos = end + 1;
            }
            b'{' => {
                if let Some(found) = braced_at(input, pos).or_else(|| simple_at(input, pos)) {
                    pos = found.span.end;
                    references.push(found);
                } else {
                    pos += 1;
                }
            }
            _ => pos += 1,
        }
    }

    Ok(references)
}

/// Validates a variable name usable in the `{name}` form.
/// Valid names: a letter or underscore, then alphanumerics, `_`, `-` or `.`.
#[must_use]
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn braced_at(input: &str, start: usize) -> Option<ParsedReference> {
    let rest = input.get(start..)?.strip_prefix("{{")?;
    let close = rest.find("}}")?;
    let name = rest[..close].trim();
    if name.is_empty() || name.contains(['{', '}']) {
        return None;
    }
    Some(ParsedReference {
        expression: ReferenceExpression::Braced(name.to_string()),
        span: start..start + 2 + close + 2,
    })
}

fn simple_at(input: &str, start: usize) -> Option<ParsedReference> {
    let rest = input.get(start + 1..)?;
    let close = rest.find('}')?;
    let name = rest[..close].trim();
    if !is_valid_variable_name(name) {
        return None;
    }
    Some(ParsedReference {
        expression: ReferenceExpression::Simple(name.to_string()),
        span: start..start + 1 + close + 1,
    })
}

/// Returns the index of the `}` closing a structured reference whose body
/// starts at `start`. Braces inside double-quoted strings do not count.
fn find_structured_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_quote = false;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'"' => in_quote = !in_quote,
            b'{' if !in_quote => depth += 1,
            b'}' if !in_quote => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Splits the body of a structured reference into segments:
/// `"literal"` or `jsonPath("expr")`, separated by `.`.
fn parse_segments(inner: &str) -> Result<Vec<PathSegment>, String> {
    let mut chars = inner.chars().peekable();
    let mut segments = Vec::new();

    loop {
        skip_whitespace(&mut chars);
        match chars.peek() {
            Some('"') => {
                chars.next();
                segments.push(PathSegment::Literal(read_quoted(&mut chars)?));
            }
            Some(_) => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_alphanumeric() && c != '_' {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                if ident != "jsonPath" {
                    let found = if ident.is_empty() {
                        chars.peek().map(ToString::to_string).unwrap_or_default()
                    } else {
                        ident
                    };
                    return Err(format!(
                        "expected a quoted segment or jsonPath(...), found '{found}'"
                    ));
                }
                expect(&mut chars, '(')?;
                expect(&mut chars, '"')?;
                let expression = read_quoted(&mut chars)?;
                expect(&mut chars, ')')?;
                segments.push(PathSegment::JsonPath(expression));
            }
            None if segments.is_empty() => return Err("empty structured reference".to_string()),
            None => return Err("expected a segment after '.'".to_string()),
        }

        skip_whitespace(&mut chars);
        match chars.next() {
            None => return Ok(segments),
            Some('.') => {}
            Some(c) => return Err(format!("expected '.' between segments, found '{c}'")),
        }
    }
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn expect(chars: &mut Peekable<Chars<'_>>, wanted: char) -> Result<(), String> {
    skip_whitespace(chars);
    match chars.next() {
        Some(c) if c == wanted => Ok(()),
        Some(c) => Err(format!("expected '{wanted}', found '{c}'")),
        None => Err(format!("expected '{wanted}', found end of reference")),
    }
}

/// Reads up to the closing quote; the opening quote is already consumed.
fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, String> {
    let mut text = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(escaped) => text.push(escaped),
                None => return Err("dangling escape".to_string()),
            },
            Some('"') => return Ok(text),
            Some(c) => text.push(c),
            None => return Err("unterminated string".to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn literal(text: &str) -> PathSegment {
        PathSegment::Literal(text.to_string())
    }

    #[test]
    fn test_parse_braced_variable() {
        let refs = parse_references("{{ name }}").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].expression, ReferenceExpression::Braced("name".into()));
        assert_eq!(refs[0].span, 0..10);
    }

    #[test]
    fn test_parse_simple_variable() {
        let refs = parse_references("/users/{userId}/orders").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].expression, ReferenceExpression::Simple("userId".into()));
        assert_eq!(refs[0].span, 7..15);
    }

    #[test]
    fn test_parse_multiple_variables() {
        let refs = parse_references("https://{{host}}:{port}/{{path}}?key={{api_key}}").unwrap();
        let names: Vec<_> = refs
            .iter()
            .filter_map(|r| r.expression.variable_name())
            .collect();
        assert_eq!(names, vec!["host", "port", "path", "api_key"]);
    }

    #[test]
    fn test_json_objects_are_not_references() {
        let refs = parse_references(r#"{"name": "{{user_name}}", "nested": {}}"#).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].expression, ReferenceExpression::Braced("user_name".into()));
    }

    #[test]
    fn test_empty_and_unclosed_braces_are_literal() {
        assert!(parse_references("{{}}").unwrap().is_empty());
        assert!(parse_references("{{   }}").unwrap().is_empty());
        assert!(parse_references("{{name").unwrap().is_empty());
        assert!(parse_references("{1abc}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_structured_reference() {
        let input = r#"id=${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.data.id")}&x=1"#;
        let refs = parse_references(input).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(
            refs[0].expression,
            ReferenceExpression::Structured(vec![
                literal("collections"),
                literal("Orders"),
                literal("Get Order"),
                literal("response"),
                literal("body"),
                PathSegment::JsonPath("$.data.id".into()),
            ])
        );
        assert_eq!(&input[refs[0].span.clone()], &input[3..input.len() - 4]);
    }

    #[test]
    fn test_structured_braces_inside_quotes() {
        let input = r#"${"scenarios"."Flow"."Login"."response"."body".jsonPath("$.items[?(@.a == '}')]")}"#;
        let refs = parse_references(input).unwrap();
        assert_eq!(refs[0].span, 0..input.len());
        match &refs[0].expression {
            ReferenceExpression::Structured(segments) => assert_eq!(
                segments.last(),
                Some(&PathSegment::JsonPath("$.items[?(@.a == '}')]".into()))
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_structured_escaped_quote() {
        let refs = parse_references(r#"${"collections"."A \"quoted\" name"}"#).unwrap();
        assert_eq!(
            refs[0].expression,
            ReferenceExpression::Structured(vec![
                literal("collections"),
                literal(r#"A "quoted" name"#)
            ])
        );
    }

    #[test]
    fn test_structured_errors() {
        let unterminated = parse_references(r#"x ${"collections"."A""#).unwrap_err();
        assert!(matches!(unterminated, ReferenceError::Parse { position: 2, .. }));

        assert!(parse_references("${}").is_err());
        assert!(parse_references(r#"${"a" "b"}"#).is_err());
        assert!(parse_references(r#"${"a".}"#).is_err());
        assert!(parse_references(r#"${"a".query("$")}"#).is_err());
        assert!(parse_references("${HOME}").is_err());
    }

    #[test]
    fn test_mixed_forms_in_priority_order() {
        let refs = parse_references(r#"{{a}}-${"b"}-{c}"#).unwrap();
        assert_eq!(refs.len(), 3);
        assert!(matches!(refs[0].expression, ReferenceExpression::Braced(_)));
        assert!(refs[1].expression.is_structured());
        assert!(matches!(refs[2].expression, ReferenceExpression::Simple(_)));
    }

    #[test]
    fn test_variable_name_validation() {
        assert!(is_valid_variable_name("base_url"));
        assert!(is_valid_variable_name("api.key-v2"));
        assert!(!is_valid_variable_name(""));
        assert!(!is_valid_variable_name("1st"));
        assert!(!is_valid_variable_name("\"a\": 1"));
    }
}
