//! JSONPath queries over `serde_json` values
//!
//! Supports the subset used by structured references and test assertions:
//! `$`, `.name`, `['name']`, `[n]` (negative counts from the end), `[*]`,
//! `.*`, unions like `[0,2]`, recursive descent `..name` and filters
//! `[?(@.name)]` / `[?(@.name op literal)]` with `==`, `!=`, `<`, `<=`, `>`,
//! `>=`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Child(String),
    Index(i64),
    Wildcard,
    Filter(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn holds(self, left: &Value, right: &Value) -> bool {
        let ordering = match (left, right) {
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .zip(b.as_f64())
                .and_then(|(a, b)| a.partial_cmp(&b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => (left == right).then_some(Ordering::Equal),
        };
        match self {
            Self::Eq => ordering == Some(Ordering::Equal),
            Self::Ne => ordering != Some(Ordering::Equal),
            Self::Lt => ordering == Some(Ordering::Less),
            Self::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => ordering == Some(Ordering::Greater),
            Self::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

/// `?(@.path)` keeps children where the path exists; with a comparison it
/// keeps children where any match satisfies it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Filter {
    path: JsonPath,
    condition: Option<(Comparison, Value)>,
}

impl Filter {
    fn parse(body: &str) -> Result<Self, String> {
        let (lhs, condition) = match split_comparison(body) {
            Some((lhs, op, rhs)) => (lhs, Some((op, parse_literal(rhs.trim())?))),
            None => (body, None),
        };
        let lhs = lhs.trim();
        let relative = lhs
            .strip_prefix('@')
            .ok_or_else(|| format!("filter must start with '@': {lhs}"))?;
        let path = JsonPath::parse(&format!("${relative}")).map_err(|e| e.to_string())?;
        Ok(Self { path, condition })
    }

    fn matches(&self, candidate: &Value) -> bool {
        let found = self.path.query(candidate);
        match &self.condition {
            None => !found.is_empty(),
            Some((op, literal)) => found.iter().any(|value| op.holds(value, literal)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    recursive: bool,
    selectors: Vec<Selector>,
}

/// A compiled JSONPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    expression: String,
    steps: Vec<Step>,
}

impl JsonPath {
    /// Compiles an expression.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidJsonPath`] if the expression does not
    /// start with `$` or contains a malformed step.
    pub fn parse(expression: &str) -> DomainResult<Self> {
        let expression = expression.trim();
        let invalid = |message: &str| DomainError::InvalidJsonPath {
            expression: expression.to_string(),
            message: message.to_string(),
        };

        let rest = expression
            .strip_prefix('$')
            .ok_or_else(|| invalid("JSON path must start with '$'"))?;
        let chars: Vec<char> = rest.chars().collect();
        let mut steps = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    let recursive = chars.get(pos + 1) == Some(&'.');
                    pos += if recursive { 2 } else { 1 };
                    if recursive && chars.get(pos) == Some(&'[') {
                        let (selectors, next) = parse_bracket(&chars, pos).map_err(|m| invalid(&m))?;
                        steps.push(Step {
                            recursive,
                            selectors,
                        });
                        pos = next;
                        continue;
                    }
                    let start = pos;
                    while pos < chars.len() && chars[pos] != '.' && chars[pos] != '[' {
                        pos += 1;
                    }
                    let name: String = chars[start..pos].iter().collect();
                    let selector = match name.trim() {
                        "" => return Err(invalid("empty member name")),
                        "*" => Selector::Wildcard,
                        other => Selector::Child(other.to_string()),
                    };
                    steps.push(Step {
                        recursive,
                        selectors: vec![selector],
                    });
                }
                '[' => {
                    let (selectors, next) = parse_bracket(&chars, pos).map_err(|m| invalid(&m))?;
                    steps.push(Step {
                        recursive: false,
                        selectors,
                    });
                    pos = next;
                }
                other => return Err(invalid(&format!("unexpected character '{other}'"))),
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            steps,
        })
    }

    /// The expression this path was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// Returns every match, in document order.
    #[must_use]
    pub fn query<'a>(&self, json: &'a Value) -> Vec<&'a Value> {
        let mut nodes = vec![json];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in nodes {
                if step.recursive {
                    let mut all = Vec::new();
                    collect_descendants(node, &mut all);
                    for candidate in all {
                        select(candidate, &step.selectors, &mut next);
                    }
                } else {
                    select(node, &step.selectors, &mut next);
                }
            }
            nodes = next;
        }
        nodes
    }
}

/// Compiles `expression` and returns owned copies of every match.
///
/// # Errors
/// Returns [`DomainError::InvalidJsonPath`] for malformed expressions.
pub fn query(expression: &str, json: &Value) -> DomainResult<Vec<Value>> {
    let path = JsonPath::parse(expression)?;
    Ok(path.query(json).into_iter().cloned().collect())
}

/// Parses `[...]` starting at `open`; returns the selectors and the index after `]`.
fn parse_bracket(chars: &[char], open: usize) -> Result<(Vec<Selector>, usize), String> {
    let mut pos = open + 1;
    while chars.get(pos).is_some_and(|c| c.is_whitespace()) {
        pos += 1;
    }
    if chars.get(pos) == Some(&'?') {
        let (filter, next) = parse_filter(chars, pos)?;
        return Ok((vec![Selector::Filter(filter)], next));
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted_part = false;

    loop {
        let Some(&ch) = chars.get(pos) else {
            return Err("unterminated '['".to_string());
        };
        pos += 1;
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), '\\') => {
                if let Some(&escaped) = chars.get(pos) {
                    current.push(escaped);
                    pos += 1;
                }
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                quoted_part = true;
            }
            (None, ',') => {
                parts.push(to_selector(&current, quoted_part)?);
                current.clear();
                quoted_part = false;
            }
            (None, ']') => {
                parts.push(to_selector(&current, quoted_part)?);
                return Ok((parts, pos));
            }
            (None, c) => current.push(c),
        }
    }
}

/// Parses `?(...)]` starting at the `?`; returns the filter and the index after `]`.
fn parse_filter(chars: &[char], question: usize) -> Result<(Filter, usize), String> {
    let mut pos = question + 1;
    while chars.get(pos).is_some_and(|c| c.is_whitespace()) {
        pos += 1;
    }
    if chars.get(pos) != Some(&'(') {
        return Err("filter must be written as [?(...)]".to_string());
    }
    pos += 1;
    let start = pos;
    let mut depth = 1_usize;
    let mut quote: Option<char> = None;
    while depth > 0 {
        let Some(&ch) = chars.get(pos) else {
            return Err("unterminated filter".to_string());
        };
        match (quote, ch) {
            (Some(_), '\\') => pos += 1,
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            _ => {}
        }
        pos += 1;
    }
    let body: String = chars[start..pos - 1].iter().collect();
    while chars.get(pos).is_some_and(|c| c.is_whitespace()) {
        pos += 1;
    }
    if chars.get(pos) != Some(&']') {
        return Err("expected ']' after filter".to_string());
    }
    Ok((Filter::parse(&body)?, pos + 1))
}

/// Splits `lhs op rhs` at the first operator outside quotes.
fn split_comparison(body: &str) -> Option<(&str, Comparison, &str)> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        if matches!(ch, '\'' | '"') {
            quote = Some(ch);
            continue;
        }
        let rest = &body[i..];
        let (op, len) = if rest.starts_with("==") {
            (Comparison::Eq, 2)
        } else if rest.starts_with("!=") {
            (Comparison::Ne, 2)
        } else if rest.starts_with("<=") {
            (Comparison::Le, 2)
        } else if rest.starts_with(">=") {
            (Comparison::Ge, 2)
        } else if ch == '<' {
            (Comparison::Lt, 1)
        } else if ch == '>' {
            (Comparison::Gt, 1)
        } else {
            continue;
        };
        return Some((&body[..i], op, &body[i + len..]));
    }
    None
}

fn parse_literal(raw: &str) -> Result<Value, String> {
    if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Ok(Value::String(inner.replace("\\'", "'")));
    }
    serde_json::from_str(raw).map_err(|_| format!("invalid filter literal: {raw}"))
}

fn to_selector(raw: &str, quoted: bool) -> Result<Selector, String> {
    if quoted {
        return Ok(Selector::Child(raw.to_string()));
    }
    match raw.trim() {
        "" => Err("empty bracket selector".to_string()),
        "*" => Ok(Selector::Wildcard),
        other => other
            .parse::<i64>()
            .map(Selector::Index)
            .map_err(|_| format!("invalid array index: {other}")),
    }
}

fn collect_descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    match node {
        Value::Array(items) => items.iter().for_each(|v| collect_descendants(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_descendants(v, out)),
        _ => {}
    }
}

fn select<'a>(node: &'a Value, selectors: &[Selector], out: &mut Vec<&'a Value>) {
    for selector in selectors {
        match (selector, node) {
            (Selector::Child(name), Value::Object(map)) => out.extend(map.get(name)),
            (Selector::Index(index), Value::Array(items)) => {
                let resolved = if *index < 0 {
                    usize::try_from(index.unsigned_abs())
                        .ok()
                        .and_then(|back| items.len().checked_sub(back))
                } else {
                    usize::try_from(*index).ok()
                };
                out.extend(resolved.and_then(|i| items.get(i)));
            }
            (Selector::Wildcard, Value::Array(items)) => out.extend(items.iter()),
            (Selector::Wildcard, Value::Object(map)) => out.extend(map.values()),
            (Selector::Filter(filter), Value::Array(items)) => {
                out.extend(items.iter().filter(|item| filter.matches(item)));
            }
            (Selector::Filter(filter), Value::Object(map)) => {
                out.extend(map.values().filter(|value| filter.matches(value)));
            }
            _ => {}
        }
    }
}
