//! Variable resolution engine
//!
//! Substitutes reference expressions in strings, JSON trees and whole
//! requests. Simple and braced references that do not resolve stay in the
//! output verbatim; structured references that do not resolve are errors.

use courier_domain::{
    PreparedRequest, ReferenceExpression, RequestBody, ResolvedVariable, VariableStore,
};
use serde_json::Value;

use super::parser::{ParsedReference, parse_references};
use super::structured::StructuredPathResolver;
use crate::error::ReferenceError;
use crate::ports::{JsonPathEvaluator, SnapshotSource};

/// Result of variable resolution for a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// The resolved string with all resolvable references substituted.
    pub resolved: String,

    /// Simple and braced references that were resolved from the store.
    pub resolved_variables: Vec<ResolvedVariable>,

    /// Names of simple and braced references left verbatim.
    pub unresolved: Vec<String>,

    /// Whether every reference was substituted.
    pub is_complete: bool,
}

impl ResolutionResult {
    /// Creates a result for input with no references.
    #[must_use]
    pub fn no_variables(input: &str) -> Self {
        Self {
            resolved: input.to_string(),
            resolved_variables: Vec::new(),
            unresolved: Vec::new(),
            is_complete: true,
        }
    }
}

/// The variable resolution engine.
///
/// Borrows its sources for the duration of one resolution pass; build a new
/// resolver whenever the store or snapshots change.
pub struct VariableResolver<'a> {
    store: &'a VariableStore,
    structured: StructuredPathResolver<'a>,
}

impl<'a> VariableResolver<'a> {
    /// Creates a resolver over a variable store, execution snapshots and a
    /// JSONPath evaluator.
    #[must_use]
    pub fn new(
        store: &'a VariableStore,
        snapshots: &'a dyn SnapshotSource,
        json_path: &'a dyn JsonPathEvaluator,
    ) -> Self {
        Self {
            store,
            structured: StructuredPathResolver::new(snapshots, json_path, store),
        }
    }

    /// Replaces every reference in `input`.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or unresolvable structured reference.
    pub fn substitute(&self, input: &str) -> Result<String, ReferenceError> {
        self.substitute_with_report(input).map(|r| r.resolved)
    }

    /// Replaces every reference in `input` and reports what was resolved.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or unresolvable structured reference.
    pub fn substitute_with_report(&self, input: &str) -> Result<ResolutionResult, ReferenceError> {
        let references = parse_references(input)?;

        if references.is_empty() {
            return Ok(ResolutionResult::no_variables(input));
        }

        let mut resolved_vars = Vec::new();
        let mut unresolved = Vec::new();
        let mut result = String::with_capacity(input.len());
        let mut last_end = 0;

        for ParsedReference { expression, span } in &references {
            result.push_str(&input[last_end..span.start]);

            match expression {
                ReferenceExpression::Structured(segments) => {
                    result.push_str(&self.structured.resolve(segments)?);
                }
                ReferenceExpression::Simple(name) | ReferenceExpression::Braced(name) => {
                    if let Some(resolved) = self.store.resolve(name) {
                        result.push_str(&resolved.value);
                        resolved_vars.push(resolved);
                    } else {
                        result.push_str(&input[span.clone()]);
                        unresolved.push(name.clone());
                    }
                }
            }

            last_end = span.end;
        }

        result.push_str(&input[last_end..]);

        let is_complete = unresolved.is_empty();
        Ok(ResolutionResult {
            resolved: result,
            resolved_variables: resolved_vars,
            unresolved,
            is_complete,
        })
    }

    /// Substitutes into every string of a JSON tree, object keys included.
    /// Numbers, booleans and nulls pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first structured reference error encountered.
    pub fn substitute_deep(&self, value: &Value) -> Result<Value, ReferenceError> {
        Ok(match value {
            Value::String(text) => Value::String(self.substitute(text)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.substitute_deep(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(self.substitute(key)?, self.substitute_deep(item)?);
                }
                Value::Object(out)
            }
            other => other.clone(),
        })
    }

    /// Resolves a variable expression used as a command argument.
    ///
    /// Text containing references is substituted and must resolve
    /// completely; bare text is looked up as a variable name.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or unresolvable structured reference.
    pub fn resolve_expression(&self, expression: &str) -> Result<Option<String>, ReferenceError> {
        let expression = expression.trim();
        let report = self.substitute_with_report(expression)?;
        if report.resolved_variables.is_empty() && report.unresolved.is_empty() {
            if report.resolved != expression {
                return Ok(Some(report.resolved));
            }
            return Ok(self.store.resolve_value(expression));
        }
        Ok(report.is_complete.then_some(report.resolved))
    }

    /// Lists simple and braced references in `input` that would stay verbatim.
    /// Useful for validation before sending a request.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` contains a malformed structured reference.
    pub fn find_unresolved(&self, input: &str) -> Result<Vec<String>, ReferenceError> {
        Ok(parse_references(input)?
            .into_iter()
            .filter_map(|r| r.expression.variable_name().map(ToString::to_string))
            .filter(|name| self.store.resolve(name).is_none())
            .collect())
    }

    /// Extracts all references from the input without resolving them.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` contains a malformed structured reference.
    pub fn extract_references(input: &str) -> Result<Vec<ReferenceExpression>, ReferenceError> {
        Ok(parse_references(input)?
            .into_iter()
            .map(|r| r.expression)
            .collect())
    }

    /// Returns a copy of `request` with references substituted into the URL,
    /// header names and values, query parameters, text body fields and auth.
    ///
    /// # Errors
    ///
    /// Returns the first structured reference error encountered.
    pub fn resolve_request(
        &self,
        request: &PreparedRequest,
    ) -> Result<PreparedRequest, ReferenceError> {
        let mut resolved = request.clone();
        resolved.url = self.substitute(&request.url)?;

        for header in resolved.headers.iter_mut() {
            header.name = self.substitute(&header.name)?;
            header.value = self.substitute(&header.value)?;
        }
        for param in resolved.params.iter_mut() {
            param.key = self.substitute(&param.key)?;
            param.value = self.substitute(&param.value)?;
        }

        match &mut resolved.body {
            RequestBody::Raw { content } => *content = self.substitute(content)?,
            RequestBody::FormUrlEncoded { fields } | RequestBody::FormData { fields, .. } => {
                for field in fields {
                    field.key = self.substitute(&field.key)?;
                    field.value = self.substitute(&field.value)?;
                }
            }
            RequestBody::None | RequestBody::Binary { .. } => {}
        }

        for text in resolved.auth.text_fields_mut() {
            *text = self.substitute(text)?;
        }

        Ok(resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::StandardJsonPath;
    use chrono::Utc;
    use courier_domain::{
        ActiveEnvironment, AuthConfig, Container, ContainerKind, HttpResponse, RequestItem,
        RequestSnapshot, ResponseSnapshot, ScopeTarget, SnapshotCatalog, Variable, VariableMap,
        VariableScope,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn create_test_store() -> VariableStore {
        let mut store = VariableStore::new();
        store.activate_environment(ActiveEnvironment::new("dev", VariableMap::new()));
        store
            .define(&ScopeTarget::Global, "x", Variable::new("foo"))
            .unwrap();
        store
            .define(&ScopeTarget::Global, "y", Variable::new("bar"))
            .unwrap();
        store
            .define(&ScopeTarget::Environment, "host", Variable::new("dev.local"))
            .unwrap();
        store
            .define(&ScopeTarget::Global, "host", Variable::new("global.local"))
            .unwrap();
        store
    }

    fn catalog() -> SnapshotCatalog {
        let mut item = RequestItem::new("Get Order", PreparedRequest::get("https://api"));
        item.record_execution(
            RequestSnapshot::capture(&item.request, Utc::now()),
            ResponseSnapshot::capture(
                &HttpResponse::new(200, r#"{"data":{"id":42}}"#),
                Vec::new(),
                Utc::now(),
            ),
        );
        SnapshotCatalog::new()
            .with_container(Container::new(ContainerKind::Collections, "Orders").with_item(item))
    }

    fn with_resolver<R>(store: &VariableStore, f: impl FnOnce(&VariableResolver<'_>) -> R) -> R {
        let catalog = catalog();
        let resolver = VariableResolver::new(store, &catalog, &StandardJsonPath);
        f(&resolver)
    }

    #[test]
    fn test_substitute_braced() {
        let store = create_test_store();
        with_resolver(&store, |r| {
            assert_eq!(r.substitute("{{x}}/{{y}}").unwrap(), "foo/bar");
            assert_eq!(r.substitute("{{missing}}").unwrap(), "{{missing}}");
            assert_eq!(r.substitute("/users/{x}").unwrap(), "/users/foo");
        });
    }

    #[test]
    fn test_environment_shadows_global() {
        let store = create_test_store();
        with_resolver(&store, |r| {
            let report = r.substitute_with_report("https://{{host}}").unwrap();
            assert_eq!(report.resolved, "https://dev.local");
            assert_eq!(report.resolved_variables[0].scope, VariableScope::Environment);
        });
    }

    #[test]
    fn test_report_lists_unresolved() {
        let store = create_test_store();
        with_resolver(&store, |r| {
            let report = r.substitute_with_report("{{x}}-{{nope}}-{other}").unwrap();
            assert_eq!(report.resolved, "foo-{{nope}}-{other}");
            assert_eq!(report.unresolved, vec!["nope", "other"]);
            assert!(!report.is_complete);
        });
    }

    #[test]
    fn test_substituted_output_is_not_rescanned() {
        let mut store = create_test_store();
        store
            .define(&ScopeTarget::Global, "outer", Variable::new("{{x}}"))
            .unwrap();
        with_resolver(&store, |r| {
            assert_eq!(r.substitute("{{outer}}").unwrap(), "{{x}}");
        });
    }

    #[test]
    fn test_structured_reference() {
        let store = create_test_store();
        with_resolver(&store, |r| {
            let text = r#"/orders/${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.data.id")}"#;
            assert_eq!(r.substitute(text).unwrap(), "/orders/42");

            let missing = r#"${"collections"."Orders"."Get Order"."response"."body".jsonPath("$.data.name")}"#;
            assert!(matches!(
                r.substitute(missing),
                Err(ReferenceError::Resolution(_))
            ));
        });
    }

    #[test]
    fn test_structured_reference_with_filter() {
        let mut item = RequestItem::new("List", PreparedRequest::get("https://api/items"));
        item.record_execution(
            RequestSnapshot::capture(&item.request, Utc::now()),
            ResponseSnapshot::capture(
                &HttpResponse::new(200, r#"{"items":[{"a":"x","id":1},{"a":"}","id":2}]}"#),
                Vec::new(),
                Utc::now(),
            ),
        );
        let catalog = SnapshotCatalog::new()
            .with_container(Container::new(ContainerKind::Scenarios, "Flow").with_item(item));
        let store = VariableStore::new();
        let resolver = VariableResolver::new(&store, &catalog, &StandardJsonPath);

        let text = r#"${"scenarios"."Flow"."List"."response"."body".jsonPath("$.items[?(@.a == '}')].id")}"#;
        assert_eq!(resolver.substitute(text).unwrap(), "2");
    }

    #[test]
    fn test_substitute_deep() {
        let mut store = create_test_store();
        store
            .define(&ScopeTarget::Global, "x", Variable::new("v"))
            .unwrap();
        with_resolver(&store, |r| {
            let input = json!({"a": "{{x}}", "b": [1, "{{x}}", true, null], "{{y}}": {"n": 2}});
            let output = r.substitute_deep(&input).unwrap();
            assert_eq!(
                output,
                json!({"a": "v", "b": [1, "v", true, null], "bar": {"n": 2}})
            );
            assert_eq!(r.substitute_deep(&output).unwrap(), output);
        });
    }

    #[test]
    fn test_resolve_expression() {
        let store = create_test_store();
        with_resolver(&store, |r| {
            assert_eq!(r.resolve_expression("x").unwrap().as_deref(), Some("foo"));
            assert_eq!(r.resolve_expression("{{y}}").unwrap().as_deref(), Some("bar"));
            assert_eq!(
                r.resolve_expression("Bearer {{x}}").unwrap().as_deref(),
                Some("Bearer foo")
            );
            assert_eq!(r.resolve_expression("missing").unwrap(), None);
            assert_eq!(r.resolve_expression("{{missing}}").unwrap(), None);
        });
    }

    #[test]
    fn test_find_unresolved_and_extract() {
        let store = create_test_store();
        with_resolver(&store, |r| {
            assert_eq!(
                r.find_unresolved("{{x}}/{{a}}/{b}").unwrap(),
                vec!["a".to_string(), "b".to_string()]
            );
        });
        let refs = VariableResolver::extract_references("{{a}}{b}").unwrap();
        assert_eq!(
            refs,
            vec![
                ReferenceExpression::Braced("a".into()),
                ReferenceExpression::Simple("b".into())
            ]
        );
    }

    #[test]
    fn test_resolve_request() {
        let store = create_test_store();
        let request = PreparedRequest::get("https://{{host}}/items")
            .with_header("X-{{x}}", "{{y}}")
            .with_body(RequestBody::raw(r#"{"name": "{{x}}"}"#))
            .with_auth(AuthConfig::bearer("{{y}}"));

        with_resolver(&store, |r| {
            let resolved = r.resolve_request(&request).unwrap();
            assert_eq!(resolved.url, "https://dev.local/items");
            assert_eq!(resolved.headers.get("X-foo"), Some("bar"));
            assert_eq!(resolved.body.text(), Some(r#"{"name": "foo"}"#));
            assert_eq!(resolved.auth, AuthConfig::bearer("bar"));
        });
    }
}
