//! Instance evaluation.
//!
//! The evaluator walks the compiled graph depth-first, building an
//! [`EvaluationNode`] per (schema node, instance location) visit. The
//! dynamic scope is a stack of resource frames kept on the call stack:
//! entering a node of a different resource pushes a frame, and
//! `$dynamicRef`/`$recursiveRef` search it outermost first.
//!
//! Keywords of a node run in compiled order; each sees the evaluations of
//! the keywords before it, which is how `then`/`else`, `maxContains`,
//! `additionalItems` and the `unevaluated*` keywords read their
//! dependencies.

mod applicators;
mod assertions;

use crate::error::{EvaluationError, ValidationErrorKind};
use crate::evaluation::{EvaluationNode, KeywordEvaluation};
use crate::options::EvaluationOptions;
use crate::schema::{CompiledKeyword, CompiledSchema, Keyword, NodeKey, SchemaBody};
use crate::vocabulary::KeywordOutcome;
use jschema_json::{JsonPointer, JsonValue};

/// Evaluate `instance` with default options (exhaustive evaluation).
pub fn evaluate(
    schema: &CompiledSchema,
    instance: &JsonValue,
) -> Result<EvaluationNode, EvaluationError> {
    evaluate_with(schema, instance, &EvaluationOptions::default())
}

pub fn evaluate_with(
    schema: &CompiledSchema,
    instance: &JsonValue,
    options: &EvaluationOptions,
) -> Result<EvaluationNode, EvaluationError> {
    let mut context = EvaluationContext {
        schema,
        options,
        depth: 0,
    };
    evaluate_node(&mut context, schema.root, instance, JsonPointer::root(), None)
}

/// Only the verdict; evaluation stops as soon as it is decided.
pub fn is_valid(schema: &CompiledSchema, instance: &JsonValue) -> Result<bool, EvaluationError> {
    let options = EvaluationOptions::default().with_short_circuit(true);
    evaluate_with(schema, instance, &options).map(|node| node.valid)
}

impl CompiledSchema {
    pub fn evaluate(&self, instance: &JsonValue) -> Result<EvaluationNode, EvaluationError> {
        evaluate(self, instance)
    }

    pub fn evaluate_with(
        &self,
        instance: &JsonValue,
        options: &EvaluationOptions,
    ) -> Result<EvaluationNode, EvaluationError> {
        evaluate_with(self, instance, options)
    }

    pub fn is_valid(&self, instance: &JsonValue) -> Result<bool, EvaluationError> {
        is_valid(self, instance)
    }

    /// Check this schema's own JSON against `metaschema` (see
    /// [`Catalog::get_metaschema`](crate::Catalog::get_metaschema)).
    /// Instance locations in the result are relative to this schema.
    pub fn validate(&self, metaschema: &CompiledSchema) -> Result<EvaluationNode, EvaluationError> {
        let own = match self.schema_json() {
            Some(json) => JsonValue::from_serde(&json.to_serde()),
            None => JsonValue::from_serde(&serde_json::Value::Bool(true)),
        };
        metaschema.evaluate(&own)
    }
}

/// Stack left before a recursion step moves to a fresh segment. One
/// level of unoptimised evaluation fits well within it.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

pub(crate) struct EvaluationContext<'a> {
    pub(crate) schema: &'a CompiledSchema,
    pub(crate) options: &'a EvaluationOptions,
    depth: usize,
}

impl EvaluationContext<'_> {
    /// `anyOf`/`oneOf` may skip remaining branches only when no
    /// `unevaluated*` keyword could need their annotations.
    pub(crate) fn short_circuit_branches(&self) -> bool {
        self.options.short_circuit && !self.schema.uses_unevaluated
    }
}

/// One frame of the dynamic scope.
pub(crate) struct Scope<'s> {
    pub(crate) resource: NodeKey,
    parent: Option<&'s Scope<'s>>,
}

impl Scope<'_> {
    /// Resource roots in the scope, outermost first.
    pub(crate) fn frames(&self) -> Vec<NodeKey> {
        let mut frames = vec![self.resource];
        let mut parent = self.parent;
        while let Some(scope) = parent {
            frames.push(scope.resource);
            parent = scope.parent;
        }
        frames.reverse();
        frames
    }
}

/// A keyword being evaluated, with what it may read of its node.
pub(crate) struct Site<'a> {
    pub(crate) node: NodeKey,
    /// All compiled keywords of the node.
    pub(crate) keywords: &'a [CompiledKeyword],
    pub(crate) keyword: &'a CompiledKeyword,
    pub(crate) keyword_location: JsonPointer,
    pub(crate) scope: &'a Scope<'a>,
    /// Evaluations of the keywords that ran before this one.
    pub(crate) evaluated: &'a [KeywordEvaluation],
}

impl Site<'_> {
    pub(crate) fn evaluated(&self, name: &str) -> Option<&KeywordEvaluation> {
        self.evaluated.iter().find(|evaluation| evaluation.keyword == name)
    }
}

pub(crate) fn evaluate_node(
    ctx: &mut EvaluationContext<'_>,
    key: NodeKey,
    instance: &JsonValue,
    keyword_location: JsonPointer,
    scope: Option<&Scope<'_>>,
) -> Result<EvaluationNode, EvaluationError> {
    if ctx.depth >= ctx.options.max_depth {
        tracing::debug!(
            limit = ctx.options.max_depth,
            keyword_location = %keyword_location,
            "recursion limit exceeded"
        );
        return Err(EvaluationError::RecursionLimitExceeded {
            limit: ctx.options.max_depth,
            keyword_location: keyword_location.to_string(),
            instance_location: instance.pointer().to_string(),
        });
    }
    ctx.depth += 1;
    let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
        evaluate_body(ctx, key, instance, keyword_location, scope)
    });
    ctx.depth -= 1;
    result
}

fn evaluate_body(
    ctx: &mut EvaluationContext<'_>,
    key: NodeKey,
    instance: &JsonValue,
    keyword_location: JsonPointer,
    scope: Option<&Scope<'_>>,
) -> Result<EvaluationNode, EvaluationError> {
    let schema = ctx.schema;
    let node = schema.node(key);
    let resource = schema.resource_of(key);
    let frame;
    let scope = match scope {
        Some(scope) if scope.resource == resource => scope,
        _ => {
            frame = Scope {
                resource,
                parent: scope,
            };
            &frame
        }
    };

    let mut result = EvaluationNode {
        valid: true,
        instance_location: instance.pointer().clone(),
        keyword_location,
        absolute_keyword_location: node.canonical.clone(),
        scope: node.base_uri.to_string(),
        error: None,
        keywords: Vec::new(),
    };

    let keywords = match &node.body {
        SchemaBody::Boolean(true) => return Ok(result),
        SchemaBody::Boolean(false) => {
            result.valid = false;
            result.error = Some(ValidationErrorKind::FalseSchema);
            return Ok(result);
        }
        SchemaBody::Keywords(keywords) => keywords,
    };

    for compiled in keywords {
        if matches!(compiled.keyword, Keyword::Inert) || !compiled.applies_to(instance) {
            continue;
        }
        tracing::trace!(
            keyword = %compiled.name,
            instance_location = %instance.pointer(),
            "evaluating keyword"
        );
        let site = Site {
            node: key,
            keywords,
            keyword: compiled,
            keyword_location: result.keyword_location.child(compiled.name.as_str()),
            scope,
            evaluated: &result.keywords,
        };
        let Some(evaluation) = evaluate_keyword(ctx, &site, instance)? else {
            continue;
        };
        if evaluation.asserts && !evaluation.valid {
            result.valid = false;
        }
        result.keywords.push(evaluation);
        if !result.valid && ctx.options.short_circuit {
            break;
        }
    }
    Ok(result)
}

/// `Ok(None)` when the keyword does not take part (e.g. `then` without a
/// successful `if`).
fn evaluate_keyword(
    ctx: &mut EvaluationContext<'_>,
    site: &Site<'_>,
    instance: &JsonValue,
) -> Result<Option<KeywordEvaluation>, EvaluationError> {
    let mut evaluation = KeywordEvaluation {
        keyword: site.keyword.name.clone(),
        keyword_location: site.keyword_location.clone(),
        absolute_keyword_location: site.keyword.absolute_location.clone(),
        instance_location: instance.pointer().clone(),
        valid: true,
        asserts: true,
        annotation: None,
        error: None,
        children: Vec::new(),
    };

    match &site.keyword.keyword {
        Keyword::Inert => return Ok(None),
        Keyword::Annotation(value) => {
            evaluation.asserts = false;
            evaluation.annotation = Some(value.clone());
        }
        Keyword::Format {
            name,
            assert,
            predicate,
        } => {
            evaluation.annotation = Some(serde_json::Value::String(name.clone()));
            evaluation.asserts = *assert || ctx.options.assert_formats;
            if evaluation.asserts {
                let strict = ctx.options.strict_formats;
                fail(&mut evaluation, assertions::format(name, predicate.as_ref(), instance, strict));
            }
        }
        Keyword::MaxContains(max) => {
            let Some(contains) = site.evaluated("contains") else {
                return Ok(None);
            };
            let count = contains
                .annotation
                .as_ref()
                .and_then(serde_json::Value::as_array)
                .map_or(0, Vec::len);
            if count as u64 > *max {
                fail(
                    &mut evaluation,
                    Some(ValidationErrorKind::ContainsCountInvalid {
                        count,
                        min_contains: None,
                        max_contains: Some(*max),
                    }),
                );
            }
        }
        Keyword::MinContains(_) => {
            // Counted by `contains`.
            if site.evaluated("contains").is_none() {
                return Ok(None);
            }
        }
        Keyword::Custom {
            implementation,
            value,
        } => match (implementation.evaluate)(value, instance) {
            KeywordOutcome::Valid { annotation } => evaluation.annotation = annotation,
            KeywordOutcome::Invalid { message } => fail(
                &mut evaluation,
                Some(ValidationErrorKind::Custom {
                    keyword: site.keyword.name.clone(),
                    message,
                }),
            ),
        },
        keyword if applicators::is_applicator(keyword) => {
            if !applicators::apply(ctx, site, instance, &mut evaluation)? {
                return Ok(None);
            }
        }
        keyword => fail(&mut evaluation, assertions::check(keyword, instance)),
    }
    Ok(Some(evaluation))
}

fn fail(evaluation: &mut KeywordEvaluation, error: Option<ValidationErrorKind>) {
    if let Some(error) = error {
        evaluation.valid = false;
        evaluation.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use serde_json::json;

    fn compile(schema: serde_json::Value) -> CompiledSchema {
        Catalog::new().compile(JsonValue::from_serde(&schema)).unwrap()
    }

    fn instance(value: serde_json::Value) -> JsonValue {
        JsonValue::from_serde(&value)
    }

    #[test]
    fn test_boolean_schemas() {
        let schema = compile(json!(false));
        let result = schema.evaluate(&instance(json!(1))).unwrap();
        assert!(!result.valid);
        assert_eq!(result.error, Some(ValidationErrorKind::FalseSchema));
        assert!(compile(json!(true)).is_valid(&instance(json!(null))).unwrap());
    }

    #[test]
    fn test_keywords_skip_other_types() {
        let schema = compile(json!({"minLength": 3, "maximum": 1}));
        assert!(schema.is_valid(&instance(json!([1, 2]))).unwrap());
        assert!(!schema.is_valid(&instance(json!("ab"))).unwrap());
        assert!(!schema.is_valid(&instance(json!(2))).unwrap());
    }

    #[test]
    fn test_keyword_locations_follow_references() {
        let schema = compile(json!({
            "$id": "https://example.com/root.json",
            "properties": {"a": {"$ref": "#/$defs/positive"}},
            "$defs": {"positive": {"minimum": 0}}
        }));
        let result = schema.evaluate(&instance(json!({"a": -1}))).unwrap();
        assert!(!result.valid);
        let properties = result.keyword("properties").unwrap();
        let a = &properties.children[0];
        assert_eq!(a.keyword_location.to_string(), "/properties/a");
        assert_eq!(a.instance_location.to_string(), "/a");
        let reference = &a.keyword("$ref").unwrap().children[0];
        assert_eq!(reference.keyword_location.to_string(), "/properties/a/$ref");
        assert_eq!(
            reference.absolute_keyword_location,
            "https://example.com/root.json#/$defs/positive"
        );
        let minimum = reference.keyword("minimum").unwrap();
        assert_eq!(minimum.keyword_location.to_string(), "/properties/a/$ref/minimum");
        assert_eq!(
            minimum.absolute_keyword_location,
            "https://example.com/root.json#/$defs/positive/minimum"
        );
    }

    #[test]
    fn test_if_then_else() {
        let schema = compile(json!({
            "if": {"type": "integer"},
            "then": {"minimum": 10},
            "else": {"type": "string"}
        }));
        assert!(schema.is_valid(&instance(json!(12))).unwrap());
        assert!(schema.is_valid(&instance(json!("x"))).unwrap());
        let result = schema.evaluate(&instance(json!(3))).unwrap();
        assert!(!result.valid);
        assert!(result.keyword("if").unwrap().valid);
        assert!(result.keyword("else").is_none());
        assert_eq!(
            result.keyword("then").unwrap().error,
            Some(ValidationErrorKind::ConditionalFailed {
                branch: "then".to_string()
            })
        );
        assert!(!schema.is_valid(&instance(json!(null))).unwrap());
    }

    #[test]
    fn test_contains_bounds() {
        let schema = compile(json!({
            "contains": {"type": "integer"},
            "minContains": 2,
            "maxContains": 3
        }));
        assert!(!schema.is_valid(&instance(json!([1, "a"]))).unwrap());
        assert!(schema.is_valid(&instance(json!([1, 2, "a"]))).unwrap());
        assert!(!schema.is_valid(&instance(json!([1, 2, 3, 4]))).unwrap());

        let zero = compile(json!({"contains": {"type": "integer"}, "minContains": 0}));
        assert!(zero.is_valid(&instance(json!(["a"]))).unwrap());
        assert!(zero.is_valid(&instance(json!([]))).unwrap());
    }

    #[test]
    fn test_one_of_outcomes() {
        let schema = compile(json!({"oneOf": [{"type": "integer"}, {"minimum": 0}]}));
        assert!(schema.is_valid(&instance(json!(-1))).unwrap());
        let none = schema.evaluate(&instance(json!(-1.5))).unwrap();
        assert_eq!(
            none.keyword("oneOf").unwrap().error,
            Some(ValidationErrorKind::OneOfNoneValid)
        );
        let both = schema.evaluate(&instance(json!(1))).unwrap();
        assert_eq!(
            both.keyword("oneOf").unwrap().error,
            Some(ValidationErrorKind::OneOfMultipleValid { valid: vec![0, 1] })
        );
    }

    #[test]
    fn test_short_circuit_stops_keyword_loop() {
        let schema = compile(json!({"type": "string", "minLength": 10, "pattern": "^a"}));
        let options = EvaluationOptions::default().with_short_circuit(true);
        let result = schema.evaluate_with(&instance(json!("b")), &options).unwrap();
        assert!(!result.valid);
        assert_eq!(result.keywords.len(), 2);
        let exhaustive = schema.evaluate(&instance(json!("b"))).unwrap();
        assert_eq!(exhaustive.keywords.len(), 3);
    }

    #[test]
    fn test_recursion_limit() {
        let schema = compile(json!({"$ref": "#"}));
        let err = schema.evaluate(&instance(json!(1))).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::RecursionLimitExceeded { limit: 256, .. }
        ));
        let options = EvaluationOptions::default().with_max_depth(8);
        let err = schema.evaluate_with(&instance(json!(1)), &options).unwrap_err();
        assert!(matches!(err, EvaluationError::RecursionLimitExceeded { limit: 8, .. }));
    }

    #[test]
    fn test_deep_limits_do_not_exhaust_the_stack() {
        let schema = compile(json!({
            "$defs": {"loop": {"allOf": [{"$ref": "#/$defs/loop"}]}},
            "anyOf": [{"$ref": "#/$defs/loop"}]
        }));
        let options = EvaluationOptions::default().with_max_depth(2048);
        let err = schema.evaluate_with(&instance(json!({"a": [1]})), &options).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::RecursionLimitExceeded { limit: 2048, .. }
        ));
        assert!(matches!(
            schema.is_valid(&instance(json!(1))),
            Err(EvaluationError::RecursionLimitExceeded { limit: 256, .. })
        ));
    }

    #[test]
    fn test_format_assertion_is_opt_in() {
        let schema = compile(json!({"format": "ipv4"}));
        let bad = instance(json!("999.1.1.1"));
        assert!(schema.is_valid(&bad).unwrap());
        let result = schema.evaluate(&bad).unwrap();
        assert_eq!(result.keyword("format").unwrap().annotation, Some(json!("ipv4")));

        let asserting = EvaluationOptions::default().with_assert_formats(true);
        assert!(!schema.evaluate_with(&bad, &asserting).unwrap().valid);
        assert!(schema.evaluate_with(&instance(json!("10.0.0.1")), &asserting).unwrap().valid);
        assert!(schema.evaluate_with(&instance(json!(5)), &asserting).unwrap().valid);
    }

    #[test]
    fn test_unknown_format_under_strict_formats() {
        let schema = compile(json!({"format": "no-such-format"}));
        let x = instance(json!("x"));
        let asserting = EvaluationOptions::default().with_assert_formats(true);
        assert!(schema.evaluate_with(&x, &asserting).unwrap().valid);
        let strict = asserting.with_strict_formats(true);
        let result = schema.evaluate_with(&x, &strict).unwrap();
        assert_eq!(
            result.keyword("format").unwrap().error,
            Some(ValidationErrorKind::UnknownFormat {
                format: "no-such-format".to_string()
            })
        );
        // `format` only constrains strings, known or not.
        assert!(schema.evaluate_with(&instance(json!(5)), &strict).unwrap().valid);
        assert!(schema.evaluate_with(&instance(json!({"a": 1})), &strict).unwrap().valid);
    }
}
