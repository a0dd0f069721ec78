// Applicator keywords: references, combinators, conditionals and the
// array/object keywords that apply subschemas to members.

use super::{EvaluationContext, Scope, Site, evaluate_node};
use crate::error::{EvaluationError, ValidationErrorKind};
use crate::evaluation::{EvaluationNode, KeywordEvaluation};
use crate::schema::{CompiledKeyword, CompiledSchema, Keyword, NodeKey};
use crate::vocabulary::Draft;
use jschema_json::{JsonPointer, JsonValue};
use serde_json::Value;
use std::collections::HashSet;

const ITEM_ANNOTATIONS_2020_12: &[&str] = &["prefixItems", "items", "contains", "unevaluatedItems"];
const ITEM_ANNOTATIONS_2019_09: &[&str] = &["items", "additionalItems", "unevaluatedItems"];
const PROPERTY_ANNOTATIONS: &[&str] = &[
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
];

pub(super) fn is_applicator(keyword: &Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Ref { .. }
            | Keyword::DynamicRef { .. }
            | Keyword::RecursiveRef { .. }
            | Keyword::AllOf(_)
            | Keyword::AnyOf(_)
            | Keyword::OneOf(_)
            | Keyword::Not(_)
            | Keyword::If(_)
            | Keyword::Then(_)
            | Keyword::Else(_)
            | Keyword::DependentSchemas(_)
            | Keyword::PrefixItems(_)
            | Keyword::Items(_)
            | Keyword::ItemsArray(_)
            | Keyword::AdditionalItems(_)
            | Keyword::Contains(_)
            | Keyword::Properties(_)
            | Keyword::PatternProperties(_)
            | Keyword::AdditionalProperties(_)
            | Keyword::PropertyNames(_)
            | Keyword::UnevaluatedItems(_)
            | Keyword::UnevaluatedProperties(_)
    )
}

/// Evaluate an applicator into `evaluation`. Returns `false` when the
/// keyword does not take part at this instance.
pub(super) fn apply(
    ctx: &mut EvaluationContext<'_>,
    site: &Site<'_>,
    instance: &JsonValue,
    evaluation: &mut KeywordEvaluation,
) -> Result<bool, EvaluationError> {
    match &site.keyword.keyword {
        Keyword::Ref { target, reference } => {
            reference_to(ctx, site, instance, *target, reference, evaluation)?;
        }
        Keyword::DynamicRef {
            target,
            anchor,
            reference,
        } => {
            let target = anchor
                .as_deref()
                .and_then(|anchor| dynamic_target(ctx.schema, site.scope, anchor))
                .unwrap_or(*target);
            reference_to(ctx, site, instance, target, reference, evaluation)?;
        }
        Keyword::RecursiveRef { target } => {
            let target = recursive_target(ctx.schema, site.scope, *target);
            reference_to(ctx, site, instance, target, "#", evaluation)?;
        }

        Keyword::AllOf(branches) => {
            let mut failed = Vec::new();
            for (i, branch) in branches.iter().enumerate() {
                let child = subschema(ctx, site, *branch, instance, Some(i.to_string()))?;
                if !child.valid {
                    failed.push(i);
                }
                evaluation.children.push(child);
                if !failed.is_empty() && ctx.options.short_circuit {
                    break;
                }
            }
            conclude(evaluation, failed.is_empty(), || ValidationErrorKind::AllOfFailed {
                failed,
            });
        }
        Keyword::AnyOf(branches) => {
            let mut any = false;
            for (i, branch) in branches.iter().enumerate() {
                let child = subschema(ctx, site, *branch, instance, Some(i.to_string()))?;
                any |= child.valid;
                evaluation.children.push(child);
                if any && ctx.short_circuit_branches() {
                    break;
                }
            }
            conclude(evaluation, any, || ValidationErrorKind::AnyOfNoneValid);
        }
        Keyword::OneOf(branches) => {
            let mut matched = Vec::new();
            for (i, branch) in branches.iter().enumerate() {
                let child = subschema(ctx, site, *branch, instance, Some(i.to_string()))?;
                if child.valid {
                    matched.push(i);
                }
                evaluation.children.push(child);
                if matched.len() > 1 && ctx.short_circuit_branches() {
                    break;
                }
            }
            match matched.len() {
                1 => {}
                0 => conclude(evaluation, false, || ValidationErrorKind::OneOfNoneValid),
                _ => conclude(evaluation, false, || ValidationErrorKind::OneOfMultipleValid {
                    valid: matched,
                }),
            }
        }
        Keyword::Not(negated) => {
            let child = subschema(ctx, site, *negated, instance, None)?;
            conclude(evaluation, !child.valid, || ValidationErrorKind::NotFailed);
            evaluation.children.push(child);
        }

        Keyword::If(condition) => {
            let child = subschema(ctx, site, *condition, instance, None)?;
            evaluation.asserts = false;
            evaluation.children.push(child);
        }
        Keyword::Then(branch) | Keyword::Else(branch) => {
            let wanted = matches!(site.keyword.keyword, Keyword::Then(_));
            let condition = site
                .evaluated("if")
                .and_then(|evaluation| evaluation.children.first())
                .map(|child| child.valid);
            if condition != Some(wanted) {
                return Ok(false);
            }
            let child = subschema(ctx, site, *branch, instance, None)?;
            conclude(evaluation, child.valid, || ValidationErrorKind::ConditionalFailed {
                branch: site.keyword.name.clone(),
            });
            evaluation.children.push(child);
        }
        Keyword::DependentSchemas(entries) => {
            let Some(members) = instance.as_object() else {
                return Ok(false);
            };
            let mut failed = Vec::new();
            for (property, dependent) in entries {
                if !members.contains_key(property) {
                    continue;
                }
                let child = subschema(ctx, site, *dependent, instance, Some(property.clone()))?;
                if !child.valid {
                    failed.push(property.clone());
                }
                evaluation.children.push(child);
                if !failed.is_empty() && ctx.options.short_circuit {
                    break;
                }
            }
            conclude(evaluation, failed.is_empty(), || {
                ValidationErrorKind::DependentSchemaFailed { properties: failed }
            });
        }

        Keyword::PrefixItems(schemas) | Keyword::ItemsArray(schemas) => {
            let Some(items) = instance.as_array() else {
                return Ok(false);
            };
            let mut failed = Vec::new();
            let mut applied = 0;
            for (i, (schema, item)) in schemas.iter().zip(items).enumerate() {
                let child = subschema(ctx, site, *schema, item, Some(i.to_string()))?;
                applied += 1;
                if !child.valid {
                    failed.push(i);
                }
                evaluation.children.push(child);
                if !failed.is_empty() && ctx.options.short_circuit {
                    break;
                }
            }
            if applied > 0 {
                evaluation.annotation = Some(if applied == items.len() {
                    Value::Bool(true)
                } else {
                    Value::from(applied - 1)
                });
            }
            conclude(evaluation, failed.is_empty(), || ValidationErrorKind::InvalidItems {
                indices: failed,
            });
        }
        Keyword::Items(schema) => {
            let start = sibling(site.keywords, |keyword| match keyword {
                Keyword::PrefixItems(prefix) => Some(prefix.len()),
                _ => None,
            })
            .unwrap_or(0);
            remaining_items(ctx, site, instance, *schema, start, evaluation)?;
        }
        Keyword::AdditionalItems(schema) => {
            let Some(start) = sibling(site.keywords, |keyword| match keyword {
                Keyword::ItemsArray(items) => Some(items.len()),
                _ => None,
            }) else {
                return Ok(false);
            };
            remaining_items(ctx, site, instance, *schema, start, evaluation)?;
        }
        Keyword::Contains(schema) => {
            let Some(items) = instance.as_array() else {
                return Ok(false);
            };
            let minimum = sibling(site.keywords, |keyword| match keyword {
                Keyword::MinContains(minimum) => Some(*minimum),
                _ => None,
            })
            .unwrap_or(1);
            let mut matched = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let child = subschema(ctx, site, *schema, item, None)?;
                if child.valid {
                    matched.push(i);
                }
                evaluation.children.push(child);
            }
            let count = matched.len();
            evaluation.annotation = Some(Value::from(matched));
            conclude(evaluation, count as u64 >= minimum, || {
                ValidationErrorKind::ContainsCountInvalid {
                    count,
                    min_contains: Some(minimum),
                    max_contains: None,
                }
            });
        }

        Keyword::Properties(entries) => {
            let Some(members) = instance.as_object() else {
                return Ok(false);
            };
            let mut failed = Vec::new();
            let mut matched = Vec::new();
            for (name, schema) in entries {
                let Some(value) = members.get(name) else {
                    continue;
                };
                let child = subschema(ctx, site, *schema, value, Some(name.clone()))?;
                matched.push(name.clone());
                if !child.valid {
                    failed.push(name.clone());
                }
                evaluation.children.push(child);
                if !failed.is_empty() && ctx.options.short_circuit {
                    break;
                }
            }
            evaluation.annotation = Some(Value::from(matched));
            conclude(evaluation, failed.is_empty(), || ValidationErrorKind::InvalidProperties {
                properties: failed,
            });
        }
        Keyword::PatternProperties(patterns) => {
            let Some(members) = instance.as_object() else {
                return Ok(false);
            };
            let mut failed = Vec::new();
            let mut matched = Vec::new();
            'members: for (name, value) in members {
                for (pattern, schema) in patterns {
                    if !pattern.is_match(name) {
                        continue;
                    }
                    let token = pattern.as_str().to_string();
                    let child = subschema(ctx, site, *schema, value, Some(token))?;
                    if !matched.contains(name) {
                        matched.push(name.clone());
                    }
                    if !child.valid && !failed.contains(name) {
                        failed.push(name.clone());
                    }
                    evaluation.children.push(child);
                    if !failed.is_empty() && ctx.options.short_circuit {
                        break 'members;
                    }
                }
            }
            evaluation.annotation = Some(Value::from(matched));
            conclude(evaluation, failed.is_empty(), || ValidationErrorKind::InvalidProperties {
                properties: failed,
            });
        }
        Keyword::AdditionalProperties(schema) => {
            let Some(members) = instance.as_object() else {
                return Ok(false);
            };
            let declared = sibling(site.keywords, |keyword| match keyword {
                Keyword::Properties(entries) => Some(entries.as_slice()),
                _ => None,
            })
            .unwrap_or_default();
            let patterns = sibling(site.keywords, |keyword| match keyword {
                Keyword::PatternProperties(patterns) => Some(patterns.as_slice()),
                _ => None,
            })
            .unwrap_or_default();
            let additional = members.iter().filter(|(name, _)| {
                !declared.iter().any(|(declared, _)| declared == *name)
                    && !patterns.iter().any(|(pattern, _)| pattern.is_match(name))
            });
            evaluate_members(ctx, site, *schema, additional, evaluation)?;
        }
        Keyword::PropertyNames(schema) => {
            let Some(members) = instance.as_object() else {
                return Ok(false);
            };
            let mut failed = Vec::new();
            for name in members.keys() {
                let key = JsonValue::string_at(name.clone(), instance.pointer().child(name.as_str()));
                let child = subschema(ctx, site, *schema, &key, None)?;
                if !child.valid {
                    failed.push(name.clone());
                }
                evaluation.children.push(child);
                if !failed.is_empty() && ctx.options.short_circuit {
                    break;
                }
            }
            conclude(evaluation, failed.is_empty(), || {
                ValidationErrorKind::InvalidPropertyNames { properties: failed }
            });
        }

        Keyword::UnevaluatedItems(schema) => {
            let Some(items) = instance.as_array() else {
                return Ok(false);
            };
            let names = match ctx.schema.node(site.node).dialect.draft() {
                Draft::Draft202012 => ITEM_ANNOTATIONS_2020_12,
                Draft::Draft201909 => ITEM_ANNOTATIONS_2019_09,
            };
            let mut evaluated = vec![false; items.len()];
            let mut annotations = Vec::new();
            collect_annotations(site.evaluated, names, instance.pointer(), &mut annotations);
            for annotation in annotations {
                match annotation {
                    Value::Bool(true) => evaluated.fill(true),
                    Value::Number(largest) => {
                        let largest = largest.as_u64().map_or(0, |n| n as usize);
                        for flag in evaluated.iter_mut().take(largest.saturating_add(1)) {
                            *flag = true;
                        }
                    }
                    Value::Array(indices) => {
                        for index in indices.iter().filter_map(Value::as_u64) {
                            if let Some(flag) = evaluated.get_mut(index as usize) {
                                *flag = true;
                            }
                        }
                    }
                    _ => {}
                }
            }
            let mut failed = Vec::new();
            let mut applied = false;
            for (i, item) in items.iter().enumerate().filter(|(i, _)| !evaluated[*i]) {
                let child = subschema(ctx, site, *schema, item, None)?;
                applied = true;
                if !child.valid {
                    failed.push(i);
                }
                evaluation.children.push(child);
                if !failed.is_empty() && ctx.options.short_circuit {
                    break;
                }
            }
            if applied {
                evaluation.annotation = Some(Value::Bool(true));
            }
            conclude(evaluation, failed.is_empty(), || ValidationErrorKind::InvalidItems {
                indices: failed,
            });
        }
        Keyword::UnevaluatedProperties(schema) => {
            let Some(members) = instance.as_object() else {
                return Ok(false);
            };
            let mut annotations = Vec::new();
            collect_annotations(
                site.evaluated,
                PROPERTY_ANNOTATIONS,
                instance.pointer(),
                &mut annotations,
            );
            let evaluated: HashSet<&str> = annotations
                .into_iter()
                .filter_map(Value::as_array)
                .flatten()
                .filter_map(Value::as_str)
                .collect();
            let unevaluated = members
                .iter()
                .filter(|(name, _)| !evaluated.contains(name.as_str()));
            evaluate_members(ctx, site, *schema, unevaluated, evaluation)?;
        }

        _ => return Ok(false),
    }
    Ok(true)
}

fn conclude(
    evaluation: &mut KeywordEvaluation,
    valid: bool,
    error: impl FnOnce() -> ValidationErrorKind,
) {
    evaluation.valid = valid;
    if !valid {
        evaluation.error = Some(error());
    }
}

/// Evaluate `target` at `instance`; `token` extends the keyword location
/// for keywords holding several subschemas.
fn subschema(
    ctx: &mut EvaluationContext<'_>,
    site: &Site<'_>,
    target: NodeKey,
    instance: &JsonValue,
    token: Option<String>,
) -> Result<EvaluationNode, EvaluationError> {
    let location = match token {
        Some(token) => site.keyword_location.child(token),
        None => site.keyword_location.clone(),
    };
    evaluate_node(ctx, target, instance, location, Some(site.scope))
}

fn reference_to(
    ctx: &mut EvaluationContext<'_>,
    site: &Site<'_>,
    instance: &JsonValue,
    target: NodeKey,
    reference: &str,
    evaluation: &mut KeywordEvaluation,
) -> Result<(), EvaluationError> {
    let child = subschema(ctx, site, target, instance, None)?;
    conclude(evaluation, child.valid, || ValidationErrorKind::ReferenceFailed {
        reference: reference.to_string(),
    });
    evaluation.children.push(child);
    Ok(())
}

/// `items`/`additionalItems`: the schema applies to every item from
/// `start` on.
fn remaining_items(
    ctx: &mut EvaluationContext<'_>,
    site: &Site<'_>,
    instance: &JsonValue,
    schema: NodeKey,
    start: usize,
    evaluation: &mut KeywordEvaluation,
) -> Result<(), EvaluationError> {
    let items = instance.as_array().unwrap_or_default();
    let mut failed = Vec::new();
    for (i, item) in items.iter().enumerate().skip(start) {
        let child = subschema(ctx, site, schema, item, None)?;
        if !child.valid {
            failed.push(i);
        }
        evaluation.children.push(child);
        if !failed.is_empty() && ctx.options.short_circuit {
            break;
        }
    }
    if items.len() > start {
        evaluation.annotation = Some(Value::Bool(true));
    }
    conclude(evaluation, failed.is_empty(), || ValidationErrorKind::InvalidItems {
        indices: failed,
    });
    Ok(())
}

/// `additionalProperties`/`unevaluatedProperties`: the schema applies to
/// each selected member; the annotation lists the members evaluated.
fn evaluate_members<'v>(
    ctx: &mut EvaluationContext<'_>,
    site: &Site<'_>,
    schema: NodeKey,
    members: impl Iterator<Item = (&'v String, &'v JsonValue)>,
    evaluation: &mut KeywordEvaluation,
) -> Result<(), EvaluationError> {
    let mut failed = Vec::new();
    let mut applied = Vec::new();
    for (name, value) in members {
        let child = subschema(ctx, site, schema, value, None)?;
        applied.push(name.clone());
        if !child.valid {
            failed.push(name.clone());
        }
        evaluation.children.push(child);
        if !failed.is_empty() && ctx.options.short_circuit {
            break;
        }
    }
    evaluation.annotation = Some(Value::from(applied));
    conclude(evaluation, failed.is_empty(), || ValidationErrorKind::InvalidProperties {
        properties: failed,
    });
    Ok(())
}

fn sibling<'k, T>(
    keywords: &'k [CompiledKeyword],
    select: impl FnMut(&'k Keyword) -> Option<T>,
) -> Option<T> {
    keywords.iter().map(|compiled| &compiled.keyword).find_map(select)
}

/// Annotations named in `names` that are visible at `location`: from valid
/// sibling keywords and, recursively, from valid subschema evaluations of
/// the same instance location.
fn collect_annotations<'e>(
    evaluations: &'e [KeywordEvaluation],
    names: &[&str],
    location: &JsonPointer,
    out: &mut Vec<&'e Value>,
) {
    for evaluation in evaluations.iter().filter(|evaluation| evaluation.valid) {
        if evaluation.instance_location == *location
            && names.contains(&evaluation.keyword.as_str())
            && let Some(annotation) = &evaluation.annotation
        {
            out.push(annotation);
        }
        for child in &evaluation.children {
            if child.valid && child.instance_location == *location {
                collect_annotations(&child.keywords, names, location, out);
            }
        }
    }
}

/// `$dynamicRef` target: the outermost resource in scope that declares
/// `anchor` as a dynamic anchor.
fn dynamic_target(schema: &CompiledSchema, scope: &Scope<'_>, anchor: &str) -> Option<NodeKey> {
    scope.frames().into_iter().find_map(|frame| {
        let info = schema.node(frame).resource_info.as_ref()?;
        info.dynamic_anchors.get(anchor).map(|&index| NodeKey {
            document: frame.document,
            index,
        })
    })
}

/// `$recursiveRef` target: when the current resource sets
/// `$recursiveAnchor`, the outermost resource in scope that does too.
fn recursive_target(schema: &CompiledSchema, scope: &Scope<'_>, target: NodeKey) -> NodeKey {
    let anchored = |key: NodeKey| {
        schema
            .node(key)
            .resource_info
            .as_ref()
            .is_some_and(|info| info.recursive_anchor)
    };
    if !anchored(target) {
        return target;
    }
    scope
        .frames()
        .into_iter()
        .find(|frame| anchored(*frame))
        .unwrap_or(target)
}
