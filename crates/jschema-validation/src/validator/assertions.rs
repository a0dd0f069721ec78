// Assertion keywords: checks of the instance itself, no subschemas.

use crate::error::ValidationErrorKind;
use crate::format::FormatPredicate;
use crate::schema::Keyword;
use jschema_json::{JsonValue, Number};

/// The failure of an assertion keyword, if any.
pub(super) fn check(keyword: &Keyword, instance: &JsonValue) -> Option<ValidationErrorKind> {
    match keyword {
        Keyword::Type(types) => {
            if types.iter().any(|ty| instance.is_type(*ty)) {
                return None;
            }
            Some(ValidationErrorKind::TypeMismatch {
                expected: types.iter().map(|ty| ty.to_string()).collect(),
                got: instance.json_type().to_string(),
            })
        }
        Keyword::Enum(allowed) => {
            if allowed.iter().any(|value| value == instance) {
                return None;
            }
            Some(ValidationErrorKind::InvalidEnumValue {
                value: instance.to_string(),
                allowed: allowed.iter().map(JsonValue::to_string).collect(),
            })
        }
        Keyword::Const(expected) => (expected != instance).then(|| {
            ValidationErrorKind::ConstMismatch {
                value: instance.to_string(),
                expected: expected.to_string(),
            }
        }),
        Keyword::MultipleOf(divisor) => {
            let value = instance.as_number()?;
            (!value.is_multiple_of(divisor)).then(|| ValidationErrorKind::NumberNotMultipleOf {
                value: value.to_string(),
                multiple_of: divisor.to_string(),
            })
        }
        Keyword::Maximum(limit) => range(instance, |value| value <= limit, |e| e.maximum = Some(limit.to_string())),
        Keyword::ExclusiveMaximum(limit) => range(instance, |value| value < limit, |e| {
            e.exclusive_maximum = Some(limit.to_string())
        }),
        Keyword::Minimum(limit) => range(instance, |value| value >= limit, |e| e.minimum = Some(limit.to_string())),
        Keyword::ExclusiveMinimum(limit) => range(instance, |value| value > limit, |e| {
            e.exclusive_minimum = Some(limit.to_string())
        }),
        Keyword::MaxLength(max) => {
            let length = instance.as_str()?.chars().count();
            (length as u64 > *max).then(|| ValidationErrorKind::StringLengthInvalid {
                length,
                min_length: None,
                max_length: Some(*max),
            })
        }
        Keyword::MinLength(min) => {
            let length = instance.as_str()?.chars().count();
            ((length as u64) < *min).then(|| ValidationErrorKind::StringLengthInvalid {
                length,
                min_length: Some(*min),
                max_length: None,
            })
        }
        Keyword::Pattern(pattern) => {
            let value = instance.as_str()?;
            (!pattern.is_match(value)).then(|| ValidationErrorKind::StringPatternMismatch {
                value: value.to_string(),
                pattern: pattern.as_str().to_string(),
            })
        }
        Keyword::MaxItems(max) => {
            let length = instance.as_array()?.len();
            (length as u64 > *max).then(|| ValidationErrorKind::ArrayLengthInvalid {
                length,
                min_items: None,
                max_items: Some(*max),
            })
        }
        Keyword::MinItems(min) => {
            let length = instance.as_array()?.len();
            ((length as u64) < *min).then(|| ValidationErrorKind::ArrayLengthInvalid {
                length,
                min_items: Some(*min),
                max_items: None,
            })
        }
        Keyword::UniqueItems(true) => {
            let items = instance.as_array()?;
            items.iter().enumerate().find_map(|(second, item)| {
                items[..second]
                    .iter()
                    .position(|earlier| earlier == item)
                    .map(|first| ValidationErrorKind::ArrayItemsNotUnique { first, second })
            })
        }
        Keyword::MaxProperties(max) => {
            let count = instance.as_object()?.len();
            (count as u64 > *max).then(|| ValidationErrorKind::ObjectPropertyCountInvalid {
                count,
                min_properties: None,
                max_properties: Some(*max),
            })
        }
        Keyword::MinProperties(min) => {
            let count = instance.as_object()?.len();
            ((count as u64) < *min).then(|| ValidationErrorKind::ObjectPropertyCountInvalid {
                count,
                min_properties: Some(*min),
                max_properties: None,
            })
        }
        Keyword::Required(required) => {
            let members = instance.as_object()?;
            let missing: Vec<String> = required
                .iter()
                .filter(|name| !members.contains_key(name.as_str()))
                .cloned()
                .collect();
            (!missing.is_empty()).then_some(ValidationErrorKind::MissingRequiredProperties {
                properties: missing,
            })
        }
        Keyword::DependentRequired(dependencies) => {
            let members = instance.as_object()?;
            dependencies
                .iter()
                .filter(|(property, _)| members.contains_key(property))
                .find_map(|(property, required)| {
                    let missing: Vec<String> = required
                        .iter()
                        .filter(|name| !members.contains_key(name.as_str()))
                        .cloned()
                        .collect();
                    (!missing.is_empty()).then(|| ValidationErrorKind::MissingDependentProperties {
                        property: property.clone(),
                        missing,
                    })
                })
        }
        _ => None,
    }
}

fn range(
    instance: &JsonValue,
    within: impl FnOnce(&Number) -> bool,
    bound: impl FnOnce(&mut RangeBounds),
) -> Option<ValidationErrorKind> {
    let value = instance.as_number()?;
    if within(value) {
        return None;
    }
    let mut bounds = RangeBounds::default();
    bound(&mut bounds);
    Some(ValidationErrorKind::NumberOutOfRange {
        value: value.to_string(),
        minimum: bounds.minimum,
        maximum: bounds.maximum,
        exclusive_minimum: bounds.exclusive_minimum,
        exclusive_maximum: bounds.exclusive_maximum,
    })
}

#[derive(Default)]
struct RangeBounds {
    minimum: Option<String>,
    maximum: Option<String>,
    exclusive_minimum: Option<String>,
    exclusive_maximum: Option<String>,
}

/// Asserting `format`. Non-strings always pass; a format with no enabled
/// predicate passes unless `strict`.
pub(super) fn format(
    name: &str,
    predicate: Option<&FormatPredicate>,
    instance: &JsonValue,
    strict: bool,
) -> Option<ValidationErrorKind> {
    let value = instance.as_str()?;
    let Some(predicate) = predicate else {
        return strict.then(|| ValidationErrorKind::UnknownFormat {
            format: name.to_string(),
        });
    };
    (!predicate(value)).then(|| ValidationErrorKind::InvalidFormat {
        value: value.to_string(),
        format: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jschema_json::JsonType;
    use regex::Regex;
    use serde_json::json;
    use std::sync::Arc;

    fn value(v: serde_json::Value) -> JsonValue {
        JsonValue::from_serde(&v)
    }

    #[test]
    fn test_type_integer_matches_whole_floats() {
        let keyword = Keyword::Type(vec![JsonType::Integer]);
        assert!(check(&keyword, &value(json!(1.0))).is_none());
        assert_eq!(
            check(&keyword, &value(json!(1.5))),
            Some(ValidationErrorKind::TypeMismatch {
                expected: vec!["integer".to_string()],
                got: "number".to_string(),
            })
        );
    }

    #[test]
    fn test_enum_and_const_use_json_equality() {
        let keyword = Keyword::Enum(vec![value(json!({"a": 1, "b": [1.0]}))]);
        assert!(check(&keyword, &value(json!({"b": [1], "a": 1.0}))).is_none());
        assert!(check(&Keyword::Const(value(json!(0))), &value(json!(false))).is_some());
    }

    #[test]
    fn test_range_reports_the_violated_bound() {
        let keyword = Keyword::ExclusiveMinimum(Number::from(5i64));
        assert!(check(&keyword, &value(json!(5.5))).is_none());
        assert_eq!(
            check(&keyword, &value(json!(5))),
            Some(ValidationErrorKind::NumberOutOfRange {
                value: "5".to_string(),
                minimum: None,
                maximum: None,
                exclusive_minimum: Some("5".to_string()),
                exclusive_maximum: None,
            })
        );
    }

    #[test]
    fn test_multiple_of_float() {
        let keyword = Keyword::MultipleOf(Number::from_f64(0.01));
        assert!(check(&keyword, &value(json!(19.99))).is_none());
        assert!(check(&keyword, &value(json!(19.995))).is_some());
    }

    #[test]
    fn test_string_length_counts_characters() {
        let keyword = Keyword::MaxLength(2);
        assert!(check(&keyword, &value(json!("ńé"))).is_none());
        assert!(check(&keyword, &value(json!("abc"))).is_some());
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let keyword = Keyword::Pattern(Regex::new("b+").unwrap());
        assert!(check(&keyword, &value(json!("abbc"))).is_none());
        assert!(check(&keyword, &value(json!("ac"))).is_some());
    }

    #[test]
    fn test_unique_items_reports_first_pair() {
        let keyword = Keyword::UniqueItems(true);
        assert_eq!(
            check(&keyword, &value(json!([1, 2, {"a": 1}, 2.0]))),
            Some(ValidationErrorKind::ArrayItemsNotUnique { first: 1, second: 3 })
        );
        assert!(check(&Keyword::UniqueItems(false), &value(json!([1, 1]))).is_none());
    }

    #[test]
    fn test_required_and_dependent_required() {
        let instance = value(json!({"a": 1, "card": "x"}));
        assert_eq!(
            check(&Keyword::Required(vec!["a".into(), "b".into()]), &instance),
            Some(ValidationErrorKind::MissingRequiredProperties {
                properties: vec!["b".to_string()]
            })
        );
        let dependent = Keyword::DependentRequired(vec![(
            "card".to_string(),
            vec!["billing".to_string()],
        )]);
        assert_eq!(
            check(&dependent, &instance),
            Some(ValidationErrorKind::MissingDependentProperties {
                property: "card".to_string(),
                missing: vec!["billing".to_string()],
            })
        );
    }

    #[test]
    fn test_format_predicate() {
        let even_length: FormatPredicate = Arc::new(|s: &str| s.len() % 2 == 0);
        assert!(format("even", Some(&even_length), &value(json!("ab")), false).is_none());
        assert!(format("even", Some(&even_length), &value(json!("abc")), false).is_some());
        assert!(format("even", Some(&even_length), &value(json!(3)), false).is_none());
        assert!(format("missing", None, &value(json!("x")), false).is_none());
        assert!(format("missing", None, &value(json!("x")), true).is_some());
    }
}
