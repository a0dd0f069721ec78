use jschema_validation::{
    Catalog, CatalogOptions, CompileError, DRAFT_2020_12, JsonType, JsonValue, KeywordDefinition,
    KeywordOutcome, ValidationErrorKind, Vocabulary,
};
use serde_json::json;

const EVEN_VOCABULARY: &str = "https://example.com/vocab/even";
const META: &str = "https://example.com/meta/even";

fn value(v: serde_json::Value) -> JsonValue {
    JsonValue::from_serde(&v)
}

fn even_vocabulary() -> Vocabulary {
    let even = KeywordDefinition::custom("even", |keyword, instance| {
        let wanted = keyword.as_bool().unwrap_or(true);
        let is_even = instance
            .as_number()
            .and_then(|n| n.as_i64())
            .is_some_and(|n| n % 2 == 0);
        if is_even == wanted {
            KeywordOutcome::Valid {
                annotation: Some(json!(is_even)),
            }
        } else {
            KeywordOutcome::Invalid {
                message: format!("{} is not {}", instance, if wanted { "even" } else { "odd" }),
            }
        }
    })
    .with_check(|keyword| match keyword.as_bool() {
        Some(_) => Ok(()),
        None => Err("even must be a boolean".to_string()),
    })
    .for_types(&[JsonType::Number]);
    Vocabulary::new(EVEN_VOCABULARY, vec![even])
}

fn catalog_with_metaschema(required: bool) -> Catalog {
    let catalog = Catalog::new();
    catalog
        .add_schema(
            META,
            value(json!({
                "$schema": DRAFT_2020_12,
                "$id": META,
                "$vocabulary": {
                    "https://json-schema.org/draft/2020-12/vocab/core": true,
                    "https://json-schema.org/draft/2020-12/vocab/applicator": true,
                    "https://json-schema.org/draft/2020-12/vocab/validation": true,
                    EVEN_VOCABULARY: required
                }
            })),
        )
        .unwrap();
    catalog
}

#[test]
fn test_custom_keyword() {
    let catalog = catalog_with_metaschema(true);
    catalog.register_vocabulary(even_vocabulary());
    let schema = catalog
        .compile(value(json!({
            "$schema": META,
            "properties": {"n": {"type": "integer", "even": true}}
        })))
        .unwrap();

    assert!(schema.is_valid(&value(json!({"n": 4}))).unwrap());
    let result = schema.evaluate(&value(json!({"n": 3}))).unwrap();
    assert!(!result.valid);
    let n = &result.keyword("properties").unwrap().children[0];
    let even = n.keyword("even").unwrap();
    assert_eq!(even.keyword_location.to_string(), "/properties/n/even");
    assert_eq!(
        even.error,
        Some(ValidationErrorKind::Custom {
            keyword: "even".to_string(),
            message: "3 is not even".to_string(),
        })
    );
}

#[test]
fn test_custom_keyword_applies_to_declared_types() {
    let catalog = catalog_with_metaschema(true);
    catalog.register_vocabulary(even_vocabulary());
    let schema = catalog
        .compile(value(json!({"$schema": META, "even": true})))
        .unwrap();
    assert!(schema.is_valid(&value(json!("three"))).unwrap());
    assert!(!schema.is_valid(&value(json!(3))).unwrap());
}

#[test]
fn test_custom_keyword_value_is_checked() {
    let catalog = catalog_with_metaschema(true);
    catalog.register_vocabulary(even_vocabulary());
    let err = catalog
        .compile(value(json!({"$schema": META, "even": "yes"})))
        .unwrap_err();
    assert!(matches!(err, CompileError::MalformedSchema { .. }));
}

#[test]
fn test_required_vocabulary_must_be_registered() {
    let catalog = catalog_with_metaschema(true);
    let err = catalog
        .compile(value(json!({"$schema": META, "even": true})))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownVocabulary { .. }));
}

#[test]
fn test_optional_unknown_vocabulary() {
    let catalog = catalog_with_metaschema(false);
    let schema = catalog
        .compile(value(json!({"$schema": META, "even": true})))
        .unwrap();
    // Unknown keywords are annotations.
    assert!(schema.is_valid(&value(json!(3))).unwrap());

    let strict = Catalog::with_options(CatalogOptions::default().with_strict_vocabularies(true));
    strict
        .add_schema(
            META,
            value(json!({
                "$schema": DRAFT_2020_12,
                "$vocabulary": {
                    "https://json-schema.org/draft/2020-12/vocab/core": true,
                    EVEN_VOCABULARY: false
                }
            })),
        )
        .unwrap();
    let err = strict
        .compile(value(json!({"$schema": META, "even": true})))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedVocabulary { .. }));
}

#[test]
fn test_vocabularies_limit_known_keywords() {
    let catalog = Catalog::new();
    catalog
        .add_schema(
            META,
            value(json!({
                "$schema": DRAFT_2020_12,
                "$vocabulary": {
                    "https://json-schema.org/draft/2020-12/vocab/core": true,
                    "https://json-schema.org/draft/2020-12/vocab/applicator": true
                }
            })),
        )
        .unwrap();
    let schema = catalog
        .compile(value(json!({
            "$schema": META,
            "properties": {"a": false},
            "minimum": 10
        })))
        .unwrap();
    // `minimum` is outside the dialect and only annotates.
    assert!(schema.is_valid(&value(json!(1))).unwrap());
    assert!(!schema.is_valid(&value(json!({"a": 1}))).unwrap());
}
