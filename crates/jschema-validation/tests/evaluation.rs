use jschema_validation::{
    Catalog, CompiledSchema, DRAFT_2019_09, EvaluationError, EvaluationOptions, JsonValue,
    OutputFormat, ValidationErrorKind, format,
};
use serde_json::json;

fn value(v: serde_json::Value) -> JsonValue {
    JsonValue::from_serde(&v)
}

fn compile(schema: serde_json::Value) -> CompiledSchema {
    Catalog::new().compile(value(schema)).unwrap()
}

fn is_valid(schema: &CompiledSchema, instance: serde_json::Value) -> bool {
    schema.is_valid(&value(instance)).unwrap()
}

#[test]
fn test_unevaluated_properties_sees_sibling_annotations() {
    // Listed first, evaluated after `properties`.
    let schema = compile(json!({
        "unevaluatedProperties": false,
        "properties": {"a": {}}
    }));
    assert!(!is_valid(&schema, json!({"a": 1, "b": 2})));
    assert!(is_valid(&schema, json!({"a": 1})));

    let result = schema.evaluate(&value(json!({"a": 1, "b": 2}))).unwrap();
    let names: Vec<&str> = result.keywords.iter().map(|k| k.keyword.as_str()).collect();
    assert_eq!(names, ["properties", "unevaluatedProperties"]);
}

#[test]
fn test_unevaluated_properties_through_applicators() {
    let schema = compile(json!({
        "allOf": [{"properties": {"a": true}}],
        "anyOf": [{"properties": {"b": true}}, {"required": ["c"]}],
        "if": {"properties": {"kind": {"const": "x"}}},
        "then": {"properties": {"x": true}},
        "unevaluatedProperties": false
    }));
    assert!(is_valid(&schema, json!({"a": 1, "b": 2})));
    assert!(is_valid(&schema, json!({"kind": "x", "x": 1})));
    assert!(!is_valid(&schema, json!({"kind": "y", "x": 1})));
    assert!(!is_valid(&schema, json!({"d": 1})));
}

#[test]
fn test_failed_branches_contribute_no_annotations() {
    let schema = compile(json!({
        "anyOf": [
            {"properties": {"a": {"type": "string"}}},
            {"properties": {"b": true}}
        ],
        "unevaluatedProperties": false
    }));
    assert!(is_valid(&schema, json!({"a": "x", "b": 1})));
    assert!(!is_valid(&schema, json!({"a": 1, "b": 1})));
}

#[test]
fn test_unevaluated_items() {
    let schema = compile(json!({
        "prefixItems": [{"type": "string"}],
        "contains": {"type": "boolean"},
        "unevaluatedItems": {"type": "integer"}
    }));
    assert!(is_valid(&schema, json!(["a", true, 1, 2])));
    assert!(!is_valid(&schema, json!(["a", true, 1.5])));
}

#[test]
fn test_legacy_items_and_additional_items() {
    let schema = compile(json!({
        "$schema": DRAFT_2019_09,
        "items": [{"type": "string"}, {"type": "integer"}],
        "additionalItems": false
    }));
    assert!(is_valid(&schema, json!(["a", 1])));
    assert!(is_valid(&schema, json!(["a"])));
    assert!(!is_valid(&schema, json!(["a", 1, null])));

    let result = schema.evaluate(&value(json!(["a", 1, null]))).unwrap();
    let additional = result.keyword("additionalItems").unwrap();
    assert_eq!(
        additional.error,
        Some(ValidationErrorKind::InvalidItems { indices: vec![2] })
    );
    assert_eq!(additional.children[0].instance_location.to_string(), "/2");
}

#[test]
fn test_one_of() {
    let schema = compile(json!({"oneOf": [{"type": "string"}, {"maxLength": 2}]}));
    assert!(is_valid(&schema, json!("long string")));
    assert!(!is_valid(&schema, json!("ab")));
    assert!(is_valid(&schema, json!(true)));
    assert!(is_valid(&schema, json!(1)));

    let none = compile(json!({"oneOf": [{"type": "string"}, {"type": "null"}]}));
    assert!(!is_valid(&none, json!(1)));
}

#[test]
fn test_dependent_schemas_and_property_names() {
    let schema = compile(json!({
        "dependentSchemas": {"card": {"required": ["billing"]}},
        "propertyNames": {"pattern": "^[a-z]+$"}
    }));
    assert!(is_valid(&schema, json!({"card": 1, "billing": 2})));
    assert!(!is_valid(&schema, json!({"card": 1})));
    assert!(!is_valid(&schema, json!({"Card": 1})));

    let result = schema.evaluate(&value(json!({"Card": 1}))).unwrap();
    let names = result.keyword("propertyNames").unwrap();
    assert_eq!(
        names.error,
        Some(ValidationErrorKind::InvalidPropertyNames {
            properties: vec!["Card".to_string()]
        })
    );
}

#[test]
fn test_evaluation_is_deterministic() {
    let schema = compile(json!({
        "type": "object",
        "properties": {"tags": {"type": "array", "items": {"type": "string"}, "uniqueItems": true}},
        "patternProperties": {"^x-": {"type": "integer"}},
        "additionalProperties": false
    }));
    let instance = value(json!({"tags": ["a", "a", 3], "x-count": "two", "extra": null}));
    let first = schema.evaluate(&instance).unwrap();
    let second = schema.evaluate(&instance).unwrap();
    assert_eq!(first, second);
    assert!(!first.valid);
}

#[test]
fn test_short_circuit_agrees_with_exhaustive() {
    let schema = compile(json!({
        "anyOf": [{"type": "string"}, {"minimum": 10}],
        "not": {"const": 12}
    }));
    let short = EvaluationOptions::default().with_short_circuit(true);
    for instance in [json!("x"), json!(11), json!(12), json!(3)] {
        let instance = value(instance);
        let exhaustive = schema.evaluate(&instance).unwrap().valid;
        let fast = schema.evaluate_with(&instance, &short).unwrap().valid;
        assert_eq!(exhaustive, fast, "{}", instance);
    }
}

#[test]
fn test_output_formats_agree() {
    let schema = compile(json!({
        "properties": {"age": {"type": "integer", "minimum": 0}},
        "required": ["name"]
    }));
    let result = schema.evaluate(&value(json!({"age": -3}))).unwrap();
    assert!(!result.valid);

    assert_eq!(format(&result, OutputFormat::Flag), json!({"valid": false}));

    let basic = format(&result, OutputFormat::Basic);
    let locations: Vec<&str> = basic["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|unit| unit["keywordLocation"].as_str().unwrap())
        .collect();
    assert!(locations.contains(&"/required"));
    assert!(locations.contains(&"/properties/age/minimum"));

    let detailed = format(&result, OutputFormat::Detailed);
    assert_eq!(detailed["valid"], json!(false));
    assert_eq!(detailed["keywordLocation"], json!(""));
    assert!(detailed["nested"].as_array().unwrap().iter().all(|unit| unit["valid"] == false));
}

#[test]
fn test_mutual_recursion_hits_the_depth_limit() {
    let schema = compile(json!({
        "$defs": {
            "a": {"$ref": "#/$defs/b"},
            "b": {"$ref": "#/$defs/a"}
        },
        "$ref": "#/$defs/a"
    }));
    let options = EvaluationOptions::default().with_max_depth(16);
    let err = schema.evaluate_with(&value(json!(1)), &options).unwrap_err();
    match err {
        EvaluationError::RecursionLimitExceeded {
            limit,
            keyword_location,
            ..
        } => {
            assert_eq!(limit, 16);
            assert!(keyword_location.starts_with("/$ref/$ref"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_recursion_on_instance_depth_is_not_a_fault() {
    let schema = compile(json!({"items": {"$ref": "#"}}));
    assert!(is_valid(&schema, json!([[[[]]]])));
}

#[test]
fn test_self_reference_reports_the_failing_leaf() {
    let schema = compile(json!({"type": "array", "items": {"$ref": "#"}}));
    assert!(is_valid(&schema, json!([[], [[]]])));

    let result = schema.evaluate(&value(json!([[[1]]]))).unwrap();
    assert!(!result.valid);
    let basic = format(&result, OutputFormat::Basic);
    let type_errors: Vec<_> = basic["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|unit| unit["keywordLocation"].as_str().unwrap().ends_with("/type"))
        .collect();
    assert_eq!(type_errors.len(), 1);
    assert_eq!(type_errors[0]["instanceLocation"], json!("/0/0/0"));
    assert_eq!(
        type_errors[0]["keywordLocation"],
        json!("/items/$ref/items/$ref/items/$ref/type")
    );
    assert!(
        type_errors[0]["absoluteKeywordLocation"]
            .as_str()
            .unwrap()
            .ends_with("#/type")
    );
}

#[test]
fn test_compiled_schemas_are_shared_across_threads() {
    let schema = compile(json!({"type": "integer", "multipleOf": 3}));
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let schema = &schema;
                scope.spawn(move || schema.is_valid(&value(json!(i * 3))).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    });
}
