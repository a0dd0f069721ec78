//! Built-in vocabularies of the 2019-09 and 2020-12 drafts.

use super::{AFTER_ALL, Builtin, Draft, KeywordDefinition, Vocabulary};
use crate::options::{DRAFT_2019_09, DRAFT_2020_12};
use jschema_json::JsonType;

const CORE_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/core";
const APPLICATOR_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
const UNEVALUATED_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
const VALIDATION_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
const META_DATA_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
const FORMAT_ANNOTATION_2020_12: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-annotation";
const FORMAT_ASSERTION_2020_12: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-assertion";
const CONTENT_2020_12: &str = "https://json-schema.org/draft/2020-12/vocab/content";

const CORE_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/core";
const APPLICATOR_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/applicator";
const VALIDATION_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/validation";
const META_DATA_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/meta-data";
const FORMAT_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/format";
const CONTENT_2019_09: &str = "https://json-schema.org/draft/2019-09/vocab/content";

const OBJECT: &[JsonType] = &[JsonType::Object];
const ARRAY: &[JsonType] = &[JsonType::Array];
const STRING: &[JsonType] = &[JsonType::String];
const NUMBER: &[JsonType] = &[JsonType::Number];

fn kw(name: &str, builtin: Builtin) -> KeywordDefinition {
    KeywordDefinition::builtin(name, builtin)
}

/// Every built-in vocabulary, ready to seed a catalog.
pub(crate) fn builtin_vocabularies() -> Vec<Vocabulary> {
    vec![
        Vocabulary::new(CORE_2020_12, core(Draft::Draft202012)),
        Vocabulary::new(APPLICATOR_2020_12, applicator(Draft::Draft202012)),
        Vocabulary::new(UNEVALUATED_2020_12, unevaluated()),
        Vocabulary::new(VALIDATION_2020_12, validation()),
        Vocabulary::new(META_DATA_2020_12, meta_data()),
        Vocabulary::new(
            FORMAT_ANNOTATION_2020_12,
            vec![kw("format", Builtin::FormatAnnotation)],
        ),
        Vocabulary::new(
            FORMAT_ASSERTION_2020_12,
            vec![kw("format", Builtin::FormatAssertion)],
        ),
        Vocabulary::new(CONTENT_2020_12, content()),
        Vocabulary::new(CORE_2019_09, core(Draft::Draft201909)),
        Vocabulary::new(APPLICATOR_2019_09, {
            let mut keywords = applicator(Draft::Draft201909);
            keywords.extend(unevaluated());
            keywords
        }),
        Vocabulary::new(VALIDATION_2019_09, validation()),
        Vocabulary::new(META_DATA_2019_09, meta_data()),
        Vocabulary::new(FORMAT_2019_09, vec![kw("format", Builtin::FormatAnnotation)]),
        Vocabulary::new(CONTENT_2019_09, content()),
    ]
}

/// The vocabulary list (URI, required) of a standard metaschema.
pub(crate) fn known_dialect(metaschema: &str) -> Option<(Draft, Vec<(&'static str, bool)>)> {
    match metaschema {
        DRAFT_2020_12 => Some((
            Draft::Draft202012,
            vec![
                (CORE_2020_12, true),
                (APPLICATOR_2020_12, true),
                (UNEVALUATED_2020_12, true),
                (VALIDATION_2020_12, true),
                (META_DATA_2020_12, true),
                (FORMAT_ANNOTATION_2020_12, true),
                (CONTENT_2020_12, true),
            ],
        )),
        DRAFT_2019_09 => Some((
            Draft::Draft201909,
            vec![
                (CORE_2019_09, true),
                (APPLICATOR_2019_09, true),
                (VALIDATION_2019_09, true),
                (META_DATA_2019_09, true),
                (FORMAT_2019_09, false),
                (CONTENT_2019_09, true),
            ],
        )),
        _ => None,
    }
}

/// The draft implied by a `$vocabulary` declaration, from its core
/// vocabulary.
pub(crate) fn draft_of_vocabularies<'a>(uris: impl IntoIterator<Item = &'a str>) -> Option<Draft> {
    uris.into_iter().find_map(|uri| match uri {
        CORE_2020_12 => Some(Draft::Draft202012),
        CORE_2019_09 => Some(Draft::Draft201909),
        _ => None,
    })
}

fn core(draft: Draft) -> Vec<KeywordDefinition> {
    let mut keywords = vec![
        kw("$id", Builtin::Id),
        kw("$schema", Builtin::Schema),
        kw("$anchor", Builtin::Anchor),
        kw("$ref", Builtin::Ref),
        kw("$vocabulary", Builtin::VocabularyDecl),
        kw("$comment", Builtin::Comment),
        kw("$defs", Builtin::Defs),
    ];
    match draft {
        Draft::Draft202012 => {
            keywords.push(kw("$dynamicAnchor", Builtin::DynamicAnchor));
            keywords.push(kw("$dynamicRef", Builtin::DynamicRef));
        }
        Draft::Draft201909 => {
            keywords.push(kw("$recursiveAnchor", Builtin::RecursiveAnchor));
            keywords.push(kw("$recursiveRef", Builtin::RecursiveRef));
        }
    }
    keywords
}

fn applicator(draft: Draft) -> Vec<KeywordDefinition> {
    let mut keywords = vec![
        kw("allOf", Builtin::AllOf),
        kw("anyOf", Builtin::AnyOf),
        kw("oneOf", Builtin::OneOf),
        kw("not", Builtin::Not),
        kw("if", Builtin::If),
        kw("then", Builtin::Then).depends_on(&["if"]),
        kw("else", Builtin::Else).depends_on(&["if"]),
        kw("dependentSchemas", Builtin::DependentSchemas).for_types(OBJECT),
        kw("contains", Builtin::Contains).for_types(ARRAY),
        kw("properties", Builtin::Properties).for_types(OBJECT),
        kw("patternProperties", Builtin::PatternProperties).for_types(OBJECT),
        kw("additionalProperties", Builtin::AdditionalProperties)
            .depends_on(&["properties", "patternProperties"])
            .for_types(OBJECT),
        kw("propertyNames", Builtin::PropertyNames).for_types(OBJECT),
    ];
    match draft {
        Draft::Draft202012 => {
            keywords.push(kw("prefixItems", Builtin::PrefixItems).for_types(ARRAY));
            keywords.push(
                kw("items", Builtin::Items)
                    .depends_on(&["prefixItems"])
                    .for_types(ARRAY),
            );
        }
        Draft::Draft201909 => {
            keywords.push(kw("items", Builtin::LegacyItems).for_types(ARRAY));
            keywords.push(
                kw("additionalItems", Builtin::AdditionalItems)
                    .depends_on(&["items"])
                    .for_types(ARRAY),
            );
        }
    }
    keywords
}

fn unevaluated() -> Vec<KeywordDefinition> {
    vec![
        kw("unevaluatedItems", Builtin::UnevaluatedItems)
            .depends_on(&[AFTER_ALL])
            .for_types(ARRAY),
        kw("unevaluatedProperties", Builtin::UnevaluatedProperties)
            .depends_on(&[AFTER_ALL])
            .for_types(OBJECT),
    ]
}

fn validation() -> Vec<KeywordDefinition> {
    vec![
        kw("type", Builtin::Type),
        kw("enum", Builtin::Enum),
        kw("const", Builtin::Const),
        kw("multipleOf", Builtin::MultipleOf).for_types(NUMBER),
        kw("maximum", Builtin::Maximum).for_types(NUMBER),
        kw("exclusiveMaximum", Builtin::ExclusiveMaximum).for_types(NUMBER),
        kw("minimum", Builtin::Minimum).for_types(NUMBER),
        kw("exclusiveMinimum", Builtin::ExclusiveMinimum).for_types(NUMBER),
        kw("maxLength", Builtin::MaxLength).for_types(STRING),
        kw("minLength", Builtin::MinLength).for_types(STRING),
        kw("pattern", Builtin::Pattern).for_types(STRING),
        kw("maxItems", Builtin::MaxItems).for_types(ARRAY),
        kw("minItems", Builtin::MinItems).for_types(ARRAY),
        kw("uniqueItems", Builtin::UniqueItems).for_types(ARRAY),
        kw("maxContains", Builtin::MaxContains)
            .depends_on(&["contains"])
            .for_types(ARRAY),
        kw("minContains", Builtin::MinContains)
            .depends_on(&["contains"])
            .for_types(ARRAY),
        kw("maxProperties", Builtin::MaxProperties).for_types(OBJECT),
        kw("minProperties", Builtin::MinProperties).for_types(OBJECT),
        kw("required", Builtin::Required).for_types(OBJECT),
        kw("dependentRequired", Builtin::DependentRequired).for_types(OBJECT),
    ]
}

fn meta_data() -> Vec<KeywordDefinition> {
    [
        "title",
        "description",
        "default",
        "deprecated",
        "readOnly",
        "writeOnly",
        "examples",
    ]
    .into_iter()
    .map(|name| kw(name, Builtin::MetaData))
    .collect()
}

fn content() -> Vec<KeywordDefinition> {
    vec![
        kw("contentEncoding", Builtin::MetaData).for_types(STRING),
        kw("contentMediaType", Builtin::MetaData).for_types(STRING),
        kw("contentSchema", Builtin::ContentSchema)
            .depends_on(&["contentMediaType"])
            .for_types(STRING),
    ]
}
