//! Vocabularies, keyword definitions and dialects.
//!
//! Known keywords are a closed [`Builtin`] variant; vocabularies registered
//! by the embedding application add [`KeywordDefinition::custom`] entries,
//! which pair a name with evaluation and checking functions.

mod builtin;
mod ordering;

pub(crate) use builtin::{builtin_vocabularies, draft_of_vocabularies, known_dialect};
pub(crate) use ordering::evaluation_order;

use indexmap::IndexMap;
use jschema_json::{JsonType, JsonValue};
use std::fmt;
use std::sync::Arc;

/// Dependency marker: run after every keyword that does not itself carry it.
pub(crate) const AFTER_ALL: &str = "*";

/// A named set of keyword definitions.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    uri: String,
    keywords: Vec<KeywordDefinition>,
}

impl Vocabulary {
    pub fn new(uri: impl Into<String>, keywords: Vec<KeywordDefinition>) -> Self {
        Self {
            uri: uri.into(),
            keywords,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn keywords(&self) -> &[KeywordDefinition] {
        &self.keywords
    }
}

/// Result of a custom keyword evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordOutcome {
    Valid {
        annotation: Option<serde_json::Value>,
    },
    Invalid {
        message: String,
    },
}

type EvaluateFn = dyn Fn(&JsonValue, &JsonValue) -> KeywordOutcome + Send + Sync;
type CheckFn = dyn Fn(&JsonValue) -> Result<(), String> + Send + Sync;

/// Functions backing a custom keyword.
#[derive(Clone)]
pub(crate) struct CustomKeyword {
    /// Called with the keyword value and the instance.
    pub(crate) evaluate: Arc<EvaluateFn>,
    /// Structural check of the keyword value at compile time.
    pub(crate) check: Option<Arc<CheckFn>>,
}

#[derive(Clone)]
pub(crate) enum KeywordImpl {
    Builtin(Builtin),
    Custom(CustomKeyword),
}

/// One keyword of a vocabulary.
#[derive(Clone)]
pub struct KeywordDefinition {
    pub(crate) name: String,
    pub(crate) implementation: KeywordImpl,
    pub(crate) depends_on: Vec<String>,
    /// Instance types the keyword applies to; empty means all.
    pub(crate) instance_types: Vec<JsonType>,
}

impl KeywordDefinition {
    /// A keyword evaluated by `evaluate(keyword_value, instance)`.
    pub fn custom(
        name: impl Into<String>,
        evaluate: impl Fn(&JsonValue, &JsonValue) -> KeywordOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            implementation: KeywordImpl::Custom(CustomKeyword {
                evaluate: Arc::new(evaluate),
                check: None,
            }),
            depends_on: Vec::new(),
            instance_types: Vec::new(),
        }
    }

    /// Validate the keyword value when a schema is compiled; an `Err`
    /// message becomes a `MalformedSchema` error.
    pub fn with_check(
        mut self,
        check: impl Fn(&JsonValue) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        if let KeywordImpl::Custom(custom) = &mut self.implementation {
            custom.check = Some(Arc::new(check));
        }
        self
    }

    /// Keywords that must be evaluated before this one when present.
    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.depends_on = names.iter().map(|name| name.to_string()).collect();
        self
    }

    /// Restrict the keyword to these instance types.
    pub fn for_types(mut self, types: &[JsonType]) -> Self {
        self.instance_types = types.to_vec();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn builtin(name: &str, builtin: Builtin) -> Self {
        Self {
            name: name.to_string(),
            implementation: KeywordImpl::Builtin(builtin),
            depends_on: Vec::new(),
            instance_types: Vec::new(),
        }
    }

    /// Where subschemas live in this keyword's value.
    pub(crate) fn shape(&self) -> SubschemaShape {
        match &self.implementation {
            KeywordImpl::Builtin(builtin) => builtin.shape(),
            KeywordImpl::Custom(_) => SubschemaShape::None,
        }
    }
}

impl fmt::Debug for KeywordDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let implementation = match &self.implementation {
            KeywordImpl::Builtin(builtin) => format!("{:?}", builtin),
            KeywordImpl::Custom(_) => "Custom".to_string(),
        };
        f.debug_struct("KeywordDefinition")
            .field("name", &self.name)
            .field("implementation", &implementation)
            .field("depends_on", &self.depends_on)
            .field("instance_types", &self.instance_types)
            .finish()
    }
}

/// The known keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    // Identifiers and other keywords with no evaluation of their own
    Id,
    Schema,
    Anchor,
    DynamicAnchor,
    RecursiveAnchor,
    VocabularyDecl,
    Comment,
    Defs,
    // References
    Ref,
    DynamicRef,
    RecursiveRef,
    // Applicators
    AllOf,
    AnyOf,
    OneOf,
    Not,
    If,
    Then,
    Else,
    DependentSchemas,
    PrefixItems,
    Items,
    /// 2019-09 `items`: a schema or an array of schemas.
    LegacyItems,
    AdditionalItems,
    Contains,
    Properties,
    PatternProperties,
    AdditionalProperties,
    PropertyNames,
    UnevaluatedItems,
    UnevaluatedProperties,
    // Assertions
    Type,
    Enum,
    Const,
    MultipleOf,
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
    MaxLength,
    MinLength,
    Pattern,
    MaxItems,
    MinItems,
    UniqueItems,
    MaxContains,
    MinContains,
    MaxProperties,
    MinProperties,
    Required,
    DependentRequired,
    // Formats
    FormatAnnotation,
    FormatAssertion,
    // Annotations
    MetaData,
    ContentSchema,
}

/// How a keyword value holds subschemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubschemaShape {
    None,
    Single,
    Array,
    Map,
    SingleOrArray,
}

impl Builtin {
    pub(crate) fn shape(self) -> SubschemaShape {
        match self {
            Builtin::Not
            | Builtin::If
            | Builtin::Then
            | Builtin::Else
            | Builtin::Items
            | Builtin::AdditionalItems
            | Builtin::Contains
            | Builtin::AdditionalProperties
            | Builtin::PropertyNames
            | Builtin::UnevaluatedItems
            | Builtin::UnevaluatedProperties
            | Builtin::ContentSchema => SubschemaShape::Single,
            Builtin::AllOf | Builtin::AnyOf | Builtin::OneOf | Builtin::PrefixItems => {
                SubschemaShape::Array
            }
            Builtin::Defs
            | Builtin::DependentSchemas
            | Builtin::Properties
            | Builtin::PatternProperties => SubschemaShape::Map,
            Builtin::LegacyItems => SubschemaShape::SingleOrArray,
            _ => SubschemaShape::None,
        }
    }
}

/// JSON Schema draft, which decides the few rules that are not expressed
/// through keyword definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Draft {
    Draft201909,
    Draft202012,
}

/// The keyword set selected by a metaschema.
#[derive(Debug)]
pub struct Dialect {
    metaschema: String,
    draft: Draft,
    keywords: IndexMap<String, KeywordDefinition>,
    unknown_vocabularies: Vec<String>,
}

impl Dialect {
    /// Merge `vocabularies` in order; a later definition of a keyword
    /// replaces an earlier one.
    pub(crate) fn new(
        metaschema: impl Into<String>,
        draft: Draft,
        vocabularies: &[Arc<Vocabulary>],
        unknown_vocabularies: Vec<String>,
    ) -> Self {
        let mut keywords = IndexMap::new();
        for vocabulary in vocabularies {
            for definition in vocabulary.keywords() {
                keywords.insert(definition.name.clone(), definition.clone());
            }
        }
        Self {
            metaschema: metaschema.into(),
            draft,
            keywords,
            unknown_vocabularies,
        }
    }

    /// The same keyword set under another metaschema URI (a metaschema
    /// without `$vocabulary` inherits its own metaschema's dialect).
    pub(crate) fn with_metaschema(&self, metaschema: impl Into<String>) -> Self {
        Self {
            metaschema: metaschema.into(),
            draft: self.draft,
            keywords: self.keywords.clone(),
            unknown_vocabularies: self.unknown_vocabularies.clone(),
        }
    }

    pub fn metaschema(&self) -> &str {
        &self.metaschema
    }

    pub fn draft(&self) -> Draft {
        self.draft
    }

    pub(crate) fn keyword(&self, name: &str) -> Option<&KeywordDefinition> {
        self.keywords.get(name)
    }

    /// Whether `name` is a keyword of this dialect.
    pub fn has_keyword(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    /// Optional vocabularies the metaschema declared but this catalog
    /// does not implement.
    pub fn unknown_vocabularies(&self) -> &[String] {
        &self.unknown_vocabularies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_definition_builder() {
        let definition = KeywordDefinition::custom("even", |_, _| KeywordOutcome::Valid {
            annotation: None,
        })
        .depends_on(&["type"])
        .for_types(&[JsonType::Number]);
        assert_eq!(definition.name(), "even");
        assert_eq!(definition.depends_on, vec!["type".to_string()]);
        assert_eq!(definition.shape(), SubschemaShape::None);
    }

    #[test]
    fn test_later_vocabulary_overrides_keyword() {
        let annotation = Arc::new(Vocabulary::new(
            "urn:test:a",
            vec![KeywordDefinition::builtin("format", Builtin::FormatAnnotation)],
        ));
        let assertion = Arc::new(Vocabulary::new(
            "urn:test:b",
            vec![KeywordDefinition::builtin("format", Builtin::FormatAssertion)],
        ));
        let dialect = Dialect::new("urn:test", Draft::Draft202012, &[annotation, assertion], vec![]);
        let format = dialect.keyword("format").unwrap();
        assert!(matches!(
            format.implementation,
            KeywordImpl::Builtin(Builtin::FormatAssertion)
        ));
    }
}
