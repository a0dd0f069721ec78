use super::NodeKey;
use crate::format::FormatPredicate;
use crate::vocabulary::CustomKeyword;
use jschema_json::{JsonType, JsonValue, Number};
use regex::Regex;

/// A keyword with its parsed argument.
pub(crate) struct CompiledKeyword {
    pub(crate) name: String,
    pub(crate) keyword: Keyword,
    /// Absolute keyword location (schema canonical URI plus keyword).
    pub(crate) absolute_location: String,
    /// Instance types the keyword applies to; empty means all.
    pub(crate) instance_types: Vec<JsonType>,
}

impl CompiledKeyword {
    pub(crate) fn applies_to(&self, instance: &JsonValue) -> bool {
        self.instance_types.is_empty()
            || self.instance_types.iter().any(|ty| instance.is_type(*ty))
    }
}

pub(crate) enum Keyword {
    /// Identifiers, `$comment`, `$defs`: no evaluation.
    Inert,
    /// Produces its raw value as an annotation (meta-data, content,
    /// `contentSchema` next to `contentMediaType`, and unknown keywords).
    Annotation(serde_json::Value),

    Ref {
        target: NodeKey,
        reference: String,
    },
    /// `anchor` is set only when the static target itself declares the
    /// matching `$dynamicAnchor`.
    DynamicRef {
        target: NodeKey,
        anchor: Option<String>,
        reference: String,
    },
    RecursiveRef {
        target: NodeKey,
    },

    AllOf(Vec<NodeKey>),
    AnyOf(Vec<NodeKey>),
    OneOf(Vec<NodeKey>),
    Not(NodeKey),
    If(NodeKey),
    Then(NodeKey),
    Else(NodeKey),
    DependentSchemas(Vec<(String, NodeKey)>),
    PrefixItems(Vec<NodeKey>),
    /// Schema form of `items`, applied after any prefix.
    Items(NodeKey),
    /// 2019-09 array form of `items`.
    ItemsArray(Vec<NodeKey>),
    AdditionalItems(NodeKey),
    Contains(NodeKey),
    Properties(Vec<(String, NodeKey)>),
    PatternProperties(Vec<(Regex, NodeKey)>),
    AdditionalProperties(NodeKey),
    PropertyNames(NodeKey),
    UnevaluatedItems(NodeKey),
    UnevaluatedProperties(NodeKey),

    Type(Vec<JsonType>),
    Enum(Vec<JsonValue>),
    Const(JsonValue),
    MultipleOf(Number),
    Maximum(Number),
    ExclusiveMaximum(Number),
    Minimum(Number),
    ExclusiveMinimum(Number),
    MaxLength(u64),
    MinLength(u64),
    Pattern(Regex),
    MaxItems(u64),
    MinItems(u64),
    UniqueItems(bool),
    MaxContains(u64),
    MinContains(u64),
    MaxProperties(u64),
    MinProperties(u64),
    Required(Vec<String>),
    DependentRequired(Vec<(String, Vec<String>)>),

    Format {
        name: String,
        assert: bool,
        predicate: Option<FormatPredicate>,
    },
    Custom {
        implementation: CustomKeyword,
        value: JsonValue,
    },
}

impl Keyword {
    pub(crate) fn is_unevaluated(&self) -> bool {
        matches!(
            self,
            Keyword::UnevaluatedItems(_) | Keyword::UnevaluatedProperties(_)
        )
    }
}
