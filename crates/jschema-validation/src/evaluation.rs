//! Evaluation trees.

use crate::error::ValidationErrorKind;
use jschema_json::JsonPointer;

/// The result of evaluating one schema node against one instance location.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationNode {
    pub valid: bool,
    pub instance_location: JsonPointer,
    /// Evaluation path from the root schema, through any references.
    pub keyword_location: JsonPointer,
    /// Canonical URI of the schema node.
    pub absolute_keyword_location: String,
    /// URI of the innermost resource in the dynamic scope.
    pub scope: String,
    /// Set for the boolean schema `false`.
    pub error: Option<ValidationErrorKind>,
    /// Evaluated keywords in evaluation order.
    pub keywords: Vec<KeywordEvaluation>,
}

/// The result of one keyword at one node.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordEvaluation {
    pub keyword: String,
    pub keyword_location: JsonPointer,
    pub absolute_keyword_location: String,
    pub instance_location: JsonPointer,
    pub valid: bool,
    /// False for keywords whose failure does not affect the node (`if`,
    /// annotation-only keywords).
    pub asserts: bool,
    pub annotation: Option<serde_json::Value>,
    pub error: Option<ValidationErrorKind>,
    /// Subschema evaluations, for applicators.
    pub children: Vec<EvaluationNode>,
}

impl EvaluationNode {
    /// Child evaluations across all keywords.
    pub fn children(&self) -> impl Iterator<Item = &EvaluationNode> {
        self.keywords.iter().flat_map(|keyword| keyword.children.iter())
    }

    /// Keyword evaluation by keyword name.
    pub fn keyword(&self, name: &str) -> Option<&KeywordEvaluation> {
        self.keywords.iter().find(|keyword| keyword.keyword == name)
    }
}
