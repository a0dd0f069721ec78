//! Standard output formats for evaluation trees.
//!
//! - `flag`: `{"valid": bool}`.
//! - `basic`: a flat list of `errors` (invalid) or `annotations` (valid).
//! - `detailed`: the tree of units, pruned to the subtrees that explain the
//!   verdict (failures when invalid, annotations when valid).
//! - `verbose`: the whole tree.
//!
//! Every unit carries `valid`, `instanceLocation`, `keywordLocation` and
//! `absoluteKeywordLocation`, plus `error`/`annotation` and `nested` where
//! present.

use crate::error::EvaluationError;
use crate::evaluation::{EvaluationNode, KeywordEvaluation};
use jschema_json::JsonPointer;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Flag,
    #[default]
    Basic,
    Detailed,
    Verbose,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Flag => "flag",
            OutputFormat::Basic => "basic",
            OutputFormat::Detailed => "detailed",
            OutputFormat::Verbose => "verbose",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flag" => Ok(OutputFormat::Flag),
            "basic" => Ok(OutputFormat::Basic),
            "detailed" => Ok(OutputFormat::Detailed),
            "verbose" => Ok(OutputFormat::Verbose),
            other => Err(EvaluationError::InvalidOutputMode(other.to_string())),
        }
    }
}

/// Render an evaluation tree in `format`.
pub fn format(tree: &EvaluationNode, format: OutputFormat) -> Value {
    match format {
        OutputFormat::Flag => {
            let mut output = Map::new();
            output.insert("valid".to_string(), Value::Bool(tree.valid));
            Value::Object(output)
        }
        OutputFormat::Basic => basic(tree),
        OutputFormat::Detailed => {
            let nested = tree
                .keywords
                .iter()
                .filter_map(|keyword| detailed_keyword(keyword, tree.valid))
                .collect();
            node_unit(tree, nested)
        }
        OutputFormat::Verbose => verbose_node(tree),
    }
}

struct Unit<'a> {
    valid: bool,
    instance_location: &'a JsonPointer,
    keyword_location: &'a JsonPointer,
    absolute_keyword_location: &'a str,
    error: Option<String>,
    annotation: Option<Value>,
    nested: Vec<Value>,
}

impl Unit<'_> {
    fn into_value(self) -> Value {
        let mut unit = Map::new();
        unit.insert("valid".to_string(), Value::Bool(self.valid));
        unit.insert(
            "instanceLocation".to_string(),
            Value::String(self.instance_location.to_string()),
        );
        unit.insert(
            "keywordLocation".to_string(),
            Value::String(self.keyword_location.to_string()),
        );
        unit.insert(
            "absoluteKeywordLocation".to_string(),
            Value::String(self.absolute_keyword_location.to_string()),
        );
        if let Some(error) = self.error {
            unit.insert("error".to_string(), Value::String(error));
        }
        if let Some(annotation) = self.annotation {
            unit.insert("annotation".to_string(), annotation);
        }
        if !self.nested.is_empty() {
            unit.insert("nested".to_string(), Value::Array(self.nested));
        }
        Value::Object(unit)
    }
}

fn node_unit(node: &EvaluationNode, nested: Vec<Value>) -> Value {
    Unit {
        valid: node.valid,
        instance_location: &node.instance_location,
        keyword_location: &node.keyword_location,
        absolute_keyword_location: &node.absolute_keyword_location,
        error: node.error.as_ref().map(|error| error.message()),
        annotation: None,
        nested,
    }
    .into_value()
}

fn keyword_unit(keyword: &KeywordEvaluation, with_annotation: bool, nested: Vec<Value>) -> Value {
    Unit {
        valid: keyword.valid,
        instance_location: &keyword.instance_location,
        keyword_location: &keyword.keyword_location,
        absolute_keyword_location: &keyword.absolute_keyword_location,
        error: keyword.error.as_ref().map(|error| error.message()),
        annotation: if with_annotation {
            keyword.annotation.clone()
        } else {
            None
        },
        nested,
    }
    .into_value()
}

fn basic(tree: &EvaluationNode) -> Value {
    let mut units = Vec::new();
    let key = if tree.valid {
        collect_annotations(tree, &mut units);
        "annotations"
    } else {
        collect_errors(tree, &mut units);
        "errors"
    };
    let mut output = Map::new();
    output.insert("valid".to_string(), Value::Bool(tree.valid));
    if !units.is_empty() {
        output.insert(key.to_string(), Value::Array(units));
    }
    Value::Object(output)
}

fn collect_errors(node: &EvaluationNode, units: &mut Vec<Value>) {
    if node.error.is_some() {
        units.push(node_unit(node, Vec::new()));
    }
    for keyword in node.keywords.iter().filter(|k| k.asserts && !k.valid) {
        if keyword.error.is_some() {
            units.push(keyword_unit(keyword, false, Vec::new()));
        }
        for child in keyword.children.iter().filter(|child| !child.valid) {
            collect_errors(child, units);
        }
    }
}

fn collect_annotations(node: &EvaluationNode, units: &mut Vec<Value>) {
    for keyword in node.keywords.iter().filter(|k| k.valid) {
        if keyword.annotation.is_some() {
            units.push(keyword_unit(keyword, true, Vec::new()));
        }
        for child in keyword.children.iter().filter(|child| child.valid) {
            collect_annotations(child, units);
        }
    }
}

/// Keyword units that explain a verdict of `valid`.
fn detailed_keyword(keyword: &KeywordEvaluation, valid: bool) -> Option<Value> {
    if valid {
        if !keyword.valid {
            return None;
        }
        let nested: Vec<Value> = keyword
            .children
            .iter()
            .filter(|child| child.valid)
            .filter_map(|child| detailed_node(child, true))
            .collect();
        if keyword.annotation.is_none() && nested.is_empty() {
            return None;
        }
        Some(keyword_unit(keyword, true, nested))
    } else {
        if keyword.valid || !keyword.asserts {
            return None;
        }
        let nested = keyword
            .children
            .iter()
            .filter(|child| !child.valid)
            .filter_map(|child| detailed_node(child, false))
            .collect();
        Some(keyword_unit(keyword, false, nested))
    }
}

fn detailed_node(node: &EvaluationNode, valid: bool) -> Option<Value> {
    let nested: Vec<Value> = node
        .keywords
        .iter()
        .filter_map(|keyword| detailed_keyword(keyword, valid))
        .collect();
    if nested.is_empty() && node.error.is_none() {
        return None;
    }
    Some(node_unit(node, nested))
}

fn verbose_node(node: &EvaluationNode) -> Value {
    let nested = node
        .keywords
        .iter()
        .map(|keyword| {
            let children = keyword.children.iter().map(verbose_node).collect();
            keyword_unit(keyword, true, children)
        })
        .collect();
    node_unit(node, nested)
}
