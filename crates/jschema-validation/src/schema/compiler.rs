//! Compile sessions.
//!
//! A session compiles one document plus every document its references pull
//! in, in two passes:
//!
//! 1. Indexing walks each document depth-first, creating an arena node for
//!    every schema location and recording resources (`$id`), anchors and
//!    the dialect in effect.
//! 2. Keyword compilation parses keyword arguments into [`Keyword`]s.
//!    References are resolved here, against the session's own documents
//!    first and then the catalog; unknown documents are fetched and indexed,
//!    then compiled by the same loop.
//!
//! Nothing is registered until the whole session succeeds; the catalog
//! commits the [`CompileOutput`] atomically.

use super::{
    CompiledDocument, CompiledKeyword, DocumentId, Keyword, NodeKey, NodeLookup, ResourceInfo,
    SchemaBody, SchemaNode,
};
use crate::catalog::{Catalog, Deferred};
use crate::error::CompileError;
use crate::format::FormatRegistry;
use crate::uri;
use crate::vocabulary::{
    Builtin, Dialect, Draft, KeywordDefinition, KeywordImpl, SubschemaShape, evaluation_order,
};
use indexmap::IndexMap;
use jschema_json::{JsonKind, JsonPointer, JsonType, JsonValue, Number};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use url::Url;

/// Everything a successful session produced, ready to be registered.
pub(crate) struct CompileOutput {
    pub(crate) documents: Vec<CompiledDocument>,
    pub(crate) resources: HashMap<Url, NodeKey>,
}

struct NodeBuilder {
    location: JsonPointer,
    base_uri: Url,
    resource: usize,
    /// Location relative to the resource root.
    resource_pointer: JsonPointer,
    dialect: Arc<Dialect>,
    /// Found under an unknown keyword: no identifiers, lenient keywords.
    speculative: bool,
    dynamic_anchor: Option<String>,
    resource_info: Option<ResourceInfo>,
    body: Option<SchemaBody>,
}

struct DocumentBuilder {
    id: DocumentId,
    uri: Url,
    raw: Arc<JsonValue>,
    nodes: Vec<NodeBuilder>,
    by_location: HashMap<JsonPointer, usize>,
    dependencies: BTreeSet<DocumentId>,
}

impl NodeLookup for DocumentBuilder {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn node_location(&self, index: usize) -> Option<&JsonPointer> {
        self.nodes.get(index).map(|node| &node.location)
    }

    fn node_at(&self, location: &JsonPointer) -> Option<usize> {
        self.by_location.get(location).copied()
    }

    fn resource_info(&self, index: usize) -> Option<&ResourceInfo> {
        self.nodes.get(index)?.resource_info.as_ref()
    }

    fn dynamic_anchor(&self, index: usize) -> Option<&str> {
        self.nodes.get(index)?.dynamic_anchor.as_deref()
    }
}

impl DocumentBuilder {
    fn build(self) -> CompiledDocument {
        let nodes: Vec<SchemaNode> = self
            .nodes
            .into_iter()
            .map(|node| SchemaNode {
                canonical: uri::location(&node.base_uri, &node.resource_pointer),
                location: node.location,
                base_uri: node.base_uri,
                resource: node.resource,
                dialect: node.dialect,
                body: node.body.unwrap_or(SchemaBody::Boolean(true)),
                dynamic_anchor: node.dynamic_anchor,
                resource_info: node.resource_info,
            })
            .collect();
        let uses_unevaluated = nodes.iter().any(|node| match &node.body {
            SchemaBody::Keywords(keywords) => keywords.iter().any(|k| k.keyword.is_unevaluated()),
            SchemaBody::Boolean(_) => false,
        });
        CompiledDocument {
            id: self.id,
            uri: self.uri,
            raw: self.raw,
            nodes,
            by_location: self.by_location,
            dependencies: self.dependencies,
            uses_unevaluated,
        }
    }
}

/// Lexical state inherited by subschemas during indexing.
#[derive(Clone)]
struct Lexical {
    base: Url,
    resource: usize,
    resource_location: JsonPointer,
    dialect: Arc<Dialect>,
    /// URIs of the enclosing resources, outermost first.
    enclosing: Vec<Url>,
}

pub(crate) struct Compiler<'c> {
    catalog: &'c Catalog,
    /// Set when the session needs a document that has not been fetched.
    deferred: &'c Deferred,
    formats: FormatRegistry,
    strict_vocabularies: bool,
    /// A document being replaced: its resources do not count as taken.
    replacing: Option<DocumentId>,
    documents: Vec<DocumentBuilder>,
    resources: HashMap<Url, NodeKey>,
}

impl<'c> Compiler<'c> {
    pub(crate) fn new(
        catalog: &'c Catalog,
        replacing: Option<DocumentId>,
        deferred: &'c Deferred,
    ) -> Self {
        Self {
            catalog,
            deferred,
            formats: catalog.format_registry(),
            strict_vocabularies: catalog.options().strict_vocabularies,
            replacing,
            documents: Vec::new(),
            resources: HashMap::new(),
        }
    }

    /// Index a document registered as `uri`; returns its root key.
    pub(crate) fn add_document(
        &mut self,
        uri: Url,
        raw: Arc<JsonValue>,
    ) -> Result<NodeKey, CompileError> {
        let doc = self.index_document(uri, raw)?;
        Ok(NodeKey {
            document: self.documents[doc].id,
            index: 0,
        })
    }

    /// Compile keywords of every indexed document (including documents
    /// fetched along the way).
    pub(crate) fn finish(mut self) -> Result<CompileOutput, CompileError> {
        let mut next = 0;
        while next < self.documents.len() {
            self.compile_keywords(next)?;
            next += 1;
        }
        let Compiler {
            documents,
            resources,
            ..
        } = self;
        Ok(CompileOutput {
            documents: documents.into_iter().map(DocumentBuilder::build).collect(),
            resources,
        })
    }

    // Indexing

    fn index_document(&mut self, uri: Url, raw: Arc<JsonValue>) -> Result<usize, CompileError> {
        let id = self.catalog.allocate_document_id();
        let doc = self.documents.len();
        tracing::debug!(uri = %uri, document = id.0, "indexing schema document");
        self.documents.push(DocumentBuilder {
            id,
            uri: uri.clone(),
            raw: Arc::clone(&raw),
            nodes: Vec::new(),
            by_location: HashMap::new(),
            dependencies: BTreeSet::new(),
        });

        let dialect = match raw.get("$schema") {
            Some(metaschema) => {
                let metaschema = metaschema.as_str().ok_or_else(|| {
                    self.malformed(doc, metaschema.pointer(), "$schema must be a string")
                })?;
                self.catalog.dialect(metaschema, Some(self.deferred))?
            }
            None => self.catalog.default_dialect(Some(self.deferred))?,
        };
        let root = Lexical {
            base: uri,
            resource: 0,
            resource_location: JsonPointer::root(),
            dialect,
            enclosing: Vec::new(),
        };
        self.index_schema(doc, &raw, &root, false)?;
        Ok(doc)
    }

    fn index_schema(
        &mut self,
        doc: usize,
        value: &JsonValue,
        parent: &Lexical,
        speculative: bool,
    ) -> Result<(), CompileError> {
        let index = self.documents[doc].nodes.len();
        let is_root = index == 0;
        let location = value.pointer().clone();
        let key = NodeKey {
            document: self.documents[doc].id,
            index,
        };
        let mut lexical = parent.clone();

        let members = match value.kind() {
            JsonKind::Object(members) => Some(members),
            JsonKind::Boolean(_) => None,
            _ if speculative => return Ok(()),
            _ => {
                return Err(self.malformed(
                    doc,
                    &location,
                    "a schema must be an object or a boolean",
                ));
            }
        };

        let mut new_resource = is_root.then(|| self.documents[doc].uri.clone());
        if let Some(members) = members
            && !speculative
        {
            if !is_root
                && members.contains_key("$id")
                && lexical.dialect.has_keyword("$schema")
                && let Some(metaschema) = members.get("$schema")
            {
                let metaschema = metaschema.as_str().ok_or_else(|| {
                    self.malformed(doc, metaschema.pointer(), "$schema must be a string")
                })?;
                lexical.dialect = self.catalog.dialect(metaschema, Some(self.deferred))?;
            }
            if lexical.dialect.has_keyword("$id")
                && let Some(id) = members.get("$id")
            {
                let resolved = self.resolve_id(doc, id, &lexical)?;
                if !is_root && (resolved == lexical.base || lexical.enclosing.contains(&resolved)) {
                    return Err(CompileError::CyclicIdRedefinition {
                        id: resolved.to_string(),
                        location: self.location(doc, &location),
                    });
                }
                new_resource = Some(resolved);
            }
        }

        let mut resource_info = None;
        if let Some(resource_uri) = new_resource {
            if is_root {
                let document_uri = self.documents[doc].uri.clone();
                self.claim_resource(document_uri.clone(), key)?;
                if resource_uri != document_uri {
                    lexical.enclosing.push(document_uri);
                }
            } else {
                lexical.enclosing.push(lexical.base.clone());
            }
            if resource_uri != self.documents[doc].uri || !is_root {
                self.claim_resource(resource_uri.clone(), key)?;
            }
            tracing::debug!(resource = %resource_uri, location = %location, "schema resource");
            lexical.base = resource_uri.clone();
            lexical.resource = index;
            lexical.resource_location = location.clone();
            resource_info = Some(ResourceInfo::new(resource_uri));
        }

        let resource_pointer = location
            .strip_prefix(&lexical.resource_location)
            .unwrap_or_default();
        self.documents[doc].nodes.push(NodeBuilder {
            location: location.clone(),
            base_uri: lexical.base.clone(),
            resource: lexical.resource,
            resource_pointer,
            dialect: Arc::clone(&lexical.dialect),
            speculative,
            dynamic_anchor: None,
            resource_info,
            body: value.as_bool().map(SchemaBody::Boolean),
        });
        self.documents[doc].by_location.insert(location, index);

        let Some(members) = members else {
            return Ok(());
        };
        if !speculative {
            self.index_anchors(doc, index, members, &lexical)?;
        }

        for (name, member) in members {
            match lexical.dialect.keyword(name).map(KeywordDefinition::shape) {
                Some(SubschemaShape::None) => {}
                Some(SubschemaShape::Single) => {
                    self.index_schema(doc, member, &lexical, speculative)?;
                }
                Some(SubschemaShape::Array) => {
                    for item in member.as_array().unwrap_or_default() {
                        self.index_schema(doc, item, &lexical, speculative)?;
                    }
                }
                Some(SubschemaShape::Map) => {
                    if let Some(entries) = member.as_object() {
                        for entry in entries.values() {
                            self.index_schema(doc, entry, &lexical, speculative)?;
                        }
                    }
                }
                Some(SubschemaShape::SingleOrArray) => match member.as_array() {
                    Some(items) => {
                        for item in items {
                            self.index_schema(doc, item, &lexical, speculative)?;
                        }
                    }
                    None => self.index_schema(doc, member, &lexical, speculative)?,
                },
                None => self.index_unknown(doc, member, &lexical)?,
            }
        }
        Ok(())
    }

    /// Values under unknown keywords: anything schema-shaped becomes a
    /// speculative node so JSON Pointer references can target it.
    fn index_unknown(
        &mut self,
        doc: usize,
        value: &JsonValue,
        lexical: &Lexical,
    ) -> Result<(), CompileError> {
        match value.kind() {
            JsonKind::Object(_) | JsonKind::Boolean(_) => {
                self.index_schema(doc, value, lexical, true)
            }
            JsonKind::Array(items) => {
                for item in items {
                    self.index_unknown(doc, item, lexical)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn resolve_id(
        &self,
        doc: usize,
        id: &JsonValue,
        lexical: &Lexical,
    ) -> Result<Url, CompileError> {
        let text = id
            .as_str()
            .ok_or_else(|| self.malformed(doc, id.pointer(), "$id must be a string"))?;
        let resolved = lexical.base.join(text).map_err(|e| {
            self.malformed(doc, id.pointer(), format!("invalid $id '{}': {}", text, e))
        })?;
        if resolved.fragment().is_some_and(|fragment| !fragment.is_empty()) {
            return Err(self.malformed(
                doc,
                id.pointer(),
                format!("$id '{}' must not contain a non-empty fragment", text),
            ));
        }
        Ok(uri::without_fragment(&resolved))
    }

    fn index_anchors(
        &mut self,
        doc: usize,
        index: usize,
        members: &IndexMap<String, JsonValue>,
        lexical: &Lexical,
    ) -> Result<(), CompileError> {
        let draft = lexical.dialect.draft();
        if lexical.dialect.has_keyword("$anchor")
            && let Some(anchor) = members.get("$anchor")
        {
            let name = self.anchor_name(doc, anchor, draft)?;
            self.register_anchor(doc, lexical.resource, name, index, false)?;
        }
        if lexical.dialect.has_keyword("$dynamicAnchor")
            && let Some(anchor) = members.get("$dynamicAnchor")
        {
            let name = self.anchor_name(doc, anchor, draft)?;
            self.register_anchor(doc, lexical.resource, name.clone(), index, true)?;
            self.documents[doc].nodes[index].dynamic_anchor = Some(name);
        }
        if lexical.dialect.has_keyword("$recursiveAnchor")
            && let Some(flag) = members.get("$recursiveAnchor")
        {
            let flag = flag.as_bool().ok_or_else(|| {
                self.malformed(doc, flag.pointer(), "$recursiveAnchor must be a boolean")
            })?;
            // Only meaningful at a resource root.
            if flag
                && lexical.resource == index
                && let Some(info) = self.documents[doc].nodes[index].resource_info.as_mut()
            {
                info.recursive_anchor = true;
            }
        }
        Ok(())
    }

    fn anchor_name(&self, doc: usize, anchor: &JsonValue, draft: Draft) -> Result<String, CompileError> {
        let name = anchor
            .as_str()
            .ok_or_else(|| self.malformed(doc, anchor.pointer(), "anchor must be a string"))?;
        let mut chars = name.chars();
        let valid_start = chars.next().is_some_and(|c| match draft {
            Draft::Draft202012 => c.is_ascii_alphabetic() || c == '_',
            Draft::Draft201909 => c.is_ascii_alphabetic(),
        });
        let valid_rest = chars.all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '-' | '.' | '_')
                || (draft == Draft::Draft201909 && c == ':')
        });
        if !(valid_start && valid_rest) {
            return Err(self.malformed(
                doc,
                anchor.pointer(),
                format!("'{}' is not a valid anchor name", name),
            ));
        }
        Ok(name.to_string())
    }

    fn register_anchor(
        &mut self,
        doc: usize,
        resource: usize,
        name: String,
        index: usize,
        dynamic: bool,
    ) -> Result<(), CompileError> {
        let Some(info) = self.documents[doc].nodes[resource].resource_info.as_mut() else {
            return Ok(());
        };
        if let Some(&existing) = info.anchors.get(&name)
            && existing != index
        {
            return Err(CompileError::DuplicateAnchor {
                anchor: name,
                resource: info.uri.to_string(),
            });
        }
        if dynamic {
            info.dynamic_anchors.insert(name.clone(), index);
        }
        info.anchors.insert(name, index);
        Ok(())
    }

    fn claim_resource(&mut self, uri: Url, key: NodeKey) -> Result<(), CompileError> {
        let taken = match self.resources.get(&uri) {
            Some(existing) => *existing != key,
            None => self.registered_resource(&uri).is_some(),
        };
        if taken {
            return Err(CompileError::DuplicateResource {
                uri: uri.to_string(),
            });
        }
        self.resources.insert(uri, key);
        Ok(())
    }

    fn registered_resource(&self, uri: &Url) -> Option<NodeKey> {
        self.catalog
            .registered_resource(uri)
            .filter(|key| Some(key.document) != self.replacing)
    }

    // Keyword compilation

    fn compile_keywords(&mut self, doc: usize) -> Result<(), CompileError> {
        let raw = Arc::clone(&self.documents[doc].raw);
        for index in 0..self.documents[doc].nodes.len() {
            if self.documents[doc].nodes[index].body.is_some() {
                continue;
            }
            let location = self.documents[doc].nodes[index].location.clone();
            let value = location
                .evaluate(&raw)
                .map_err(|e| self.malformed(doc, &location, e.to_string()))?;
            let Some(members) = value.as_object() else {
                continue;
            };
            let keywords = self.compile_object(doc, index, members)?;
            self.documents[doc].nodes[index].body = Some(SchemaBody::Keywords(keywords));
        }
        Ok(())
    }

    fn compile_object(
        &mut self,
        doc: usize,
        index: usize,
        members: &IndexMap<String, JsonValue>,
    ) -> Result<Vec<CompiledKeyword>, CompileError> {
        let node = &self.documents[doc].nodes[index];
        let dialect = Arc::clone(&node.dialect);
        let speculative = node.speculative;
        let base_uri = node.base_uri.clone();
        let resource_pointer = node.resource_pointer.clone();

        let mut compiled = Vec::with_capacity(members.len());
        let mut dependencies: Vec<Vec<String>> = Vec::with_capacity(members.len());
        for (name, value) in members {
            let absolute_location = uri::location(&base_uri, &resource_pointer.child(name.as_str()));
            let (keyword, depends_on, instance_types) = match dialect.keyword(name) {
                Some(definition) => {
                    let keyword = match self.compile_keyword(doc, index, definition, value, members) {
                        Ok(keyword) => keyword,
                        Err(err) if speculative => {
                            tracing::debug!(
                                keyword = %name,
                                error = %err,
                                "keeping keyword under unknown keyword as annotation"
                            );
                            Keyword::Annotation(value.to_serde())
                        }
                        Err(err) => return Err(err),
                    };
                    (
                        keyword,
                        definition.depends_on.clone(),
                        definition.instance_types.clone(),
                    )
                }
                None => {
                    if self.strict_vocabularies
                        && !speculative
                        && !dialect.unknown_vocabularies().is_empty()
                    {
                        return Err(CompileError::UnsupportedVocabulary {
                            keyword: name.clone(),
                            location: self.location(doc, value.pointer()),
                            vocabularies: dialect.unknown_vocabularies().to_vec(),
                        });
                    }
                    (Keyword::Annotation(value.to_serde()), Vec::new(), Vec::new())
                }
            };
            compiled.push(Some(CompiledKeyword {
                name: name.clone(),
                keyword,
                absolute_location,
                instance_types,
            }));
            dependencies.push(depends_on);
        }

        let order = {
            let names_and_deps: Vec<(&str, &[String])> = members
                .keys()
                .map(String::as_str)
                .zip(dependencies.iter().map(Vec::as_slice))
                .collect();
            evaluation_order(&names_and_deps)
        };
        Ok(order
            .into_iter()
            .filter_map(|i| compiled.get_mut(i).and_then(Option::take))
            .collect())
    }

    fn compile_keyword(
        &mut self,
        doc: usize,
        index: usize,
        definition: &KeywordDefinition,
        value: &JsonValue,
        siblings: &IndexMap<String, JsonValue>,
    ) -> Result<Keyword, CompileError> {
        let builtin = match &definition.implementation {
            KeywordImpl::Builtin(builtin) => *builtin,
            KeywordImpl::Custom(custom) => {
                if let Some(check) = &custom.check {
                    check(value).map_err(|message| self.malformed(doc, value.pointer(), message))?;
                }
                return Ok(Keyword::Custom {
                    implementation: custom.clone(),
                    value: value.clone(),
                });
            }
        };

        let keyword = match builtin {
            Builtin::Id | Builtin::Anchor | Builtin::DynamicAnchor | Builtin::RecursiveAnchor => {
                // Checked while indexing.
                Keyword::Inert
            }
            Builtin::Schema | Builtin::Comment => {
                self.string(doc, value)?;
                Keyword::Inert
            }
            Builtin::VocabularyDecl | Builtin::Defs => {
                self.object(doc, value)?;
                Keyword::Inert
            }
            Builtin::Ref => {
                let reference = self.string(doc, value)?;
                let (target, resolved) = self.resolve_reference(doc, index, reference)?;
                Keyword::Ref {
                    target,
                    reference: resolved.to_string(),
                }
            }
            Builtin::DynamicRef => {
                let reference = self.string(doc, value)?;
                let (target, resolved) = self.resolve_reference(doc, index, reference)?;
                let anchor = resolved
                    .fragment()
                    .filter(|name| !name.is_empty() && !name.starts_with('/'))
                    .filter(|name| {
                        self.with_document(target.document, |d| {
                            d.dynamic_anchor(target.index) == Some(*name)
                        })
                        .unwrap_or(false)
                    })
                    .map(str::to_string);
                Keyword::DynamicRef {
                    target,
                    anchor,
                    reference: resolved.to_string(),
                }
            }
            Builtin::RecursiveRef => {
                if value.as_str() != Some("#") {
                    return Err(self.malformed(doc, value.pointer(), "$recursiveRef must be \"#\""));
                }
                Keyword::RecursiveRef {
                    target: NodeKey {
                        document: self.documents[doc].id,
                        index: self.documents[doc].nodes[index].resource,
                    },
                }
            }
            Builtin::AllOf => Keyword::AllOf(self.schema_array(doc, value)?),
            Builtin::AnyOf => Keyword::AnyOf(self.schema_array(doc, value)?),
            Builtin::OneOf => Keyword::OneOf(self.schema_array(doc, value)?),
            Builtin::PrefixItems => Keyword::PrefixItems(self.schema_array(doc, value)?),
            Builtin::Not => Keyword::Not(self.subschema(doc, value)?),
            Builtin::If => Keyword::If(self.subschema(doc, value)?),
            Builtin::Then => Keyword::Then(self.subschema(doc, value)?),
            Builtin::Else => Keyword::Else(self.subschema(doc, value)?),
            Builtin::Items => Keyword::Items(self.subschema(doc, value)?),
            Builtin::LegacyItems => match value.as_array() {
                Some(items) => Keyword::ItemsArray(
                    items
                        .iter()
                        .map(|item| self.subschema(doc, item))
                        .collect::<Result<_, _>>()?,
                ),
                None => Keyword::Items(self.subschema(doc, value)?),
            },
            Builtin::AdditionalItems => Keyword::AdditionalItems(self.subschema(doc, value)?),
            Builtin::Contains => Keyword::Contains(self.subschema(doc, value)?),
            Builtin::AdditionalProperties => {
                Keyword::AdditionalProperties(self.subschema(doc, value)?)
            }
            Builtin::PropertyNames => Keyword::PropertyNames(self.subschema(doc, value)?),
            Builtin::UnevaluatedItems => Keyword::UnevaluatedItems(self.subschema(doc, value)?),
            Builtin::UnevaluatedProperties => {
                Keyword::UnevaluatedProperties(self.subschema(doc, value)?)
            }
            Builtin::Properties => Keyword::Properties(self.schema_map(doc, value)?),
            Builtin::DependentSchemas => Keyword::DependentSchemas(self.schema_map(doc, value)?),
            Builtin::PatternProperties => {
                let entries = self.schema_map(doc, value)?;
                let mut compiled = Vec::with_capacity(entries.len());
                for (pattern, target) in entries {
                    compiled.push((self.regex(doc, value, &pattern)?, target));
                }
                Keyword::PatternProperties(compiled)
            }
            Builtin::Type => Keyword::Type(self.types(doc, value)?),
            Builtin::Enum => {
                let items = value.as_array().ok_or_else(|| {
                    self.malformed(doc, value.pointer(), "enum must be an array")
                })?;
                Keyword::Enum(items.to_vec())
            }
            Builtin::Const => Keyword::Const(value.clone()),
            Builtin::MultipleOf => {
                let divisor = self.number(doc, value)?;
                if divisor <= Number::from(0i64) {
                    return Err(self.malformed(doc, value.pointer(), "multipleOf must be greater than 0"));
                }
                Keyword::MultipleOf(divisor)
            }
            Builtin::Maximum => Keyword::Maximum(self.number(doc, value)?),
            Builtin::ExclusiveMaximum => Keyword::ExclusiveMaximum(self.number(doc, value)?),
            Builtin::Minimum => Keyword::Minimum(self.number(doc, value)?),
            Builtin::ExclusiveMinimum => Keyword::ExclusiveMinimum(self.number(doc, value)?),
            Builtin::MaxLength => Keyword::MaxLength(self.count(doc, value)?),
            Builtin::MinLength => Keyword::MinLength(self.count(doc, value)?),
            Builtin::MaxItems => Keyword::MaxItems(self.count(doc, value)?),
            Builtin::MinItems => Keyword::MinItems(self.count(doc, value)?),
            Builtin::MaxContains => Keyword::MaxContains(self.count(doc, value)?),
            Builtin::MinContains => Keyword::MinContains(self.count(doc, value)?),
            Builtin::MaxProperties => Keyword::MaxProperties(self.count(doc, value)?),
            Builtin::MinProperties => Keyword::MinProperties(self.count(doc, value)?),
            Builtin::Pattern => {
                let pattern = self.string(doc, value)?;
                Keyword::Pattern(self.regex(doc, value, pattern)?)
            }
            Builtin::UniqueItems => Keyword::UniqueItems(value.as_bool().ok_or_else(|| {
                self.malformed(doc, value.pointer(), "uniqueItems must be a boolean")
            })?),
            Builtin::Required => Keyword::Required(self.string_array(doc, value)?),
            Builtin::DependentRequired => {
                let entries = self.object(doc, value)?;
                let mut compiled = Vec::with_capacity(entries.len());
                for (property, required) in entries {
                    compiled.push((property.clone(), self.string_array(doc, required)?));
                }
                Keyword::DependentRequired(compiled)
            }
            Builtin::FormatAnnotation | Builtin::FormatAssertion => {
                let name = self.string(doc, value)?;
                Keyword::Format {
                    name: name.to_string(),
                    assert: builtin == Builtin::FormatAssertion,
                    predicate: self.formats.get(name),
                }
            }
            Builtin::MetaData => Keyword::Annotation(value.to_serde()),
            Builtin::ContentSchema => {
                self.subschema(doc, value)?;
                if siblings.contains_key("contentMediaType") {
                    Keyword::Annotation(value.to_serde())
                } else {
                    Keyword::Inert
                }
            }
        };
        Ok(keyword)
    }

    // References

    fn resolve_reference(
        &mut self,
        doc: usize,
        index: usize,
        reference: &str,
    ) -> Result<(NodeKey, Url), CompileError> {
        let node = &self.documents[doc].nodes[index];
        let base = node.base_uri.clone();
        let location = self.location(doc, &node.location);
        let unresolvable = || CompileError::UnresolvableReference {
            reference: reference.to_string(),
            location: location.clone(),
        };
        let target = base.join(reference).map_err(|_| unresolvable())?;
        let key = self.resolve_url(&target)?.ok_or_else(unresolvable)?;
        let document = &mut self.documents[doc];
        if key.document != document.id {
            document.dependencies.insert(key.document);
        }
        tracing::debug!(reference, target = %target, "resolved reference");
        Ok((key, target))
    }

    /// Find the node for an absolute URI, fetching its document if needed.
    fn resolve_url(&mut self, url: &Url) -> Result<Option<NodeKey>, CompileError> {
        let fragment = url.fragment().unwrap_or("").to_string();
        let resource_url = uri::without_fragment(url);
        let resource = match self.lookup_resource(&resource_url) {
            Some(key) => key,
            None => {
                self.load_document(&resource_url)?;
                match self.lookup_resource(&resource_url) {
                    Some(key) => key,
                    None => return Ok(None),
                }
            }
        };
        Ok(self
            .with_document(resource.document, |d| {
                d.resolve_fragment(resource.index, &fragment)
            })
            .flatten())
    }

    fn lookup_resource(&self, uri: &Url) -> Option<NodeKey> {
        self.resources
            .get(uri)
            .copied()
            .or_else(|| self.registered_resource(uri))
    }

    fn load_document(&mut self, uri: &Url) -> Result<(), CompileError> {
        let raw = self.catalog.session_document(uri, self.deferred).map_err(|source| {
            if self.deferred.borrow().is_none() {
                tracing::warn!(uri = %uri, error = %source, "failed to load referenced document");
            }
            CompileError::FetchFailed {
                uri: uri.to_string(),
                source,
            }
        })?;
        self.index_document(uri.clone(), raw)?;
        Ok(())
    }

    fn with_document<R>(&self, id: DocumentId, f: impl FnOnce(&dyn NodeLookup) -> R) -> Option<R> {
        if let Some(document) = self.documents.iter().find(|d| d.id == id) {
            return Some(f(document));
        }
        let document = self.catalog.registered_document(id)?;
        Some(f(document.as_ref()))
    }

    // Argument helpers

    fn location(&self, doc: usize, pointer: &JsonPointer) -> String {
        uri::location(&self.documents[doc].uri, pointer)
    }

    fn malformed(&self, doc: usize, pointer: &JsonPointer, message: impl Into<String>) -> CompileError {
        CompileError::MalformedSchema {
            location: self.location(doc, pointer),
            message: message.into(),
        }
    }

    fn subschema(&self, doc: usize, value: &JsonValue) -> Result<NodeKey, CompileError> {
        let document = &self.documents[doc];
        document
            .by_location
            .get(value.pointer())
            .map(|&index| NodeKey {
                document: document.id,
                index,
            })
            .ok_or_else(|| self.malformed(doc, value.pointer(), "expected a schema"))
    }

    fn schema_array(&self, doc: usize, value: &JsonValue) -> Result<Vec<NodeKey>, CompileError> {
        let items = value
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| {
                self.malformed(doc, value.pointer(), "expected a non-empty array of schemas")
            })?;
        items.iter().map(|item| self.subschema(doc, item)).collect()
    }

    fn schema_map(
        &self,
        doc: usize,
        value: &JsonValue,
    ) -> Result<Vec<(String, NodeKey)>, CompileError> {
        self.object(doc, value)?
            .iter()
            .map(|(name, entry)| Ok((name.clone(), self.subschema(doc, entry)?)))
            .collect()
    }

    fn object<'v>(
        &self,
        doc: usize,
        value: &'v JsonValue,
    ) -> Result<&'v IndexMap<String, JsonValue>, CompileError> {
        value
            .as_object()
            .ok_or_else(|| self.malformed(doc, value.pointer(), "expected an object"))
    }

    fn string<'v>(&self, doc: usize, value: &'v JsonValue) -> Result<&'v str, CompileError> {
        value
            .as_str()
            .ok_or_else(|| self.malformed(doc, value.pointer(), "expected a string"))
    }

    fn number(&self, doc: usize, value: &JsonValue) -> Result<Number, CompileError> {
        value
            .as_number()
            .copied()
            .ok_or_else(|| self.malformed(doc, value.pointer(), "expected a number"))
    }

    fn count(&self, doc: usize, value: &JsonValue) -> Result<u64, CompileError> {
        value.as_number().and_then(Number::as_u64).ok_or_else(|| {
            self.malformed(doc, value.pointer(), "expected a non-negative integer")
        })
    }

    fn string_array(&self, doc: usize, value: &JsonValue) -> Result<Vec<String>, CompileError> {
        let items = value
            .as_array()
            .ok_or_else(|| self.malformed(doc, value.pointer(), "expected an array of strings"))?;
        let mut strings: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let s = self.string(doc, item)?;
            if strings.iter().any(|existing| existing == s) {
                return Err(self.malformed(doc, item.pointer(), format!("duplicate entry '{}'", s)));
            }
            strings.push(s.to_string());
        }
        Ok(strings)
    }

    fn types(&self, doc: usize, value: &JsonValue) -> Result<Vec<JsonType>, CompileError> {
        let names: Vec<&JsonValue> = match value.kind() {
            JsonKind::String(_) => vec![value],
            JsonKind::Array(items) => items.iter().collect(),
            _ => {
                return Err(self.malformed(
                    doc,
                    value.pointer(),
                    "type must be a string or an array of strings",
                ));
            }
        };
        let mut types = Vec::with_capacity(names.len());
        for name in names {
            let ty: JsonType = self
                .string(doc, name)?
                .parse()
                .map_err(|message: String| self.malformed(doc, name.pointer(), message))?;
            if types.contains(&ty) {
                return Err(self.malformed(doc, name.pointer(), format!("duplicate type '{}'", ty)));
            }
            types.push(ty);
        }
        Ok(types)
    }

    fn regex(&self, doc: usize, at: &JsonValue, pattern: &str) -> Result<Regex, CompileError> {
        Regex::new(pattern).map_err(|e| {
            self.malformed(doc, at.pointer(), format!("invalid pattern '{}': {}", pattern, e))
        })
    }
}
