//! Compiled schema graph.
//!
//! Every compiled document owns an arena of [`SchemaNode`]s. Edges between
//! nodes (subschemas and references, possibly into other documents) are
//! [`NodeKey`]s, so cyclic schemas need no special handling.

pub(crate) mod compiler;
mod keyword;

pub(crate) use keyword::{CompiledKeyword, Keyword};

use crate::vocabulary::Dialect;
use jschema_json::{JsonPointer, JsonValue};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Identifies one compiled document within a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub(crate) u64);

/// Address of a schema node: document plus arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub(crate) document: DocumentId,
    pub(crate) index: usize,
}

/// Identifier state of a schema resource (a document root or a subschema
/// with `$id`).
#[derive(Debug, Clone)]
pub(crate) struct ResourceInfo {
    pub(crate) uri: Url,
    /// `$anchor` and `$dynamicAnchor` names, to arena indices.
    pub(crate) anchors: HashMap<String, usize>,
    pub(crate) dynamic_anchors: HashMap<String, usize>,
    pub(crate) recursive_anchor: bool,
}

impl ResourceInfo {
    pub(crate) fn new(uri: Url) -> Self {
        Self {
            uri,
            anchors: HashMap::new(),
            dynamic_anchors: HashMap::new(),
            recursive_anchor: false,
        }
    }
}

pub(crate) enum SchemaBody {
    Boolean(bool),
    Keywords(Vec<CompiledKeyword>),
}

/// One compiled schema location.
pub(crate) struct SchemaNode {
    /// Location in the document.
    pub(crate) location: JsonPointer,
    /// Canonical URI: resource URI plus pointer fragment.
    pub(crate) canonical: String,
    pub(crate) base_uri: Url,
    /// Arena index of the enclosing resource root (itself for a root).
    pub(crate) resource: usize,
    pub(crate) dialect: Arc<Dialect>,
    pub(crate) body: SchemaBody,
    pub(crate) dynamic_anchor: Option<String>,
    pub(crate) resource_info: Option<ResourceInfo>,
}

/// The compiled form of one registered document.
pub(crate) struct CompiledDocument {
    pub(crate) id: DocumentId,
    pub(crate) uri: Url,
    pub(crate) raw: Arc<JsonValue>,
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) by_location: HashMap<JsonPointer, usize>,
    /// Documents targeted by references from this one.
    pub(crate) dependencies: BTreeSet<DocumentId>,
    pub(crate) uses_unevaluated: bool,
}

/// Read access shared by documents under compilation and registered ones.
pub(crate) trait NodeLookup {
    fn document_id(&self) -> DocumentId;
    fn node_location(&self, index: usize) -> Option<&JsonPointer>;
    fn node_at(&self, location: &JsonPointer) -> Option<usize>;
    fn resource_info(&self, index: usize) -> Option<&ResourceInfo>;
    fn dynamic_anchor(&self, index: usize) -> Option<&str>;

    /// Resolve a URI fragment relative to the resource rooted at `resource`:
    /// empty, a JSON Pointer, or a plain-name anchor.
    fn resolve_fragment(&self, resource: usize, fragment: &str) -> Option<NodeKey> {
        let index = if fragment.is_empty() {
            Some(resource)
        } else if fragment.starts_with('/') {
            let pointer = JsonPointer::from_uri_fragment(fragment).ok()?;
            let root = self.node_location(resource)?;
            self.node_at(&root.join(&pointer))
        } else {
            self.resource_info(resource)?.anchors.get(fragment).copied()
        }?;
        Some(NodeKey {
            document: self.document_id(),
            index,
        })
    }
}

impl NodeLookup for CompiledDocument {
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

/// A compiled (sub)schema ready for evaluation.
///
/// Holds the transitive closure of documents reachable from its root, so it
/// stays usable (and unchanged) if the catalog later replaces a document.
/// Cheap to clone.
#[derive(Clone)]
pub struct CompiledSchema {
    pub(crate) root: NodeKey,
    pub(crate) documents: Arc<HashMap<DocumentId, Arc<CompiledDocument>>>,
    pub(crate) uses_unevaluated: bool,
}

impl CompiledSchema {
    /// Canonical URI of the root node.
    pub fn uri(&self) -> &str {
        &self.node(self.root).canonical
    }

    /// The raw JSON of the root node.
    pub fn schema_json(&self) -> Option<&JsonValue> {
        let document = self.documents.get(&self.root.document)?;
        let node = document.nodes.get(self.root.index)?;
        node.location.evaluate(&document.raw).ok()
    }

    /// The dialect the root node was compiled with.
    pub fn dialect(&self) -> &Dialect {
        &self.node(self.root).dialect
    }

    pub(crate) fn node(&self, key: NodeKey) -> &SchemaNode {
        &self.documents[&key.document].nodes[key.index]
    }

    /// Key of the resource root enclosing `key`.
    pub(crate) fn resource_of(&self, key: NodeKey) -> NodeKey {
        NodeKey {
            document: key.document,
            index: self.node(key).resource,
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("uri", &self.uri())
            .field("documents", &self.documents.len())
            .finish()
    }
}
