//! Interned RDF terms
//!
//! A [`Node`] is a canonical, immutable term handed out by a
//! [`World`](crate::World): a URI, a blank node identifier, or a literal.
//! Within one world two nodes are equal as values iff they are the same
//! allocation, so equality and hashing here are **pointer** operations.
//!
//! ## Ordering
//!
//! Indices need a total order that is deterministic across runs, so
//! `Ord` compares content: kind, then lexical form, then the literal
//! tag. A final pointer tie-break keeps the order total even for the
//! degenerate case of equal-content nodes that survived an interner
//! eviction; nodes pinned by stored quads never move, so the tie-break
//! is stable for anything an index holds.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering as Atomic};
use std::sync::Arc;

/// Type of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// URI
    Uri = 1,
    /// Blank node identifier
    Blank = 2,
    /// Literal (string with optional language or datatype)
    Literal = 3,
}

/// An interned language tag
///
/// Language tags are interned by the world, so comparing two tags is a
/// pointer comparison.
#[derive(Clone, Debug)]
pub struct Lang(Arc<str>);

impl Lang {
    pub(crate) fn from_arc(tag: Arc<str>) -> Self {
        Lang(tag)
    }

    /// The tag text, e.g. `"fr"`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const u8 as usize
    }
}

impl PartialEq for Lang {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Lang {}

impl Hash for Lang {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The optional qualifier of a literal
///
/// A literal carries at most one of a datatype or a language tag; the
/// exclusion lives in the type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralTag {
    /// Plain literal
    Plain,
    /// Typed literal; the node is a URI node from the same world
    Datatype(Node),
    /// Language-tagged literal
    Language(Lang),
}

impl LiteralTag {
    fn rank(&self) -> u8 {
        match self {
            LiteralTag::Plain => 0,
            LiteralTag::Datatype(_) => 1,
            LiteralTag::Language(_) => 2,
        }
    }

    fn text(&self) -> &str {
        match self {
            LiteralTag::Plain => "",
            LiteralTag::Datatype(dt) => dt.as_str(),
            LiteralTag::Language(lang) => lang.as_str(),
        }
    }
}

enum Repr {
    Uri,
    Blank,
    Literal(LiteralTag),
}

struct NodeData {
    text: Box<str>,
    repr: Repr,
    /// Number of stored quads this node participates in
    quad_refs: AtomicUsize,
}

/// An interned RDF term
///
/// Cheap to clone; equality is reference identity. Obtain nodes through
/// [`World`](crate::World) constructors only.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    pub(crate) fn uri(text: &str) -> Self {
        Node::with_repr(text, Repr::Uri)
    }

    pub(crate) fn blank(text: &str) -> Self {
        Node::with_repr(text, Repr::Blank)
    }

    pub(crate) fn literal(text: &str, tag: LiteralTag) -> Self {
        Node::with_repr(text, Repr::Literal(tag))
    }

    fn with_repr(text: &str, repr: Repr) -> Self {
        Node(Arc::new(NodeData {
            text: Box::from(text),
            repr,
            quad_refs: AtomicUsize::new(0),
        }))
    }

    /// The kind of this node
    pub fn kind(&self) -> NodeKind {
        match self.0.repr {
            Repr::Uri => NodeKind::Uri,
            Repr::Blank => NodeKind::Blank,
            Repr::Literal(_) => NodeKind::Literal,
        }
    }

    /// The lexical form
    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// Length of the lexical form in bytes
    pub fn len_bytes(&self) -> usize {
        self.0.text.len()
    }

    /// Length of the lexical form in characters
    pub fn len_chars(&self) -> usize {
        self.0.text.chars().count()
    }

    /// The language tag of a language-tagged literal
    pub fn language(&self) -> Option<&str> {
        match &self.0.repr {
            Repr::Literal(LiteralTag::Language(lang)) => Some(lang.as_str()),
            _ => None,
        }
    }

    /// The datatype node of a typed literal
    pub fn datatype(&self) -> Option<&Node> {
        match &self.0.repr {
            Repr::Literal(LiteralTag::Datatype(dt)) => Some(dt),
            _ => None,
        }
    }

    /// The qualifier of a literal node, `None` for URIs and blanks
    pub fn literal_tag(&self) -> Option<&LiteralTag> {
        match &self.0.repr {
            Repr::Literal(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_uri(&self) -> bool {
        matches!(self.0.repr, Repr::Uri)
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.0.repr, Repr::Blank)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.0.repr, Repr::Literal(_))
    }

    /// Reference identity; the meaning of `==` for nodes
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub(crate) fn acquire_quad_ref(&self) {
        self.0.quad_refs.fetch_add(1, Atomic::Relaxed);
    }

    /// Drop one quad reference; true when the count reached zero
    pub(crate) fn release_quad_ref(&self) -> bool {
        self.0.quad_refs.fetch_sub(1, Atomic::Relaxed) == 1
    }

    #[cfg(test)]
    pub(crate) fn quad_refs(&self) -> usize {
        self.0.quad_refs.load(Atomic::Relaxed)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Node::ptr_eq(self, other)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        if Node::ptr_eq(self, other) {
            return Ordering::Equal;
        }
        (self.kind() as u8)
            .cmp(&(other.kind() as u8))
            .then_with(|| self.as_str().cmp(other.as_str()))
            .then_with(|| {
                let a = self.literal_tag().map_or(0, LiteralTag::rank);
                let b = other.literal_tag().map_or(0, LiteralTag::rank);
                a.cmp(&b)
            })
            .then_with(|| {
                let a = self.literal_tag().map_or("", LiteralTag::text);
                let b = other.literal_tag().map_or("", LiteralTag::text);
                a.cmp(b)
            })
            .then_with(|| self.addr().cmp(&other.addr()))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.repr {
            Repr::Uri => write!(f, "<{}>", self.0.text),
            Repr::Blank => write!(f, "_:{}", self.0.text),
            Repr::Literal(LiteralTag::Plain) => write!(f, "\"{}\"", self.0.text),
            Repr::Literal(LiteralTag::Language(lang)) => {
                write!(f, "\"{}\"@{}", self.0.text, lang)
            }
            Repr::Literal(LiteralTag::Datatype(dt)) => {
                write!(f, "\"{}\"^^{}", self.0.text, dt)
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self)
    }
}
