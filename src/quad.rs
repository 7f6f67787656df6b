//! Quads and quad patterns
//!
//! A [`Quad`] is a stored statement: subject, predicate and object are
//! always present, the graph slot is optional (`None` is the default
//! graph). A [`Pattern`] is the search form: any slot may be `None`,
//! meaning "match anything here". Patterns are matched, never stored.

use crate::node::Node;
use std::fmt;

/// Index into a quad
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuadPos {
    /// Subject
    Subject,
    /// Predicate ("key")
    Predicate,
    /// Object ("value")
    Object,
    /// Graph ("context")
    Graph,
}

/// A statement: four node slots in (S, P, O, G) order
///
/// The graph slot is `None` for statements in the default graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quad {
    pub s: Node,
    pub p: Node,
    pub o: Node,
    pub g: Option<Node>,
}

impl Quad {
    /// Create a triple in the default graph
    pub fn new(s: Node, p: Node, o: Node) -> Self {
        Quad { s, p, o, g: None }
    }

    /// Create a quad in a named graph
    pub fn in_graph(s: Node, p: Node, o: Node, g: Node) -> Self {
        Quad { s, p, o, g: Some(g) }
    }

    /// The node at `pos`; `None` only for the graph slot
    pub fn slot(&self, pos: QuadPos) -> Option<&Node> {
        match pos {
            QuadPos::Subject => Some(&self.s),
            QuadPos::Predicate => Some(&self.p),
            QuadPos::Object => Some(&self.o),
            QuadPos::Graph => self.g.as_ref(),
        }
    }

    /// True iff this quad is admitted by `pat`
    ///
    /// Unbound pattern slots match anything; bound slots require
    /// reference equality. A default-graph quad is not admitted by a
    /// pattern bound to a named graph.
    pub fn matches(&self, pat: &Pattern) -> bool {
        slot_admits(Some(&self.s), pat.s.as_ref())
            && slot_admits(Some(&self.p), pat.p.as_ref())
            && slot_admits(Some(&self.o), pat.o.as_ref())
            && slot_admits(self.g.as_ref(), pat.g.as_ref())
    }
}

/// True iff a stored slot is admitted by a pattern slot
pub(crate) fn slot_admits(slot: Option<&Node>, pat: Option<&Node>) -> bool {
    match pat {
        None => true,
        Some(want) => slot.is_some_and(|n| Node::ptr_eq(n, want)),
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {}", self.s, self.p, self.o)?;
        match &self.g {
            Some(g) => write!(f, " {})", g),
            None => write!(f, ")"),
        }
    }
}

/// A quad pattern: any slot may be unbound
///
/// Unset components are wildcards. Use the builder constructors for the
/// common shapes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    /// Subject to match
    pub s: Option<Node>,
    /// Predicate to match
    pub p: Option<Node>,
    /// Object to match
    pub o: Option<Node>,
    /// Graph to match
    pub g: Option<Node>,
}

impl Pattern {
    /// Create an empty pattern (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a specific subject
    pub fn subject(s: Node) -> Self {
        Pattern {
            s: Some(s),
            ..Default::default()
        }
    }

    /// Match a specific predicate
    pub fn predicate(p: Node) -> Self {
        Pattern {
            p: Some(p),
            ..Default::default()
        }
    }

    /// Match a specific object
    pub fn object(o: Node) -> Self {
        Pattern {
            o: Some(o),
            ..Default::default()
        }
    }

    /// Match a specific graph
    pub fn graph(g: Node) -> Self {
        Pattern {
            g: Some(g),
            ..Default::default()
        }
    }

    /// Match a specific subject and predicate
    pub fn subject_predicate(s: Node, p: Node) -> Self {
        Pattern {
            s: Some(s),
            p: Some(p),
            ..Default::default()
        }
    }

    /// Build a pattern from optional slot references
    pub fn from_slots(
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
        g: Option<&Node>,
    ) -> Self {
        Pattern {
            s: s.cloned(),
            p: p.cloned(),
            o: o.cloned(),
            g: g.cloned(),
        }
    }

    /// The exact-match pattern for a stored quad
    pub fn from_quad(quad: &Quad) -> Self {
        Pattern {
            s: Some(quad.s.clone()),
            p: Some(quad.p.clone()),
            o: Some(quad.o.clone()),
            g: quad.g.clone(),
        }
    }

    /// The node at `pos`, if bound
    pub fn slot(&self, pos: QuadPos) -> Option<&Node> {
        match pos {
            QuadPos::Subject => self.s.as_ref(),
            QuadPos::Predicate => self.p.as_ref(),
            QuadPos::Object => self.o.as_ref(),
            QuadPos::Graph => self.g.as_ref(),
        }
    }

    /// True iff every slot is unbound
    pub fn is_wildcard(&self) -> bool {
        self.s.is_none() && self.p.is_none() && self.o.is_none() && self.g.is_none()
    }

    /// Symmetric wildcard match between two patterns
    ///
    /// Either side's unbound slots act as wildcards, so this tells
    /// whether the two patterns could describe the same statement.
    pub fn overlaps(&self, other: &Pattern) -> bool {
        overlap(self.s.as_ref(), other.s.as_ref())
            && overlap(self.p.as_ref(), other.p.as_ref())
            && overlap(self.o.as_ref(), other.o.as_ref())
            && overlap(self.g.as_ref(), other.g.as_ref())
    }
}

fn overlap(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => Node::ptr_eq(x, y),
        _ => true,
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn elem(f: &mut fmt::Formatter<'_>, slot: &Option<Node>) -> fmt::Result {
            match slot {
                Some(n) => write!(f, "{}", n),
                None => write!(f, "*"),
            }
        }
        write!(f, "(")?;
        elem(f, &self.s)?;
        write!(f, " ")?;
        elem(f, &self.p)?;
        write!(f, " ")?;
        elem(f, &self.o)?;
        write!(f, " ")?;
        elem(f, &self.g)?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Node {
        Node::uri(s)
    }

    #[test]
    fn test_quad_slots() {
        let q = Quad::new(uri("s"), uri("p"), uri("o"));
        assert!(q.slot(QuadPos::Subject).is_some());
        assert!(q.slot(QuadPos::Graph).is_none());

        let g = Quad::in_graph(uri("s"), uri("p"), uri("o"), uri("g"));
        assert!(g.slot(QuadPos::Graph).is_some());
    }

    #[test]
    fn test_wildcard_admits_everything() {
        let q = Quad::new(uri("s"), uri("p"), uri("o"));
        assert!(q.matches(&Pattern::new()));
    }

    #[test]
    fn test_bound_slot_requires_identity() {
        let s = uri("s");
        let q = Quad::new(s.clone(), uri("p"), uri("o"));
        assert!(q.matches(&Pattern::subject(s)));
        // Equal text, different allocation: no match
        assert!(!q.matches(&Pattern::subject(uri("s"))));
    }

    #[test]
    fn test_graph_bound_pattern_rejects_default_graph() {
        let g = uri("g");
        let triple = Quad::new(uri("s"), uri("p"), uri("o"));
        let quad = Quad::in_graph(uri("s"), uri("p"), uri("o"), g.clone());

        let pat = Pattern::graph(g);
        assert!(!triple.matches(&pat));
        assert!(quad.matches(&pat));
        // And the unbound graph pattern admits both
        assert!(triple.matches(&Pattern::new()));
        assert!(quad.matches(&Pattern::new()));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let s = uri("s");
        let a = Pattern::subject(s.clone());
        let b = Pattern::predicate(uri("p"));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = Pattern::subject(uri("s"));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_display_uses_stars_for_wildcards() {
        let pat = Pattern::subject(uri("s"));
        assert_eq!(format!("{}", pat), "(<s> * * *)");
    }
}
