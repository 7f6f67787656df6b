//! Reader and writer seams
//!
//! The store does not parse or serialize any syntax itself. A reader
//! drives an [`Inserter`] with parser-level terms and prefix/base
//! events; the inserter expands them to interned nodes through the
//! world and adds the resulting quads. A writer consumes the model
//! through [`StatementSink`], re-grouping and abbreviating as it sees
//! fit (supported by
//! [`Model::is_inline_object`](crate::Model::is_inline_object)).
//!
//! Prefix and base bookkeeping belongs to the external environment
//! behind [`PrefixResolver`]; the world only owns the policy of turning
//! a parsed term plus resolver into a canonical node.

use crate::error::{Result, StoreError};
use crate::model::Model;
use crate::node::Node;
use crate::quad::Quad;
use crate::world::World;

/// A term as a parser hands it over, before interning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParsedTerm<'a> {
    /// A URI reference, possibly relative to the base
    Uri(&'a str),
    /// A prefixed name such as `eg:thing`
    Curie(&'a str),
    /// A blank node identifier
    Blank(&'a str),
    /// A literal's lexical form
    Literal(&'a str),
}

/// The contract of the external prefix environment
pub trait PrefixResolver {
    /// Record the base URI for resolving relative references
    fn set_base_uri(&mut self, uri: &str) -> Result<()>;

    /// Record a namespace binding
    fn set_prefix(&mut self, name: &str, uri: &str) -> Result<()>;

    /// Expand a prefixed name to a full URI, if the prefix is known
    fn expand_curie(&self, curie: &str) -> Option<String>;

    /// Resolve a URI reference against the base
    fn resolve_uri(&self, reference: &str) -> String;
}

impl World {
    /// Intern a parsed term, expanding prefixed names and resolving
    /// relative URIs through `env`
    ///
    /// `datatype` and `language` apply only when `term` is a literal.
    pub fn node_from_parsed<R: PrefixResolver + ?Sized>(
        &self,
        env: &R,
        term: ParsedTerm<'_>,
        datatype: Option<ParsedTerm<'_>>,
        language: Option<&str>,
    ) -> Result<Node> {
        match term {
            ParsedTerm::Uri(reference) => Ok(self.new_uri(&env.resolve_uri(reference))),
            ParsedTerm::Curie(curie) => {
                let expanded = env
                    .expand_curie(curie)
                    .ok_or_else(|| StoreError::curie_expansion(curie))?;
                Ok(self.new_uri(&expanded))
            }
            ParsedTerm::Blank(id) => Ok(self.new_blank(id)),
            ParsedTerm::Literal(text) => {
                let dt = match datatype {
                    Some(term) => Some(self.node_from_parsed(env, term, None, None)?),
                    None => None,
                };
                Ok(self.new_literal(dt.as_ref(), text, language))
            }
        }
    }
}

/// Statement sink for writing into a model from a reader
///
/// Constructed with a fixed target graph, every statement lands in that
/// graph regardless of what the reader reports.
pub struct Inserter<'m, R: PrefixResolver> {
    model: &'m mut Model,
    env: R,
    graph: Option<Node>,
}

impl<'m, R: PrefixResolver> Inserter<'m, R> {
    /// Create an inserter writing to the statements' own graphs
    pub fn new(model: &'m mut Model, env: R) -> Self {
        Inserter { model, env, graph: None }
    }

    /// Create an inserter routing every statement into `graph`
    pub fn with_graph(model: &'m mut Model, env: R, graph: Node) -> Self {
        Inserter { model, env, graph: Some(graph) }
    }

    /// The prefix environment
    pub fn env(&self) -> &R {
        &self.env
    }

    /// Record the base URI on the environment; never stored
    pub fn set_base_uri(&mut self, uri: &str) -> Result<()> {
        self.env.set_base_uri(uri)
    }

    /// Record a namespace binding on the environment
    pub fn set_prefix(&mut self, name: &str, uri: &str) -> Result<()> {
        self.env.set_prefix(name, uri)
    }

    /// Intern a statement's terms and add the quad
    ///
    /// Returns `Ok(false)` when the quad was already present.
    pub fn statement(
        &mut self,
        graph: Option<ParsedTerm<'_>>,
        subject: ParsedTerm<'_>,
        predicate: ParsedTerm<'_>,
        object: ParsedTerm<'_>,
        object_datatype: Option<ParsedTerm<'_>>,
        object_language: Option<&str>,
    ) -> Result<bool> {
        if matches!(subject, ParsedTerm::Literal(_)) {
            return Err(StoreError::invalid_statement("literal subject"));
        }
        if !matches!(predicate, ParsedTerm::Uri(_) | ParsedTerm::Curie(_)) {
            return Err(StoreError::invalid_statement("predicate must be a URI"));
        }

        let world = self.model.world().clone();
        let s = world.node_from_parsed(&self.env, subject, None, None)?;
        let p = world.node_from_parsed(&self.env, predicate, None, None)?;
        let o = world.node_from_parsed(&self.env, object, object_datatype, object_language)?;
        let g = match &self.graph {
            Some(fixed) => Some(fixed.clone()),
            None => match graph {
                Some(term) => Some(world.node_from_parsed(&self.env, term, None, None)?),
                None => None,
            },
        };

        Ok(self.model.add(Quad { s, p, o, g }))
    }
}

/// A consumer of statements streamed out of a model
pub trait StatementSink {
    /// Receive one statement
    fn statement(&mut self, quad: &Quad) -> Result<()>;
}

impl Model {
    /// Stream every stored quad to `sink` in default (SPO) order
    pub fn write_to<S: StatementSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        for quad in self.begin() {
            sink.statement(&quad)?;
        }
        Ok(())
    }

    /// Stream one graph's quads to `sink`
    pub fn write_graph_to<S: StatementSink + ?Sized>(
        &self,
        graph: &Node,
        sink: &mut S,
    ) -> Result<()> {
        for quad in self.find(crate::Pattern::graph(graph.clone())) {
            sink.statement(&quad)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Indexes;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Minimal in-test environment: base concatenation + prefix table
    #[derive(Default)]
    struct TestEnv {
        base: Option<String>,
        prefixes: HashMap<String, String>,
    }

    impl PrefixResolver for TestEnv {
        fn set_base_uri(&mut self, uri: &str) -> Result<()> {
            self.base = Some(uri.to_string());
            Ok(())
        }

        fn set_prefix(&mut self, name: &str, uri: &str) -> Result<()> {
            self.prefixes.insert(name.to_string(), uri.to_string());
            Ok(())
        }

        fn expand_curie(&self, curie: &str) -> Option<String> {
            let (prefix, local) = curie.split_once(':')?;
            let namespace = self.prefixes.get(prefix)?;
            Some(format!("{}{}", namespace, local))
        }

        fn resolve_uri(&self, reference: &str) -> String {
            match (&self.base, reference.contains("://")) {
                (Some(base), false) => format!("{}{}", base, reference),
                _ => reference.to_string(),
            }
        }
    }

    fn model() -> Model {
        Model::new(Arc::new(World::new()), Indexes::SPO, true)
    }

    #[test]
    fn test_inserter_builds_interned_quads() {
        let mut m = model();
        let mut inserter = Inserter::new(&mut m, TestEnv::default());
        inserter.set_prefix("eg", "http://example.org/").unwrap();

        let added = inserter
            .statement(
                None,
                ParsedTerm::Curie("eg:alice"),
                ParsedTerm::Curie("eg:name"),
                ParsedTerm::Literal("Alice"),
                None,
                Some("en"),
            )
            .unwrap();
        assert!(added);

        let world = m.world().clone();
        let alice = world.new_uri("http://example.org/alice");
        let name = world.new_uri("http://example.org/name");
        let lit = world.new_literal(None, "Alice", Some("en"));
        assert!(m.ask(Some(&alice), Some(&name), Some(&lit), None));
    }

    #[test]
    fn test_inserter_resolves_against_base() {
        let mut m = model();
        let mut inserter = Inserter::new(&mut m, TestEnv::default());
        inserter.set_base_uri("http://example.org/").unwrap();

        inserter
            .statement(
                None,
                ParsedTerm::Uri("doc"),
                ParsedTerm::Uri("http://example.org/p"),
                ParsedTerm::Blank("b0"),
                None,
                None,
            )
            .unwrap();

        let world = m.world().clone();
        let doc = world.new_uri("http://example.org/doc");
        assert!(m.ask(Some(&doc), None, None, None));
    }

    #[test]
    fn test_inserter_with_fixed_graph() {
        let mut m = model();
        let g = m.world().new_uri("http://example.org/g");
        let mut inserter = Inserter::with_graph(&mut m, TestEnv::default(), g.clone());

        inserter
            .statement(
                None,
                ParsedTerm::Uri("http://example.org/s"),
                ParsedTerm::Uri("http://example.org/p"),
                ParsedTerm::Uri("http://example.org/o"),
                None,
                None,
            )
            .unwrap();

        assert_eq!(m.count(None, None, None, Some(&g)), 1);
    }

    #[test]
    fn test_inserter_rejects_malformed_statements() {
        let mut m = model();
        let mut inserter = Inserter::new(&mut m, TestEnv::default());

        let err = inserter
            .statement(
                None,
                ParsedTerm::Literal("nope"),
                ParsedTerm::Uri("http://example.org/p"),
                ParsedTerm::Uri("http://example.org/o"),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatement(_)));

        let err = inserter
            .statement(
                None,
                ParsedTerm::Uri("http://example.org/s"),
                ParsedTerm::Blank("b"),
                ParsedTerm::Uri("http://example.org/o"),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatement(_)));

        let err = inserter
            .statement(
                None,
                ParsedTerm::Curie("unknown:thing"),
                ParsedTerm::Uri("http://example.org/p"),
                ParsedTerm::Uri("http://example.org/o"),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::CurieExpansion(_)));
    }

    #[test]
    fn test_write_to_streams_all_quads() {
        struct Collect(Vec<String>);
        impl StatementSink for Collect {
            fn statement(&mut self, quad: &Quad) -> Result<()> {
                self.0.push(quad.to_string());
                Ok(())
            }
        }

        let mut m = model();
        let world = m.world().clone();
        let g = world.new_uri("http://example.org/g");
        m.add(Quad::new(
            world.new_uri("http://example.org/a"),
            world.new_uri("http://example.org/p"),
            world.new_uri("http://example.org/x"),
        ));
        m.add(Quad::in_graph(
            world.new_uri("http://example.org/b"),
            world.new_uri("http://example.org/p"),
            world.new_uri("http://example.org/y"),
            g.clone(),
        ));

        let mut all = Collect(Vec::new());
        m.write_to(&mut all).unwrap();
        assert_eq!(all.0.len(), 2);

        let mut one = Collect(Vec::new());
        m.write_graph_to(&g, &mut one).unwrap();
        assert_eq!(one.0.len(), 1);
        assert!(one.0[0].contains("/b>"));
    }
}
