//! # Tetrad
//!
//! In-memory RDF quad store: interned nodes, a multi-index sorted quad
//! set, and pattern search with automatic index selection.
//!
//! This crate provides:
//! - A [`World`] that interns URIs, blank nodes, literals and language
//!   tags, so node equality is reference identity
//! - A [`Model`] holding one set of quads under up to twelve redundant
//!   orderings (the six permutations of subject/predicate/object and
//!   their graph-prefixed variants), kept coherent on every mutation
//! - Pattern search ([`Model::find`]) that picks the best materialized
//!   ordering for a pattern and walks it as a scan, point probe, prefix
//!   range or filtered range
//! - A detached [`Cursor`] that supports removal while iterating
//!   ([`Model::erase`])
//! - Reader/writer seams ([`Inserter`], [`StatementSink`]) for wiring
//!   external parsers and serializers to the store
//!
//! ## Design principles
//!
//! 1. **Interned identity**: every comparison downstream of the world
//!    is a pointer comparison
//! 2. **Store once, index many**: quads live in one arena; each
//!    ordering sorts ids, not copies
//! 3. **Single writer**: mutation takes `&mut Model`; reads borrow; no
//!    internal threads, no suspension points
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tetrad::{Indexes, Model, Pattern, Quad, World};
//!
//! let world = Arc::new(World::new());
//! let mut model = Model::new(world.clone(), Indexes::SPO | Indexes::OPS, false);
//!
//! let alice = world.new_uri("http://example.org/alice");
//! let knows = world.new_uri("http://example.org/knows");
//! let bob = world.new_uri("http://example.org/bob");
//! model.add(Quad::new(alice.clone(), knows.clone(), bob.clone()));
//!
//! let found: Vec<Quad> = model.find(Pattern::subject(alice)).collect();
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].o, bob);
//! ```

pub mod error;
mod index;
pub mod iter;
pub mod model;
pub mod node;
pub mod order;
pub mod plan;
pub mod quad;
pub mod sink;
pub mod world;

pub use error::{Result, StoreError};
pub use iter::{Cursor, Matches};
pub use model::Model;
pub use node::{Lang, LiteralTag, Node, NodeKind};
pub use order::{Indexes, StoreOrder, NUM_ORDERS};
pub use plan::{SearchMode, Strategy};
pub use quad::{Pattern, Quad, QuadPos};
pub use sink::{Inserter, ParsedTerm, PrefixResolver, StatementSink};
pub use world::{ErrorSink, World};
