//! The quad store
//!
//! A [`Model`] owns one shared [`World`] reference, a configurable set
//! of redundant orderings over the same quads, and the authoritative
//! quad count. Adding a quad pins its nodes in the world by reference
//! count; removing the last quad that uses a node evicts the node from
//! the interner.
//!
//! ## Coherency
//!
//! Every materialized index holds exactly the same quads; `add` and
//! `remove` touch all of them before returning, so a follow-up `find`
//! on any index sees the change. The model is single-writer: it takes
//! `&mut self` for mutation and hands out borrowing iterators for
//! reads, and the detached-cursor path stamps a mutation version so a
//! cursor that survived a foreign mutation reads as terminal instead of
//! misbehaving.

use crate::error::StoreError;
use crate::index::{QuadArena, SortedIndex};
use crate::iter::{Cursor, Matches};
use crate::node::Node;
use crate::order::{Indexes, StoreOrder, NUM_ORDERS};
use crate::plan::{self, Strategy};
use crate::quad::{Pattern, Quad};
use crate::world::World;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering as Atomic};
use std::sync::Arc;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// An indexed set of quads
pub struct Model {
    world: Arc<World>,
    arena: QuadArena,
    indices: [Option<SortedIndex>; NUM_ORDERS],
    n_quads: usize,
    graphs_tracked: bool,
    id: u64,
    version: u64,
}

impl Model {
    /// Create a model with the selected orderings
    ///
    /// The default ordering (SPO) is always materialized. With `graphs`
    /// on, the graph-prefixed variant of every selected ordering is
    /// materialized too, so GSPO always exists when graphs are tracked.
    pub fn new(world: Arc<World>, indexes: Indexes, graphs: bool) -> Model {
        let mut indices: [Option<SortedIndex>; NUM_ORDERS] = std::array::from_fn(|_| None);
        let selected = indexes | Indexes::SPO;
        for &base in StoreOrder::base_orders() {
            if selected.contains(base) {
                indices[base.index()] = Some(SortedIndex::new(base));
                if graphs {
                    let graph_order = base.to_graph_order();
                    indices[graph_order.index()] = Some(SortedIndex::new(graph_order));
                }
            }
        }
        Model {
            world,
            arena: QuadArena::new(),
            indices,
            n_quads: 0,
            graphs_tracked: graphs,
            id: NEXT_MODEL_ID.fetch_add(1, Atomic::Relaxed),
            version: 0,
        }
    }

    /// The world backing this model
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Number of stored quads
    pub fn num_quads(&self) -> usize {
        self.n_quads
    }

    /// True iff graph contexts are indexed
    pub fn graphs_tracked(&self) -> bool {
        self.graphs_tracked
    }

    /// True iff the ordering is materialized
    pub fn has_index(&self, order: StoreOrder) -> bool {
        self.indices[order.index()].is_some()
    }

    pub(crate) fn index_for(&self, order: StoreOrder) -> &SortedIndex {
        self.indices[order.index()]
            .as_ref()
            .expect("materialized ordering")
    }

    pub(crate) fn arena(&self) -> &QuadArena {
        &self.arena
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    fn default_index(&self) -> &SortedIndex {
        self.index_for(StoreOrder::DEFAULT)
    }

    /// Add a quad; false if it was already present
    ///
    /// Invalidates every detached cursor on this model.
    pub fn add(&mut self, quad: Quad) -> bool {
        if self.default_index().contains(&self.arena, &quad) {
            tracing::trace!(quad = %quad, "add: already present");
            return false;
        }
        tracing::trace!(quad = %quad, "add");

        self.acquire_refs(&quad);
        let id = self.arena.insert(quad);
        let arena = &self.arena;
        for index in self.indices.iter_mut().flatten() {
            index.insert(arena, id);
        }
        self.n_quads += 1;
        self.version += 1;
        debug_assert_eq!(self.n_quads, self.default_index().len());
        true
    }

    /// Remove a quad; false if it was not present
    ///
    /// Invalidates every detached cursor on this model.
    pub fn remove(&mut self, quad: &Quad) -> bool {
        tracing::trace!(quad = %quad, "remove");
        if self.remove_stored(quad) {
            self.version += 1;
            true
        } else {
            false
        }
    }

    /// Remove the cursor's current quad, leaving the cursor on the next
    /// match (or terminal)
    ///
    /// Only the cursor passed in remains valid; any other cursor on
    /// this model is invalidated. Returns false if the cursor is
    /// terminal or does not belong to this model.
    pub fn erase(&mut self, cursor: &mut Cursor) -> bool {
        if !cursor.belongs_to(self) {
            self.world.report(&StoreError::ForeignCursor);
            return false;
        }
        if !cursor.in_sync_with(self) {
            self.world.report(&StoreError::StaleCursor);
            return false;
        }
        let Some(quad) = cursor.get(self) else {
            return false;
        };
        tracing::trace!(quad = %quad, "erase");

        let removed = self.remove_stored(&quad);
        debug_assert!(removed, "cursor pointed at an unstored quad");
        self.version += 1;
        cursor.resync(self.version);
        cursor.revalidate(self);
        true
    }

    /// Remove every quad in the given graph
    pub fn remove_graph(&mut self, graph: &Node) {
        let mut cursor = self.find_cursor(Pattern::graph(graph.clone()));
        while !cursor.is_end() {
            if !self.erase(&mut cursor) {
                break;
            }
        }
    }

    /// Search for statements matching a quad pattern
    pub fn find(&self, pat: Pattern) -> Matches<'_> {
        Matches::new(self, self.find_cursor(pat))
    }

    /// Detached-cursor form of [`find`](Model::find); pair with
    /// [`erase`](Model::erase) to remove while iterating
    pub fn find_cursor(&self, pat: Pattern) -> Cursor {
        let strategy = self.plan_for(&pat);
        Cursor::new(self, strategy, pat, false)
    }

    /// Search for statements by optional slot values
    pub fn search(
        &self,
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
        g: Option<&Node>,
    ) -> Matches<'_> {
        self.find(Pattern::from_slots(s, p, o, g))
    }

    /// Iterate every stored quad in default (SPO) order
    pub fn begin(&self) -> Matches<'_> {
        self.find(Pattern::new())
    }

    /// Detached-cursor form of [`begin`](Model::begin)
    pub fn begin_cursor(&self) -> Cursor {
        self.find_cursor(Pattern::new())
    }

    /// Iterate distinct (S, P, O) statements, ignoring graphs
    ///
    /// A triple present in several graphs is yielded once. With a bound
    /// graph slot in the pattern this is just [`find`](Model::find).
    pub fn find_statements(&self, pat: Pattern) -> Matches<'_> {
        if pat.g.is_some() {
            return self.find(pat);
        }
        let strategy = self.plan_for(&pat);
        let skip_graphs = !strategy.order.is_graph_order();
        Matches::new(self, Cursor::new(self, strategy, pat, skip_graphs))
    }

    /// Iterate every distinct (S, P, O) statement
    pub fn statements(&self) -> Matches<'_> {
        self.find_statements(Pattern::new())
    }

    /// True iff a statement matching the slots exists
    pub fn ask(
        &self,
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
        g: Option<&Node>,
    ) -> bool {
        !self.find_cursor(Pattern::from_slots(s, p, o, g)).is_end()
    }

    /// Number of statements matching the slots
    pub fn count(
        &self,
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
        g: Option<&Node>,
    ) -> u64 {
        self.search(s, p, o, g).count() as u64
    }

    /// True iff a statement matching the pattern exists
    pub fn contains(&self, pat: &Pattern) -> bool {
        !self.find_cursor(pat.clone()).is_end()
    }

    /// The node filling the single unbound S/P/O slot of the first
    /// match
    ///
    /// Exactly one of `s`, `p`, `o` must be unbound; anything else is
    /// reported through the error sink and returns `None`. Mainly
    /// useful for predicates with a single value.
    pub fn get(
        &self,
        s: Option<&Node>,
        p: Option<&Node>,
        o: Option<&Node>,
        g: Option<&Node>,
    ) -> Option<Node> {
        let unbound = usize::from(s.is_none()) + usize::from(p.is_none()) + usize::from(o.is_none());
        if unbound != 1 {
            self.world.report(&StoreError::AmbiguousGet);
            return None;
        }
        let quad = self.find(Pattern::from_slots(s, p, o, g)).get()?;
        if s.is_none() {
            Some(quad.s)
        } else if p.is_none() {
            Some(quad.p)
        } else {
            Some(quad.o)
        }
    }

    /// True iff the node can be serialised as an inline object: it is
    /// the object of exactly one statement and the subject of none
    pub fn is_inline_object(&self, node: &Node) -> bool {
        self.count(None, None, Some(node), None) == 1 && !self.ask(Some(node), None, None, None)
    }

    /// The distinct named-graph nodes, each once
    pub fn graphs(&self) -> Vec<Node> {
        if self.has_index(StoreOrder::DEFAULT_GRAPH) {
            // Graph-first ordering: each graph is one adjacent run
            let index = self.index_for(StoreOrder::DEFAULT_GRAPH);
            let mut out: Vec<Node> = Vec::new();
            for pos in 0..index.len() {
                let quad = self.arena.get(index.get(pos).expect("in bounds"));
                if let Some(g) = &quad.g {
                    if out.last().map_or(true, |prev| !Node::ptr_eq(prev, g)) {
                        out.push(g.clone());
                    }
                }
            }
            out
        } else {
            let mut seen = FxHashSet::default();
            let mut out = Vec::new();
            for quad in self.arena.live_quads() {
                if let Some(g) = &quad.g {
                    if seen.insert(g.clone()) {
                        out.push(g.clone());
                    }
                }
            }
            out
        }
    }

    fn plan_for(&self, pat: &Pattern) -> Strategy {
        let strategy = plan::best_index(pat, self.graphs_tracked, |order| {
            self.indices[order.index()].is_some()
        });
        tracing::debug!(
            pattern = %pat,
            order = strategy.order.name(),
            mode = ?strategy.mode,
            prefix = strategy.prefix,
            "find"
        );
        strategy
    }

    fn acquire_refs(&self, quad: &Quad) {
        for node in [Some(&quad.s), Some(&quad.p), Some(&quad.o), quad.g.as_ref()]
            .into_iter()
            .flatten()
        {
            node.acquire_quad_ref();
        }
    }

    fn release_refs(&self, quad: &Quad) {
        for node in [Some(&quad.s), Some(&quad.p), Some(&quad.o), quad.g.as_ref()]
            .into_iter()
            .flatten()
        {
            if node.release_quad_ref() {
                self.world.evict(node);
            }
        }
    }

    /// Erase from every index and the arena; false if absent
    fn remove_stored(&mut self, quad: &Quad) -> bool {
        let arena = &self.arena;
        let mut removed_id = None;
        for index in self.indices.iter_mut().flatten() {
            match index.remove_quad(arena, quad) {
                Some(id) => removed_id = Some(id),
                None => {
                    // Only the first index may miss: the quad is absent
                    debug_assert!(removed_id.is_none(), "indices out of step");
                    return false;
                }
            }
        }
        let id = removed_id.expect("default index always materialized");
        let stored = self.arena.remove(id);
        self.release_refs(&stored);
        self.n_quads -= 1;
        true
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        // Dropping the model drops every quad's node references
        for quad in self.arena.live_quads() {
            self.release_refs(quad);
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let orders: Vec<&str> = StoreOrder::all()
            .iter()
            .filter(|o| self.has_index(**o))
            .map(|o| o.name())
            .collect();
        f.debug_struct("Model")
            .field("quads", &self.n_quads)
            .field("indices", &orders)
            .field("graphs", &self.graphs_tracked)
            .finish()
    }
}
