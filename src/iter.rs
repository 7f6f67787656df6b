//! The cursor engine
//!
//! A [`Cursor`] walks one materialized index under the search mode the
//! planner chose. It holds positions, not borrows, so the model can
//! mutate *through* it ([`Model::erase`](crate::Model::erase)) while it
//! stays usable; every other mutation invalidates it, which the cursor
//! detects through the model's mutation version and reports through the
//! world's error sink instead of misbehaving.
//!
//! [`Matches`] is the borrowing face over the same engine: an
//! `Iterator<Item = Quad>` whose shared borrow of the model makes
//! invalidation impossible while it is alive.
//!
//! ## Modes
//!
//! - full scan: every entry to the end of the index
//! - single point: one exact match, then terminal
//! - prefix range: until the leading key slots stop matching
//! - filter range: prefix range that re-checks the whole pattern
//! - filter all: full scan that re-checks the whole pattern
//!
//! Terminal is absorbing: advancing a terminal cursor stays terminal.

use crate::error::StoreError;
use crate::model::Model;
use crate::node::Node;
use crate::plan::{SearchMode, Strategy};
use crate::quad::{slot_admits, Pattern, Quad, QuadPos};

/// A detached cursor over one index of a model
///
/// All operations take the model it was created from; using it with any
/// other model, or after a mutation that did not go through this
/// cursor, is reported through the error sink and reads as terminal.
#[derive(Clone, Debug)]
pub struct Cursor {
    order: crate::order::StoreOrder,
    perm: &'static [QuadPos; 4],
    pat: Pattern,
    mode: SearchMode,
    prefix: usize,
    pos: usize,
    end: bool,
    /// Skip entries whose (S, P, O) equals the previous entry's
    skip_graphs: bool,
    model_id: u64,
    version: u64,
}

impl Cursor {
    pub(crate) fn new(model: &Model, strategy: Strategy, pat: Pattern, skip_graphs: bool) -> Self {
        let mut cursor = Cursor {
            order: strategy.order,
            perm: strategy.order.permutation(),
            pat,
            mode: strategy.mode,
            prefix: strategy.prefix,
            pos: 0,
            end: false,
            skip_graphs,
            model_id: model.id(),
            version: model.version(),
        };

        let index = model.index_for(cursor.order);
        if index.len() == 0 {
            cursor.end = true;
            return cursor;
        }

        match cursor.mode {
            SearchMode::FullScan => {}
            SearchMode::SinglePoint | SearchMode::PrefixRange => {
                cursor.pos = index.lower_bound(model.arena(), &cursor.pat);
                if !cursor.current_matches(model) {
                    cursor.end = true;
                }
            }
            SearchMode::FilterRange => {
                cursor.pos = index.lower_bound(model.arena(), &cursor.pat);
                cursor.seek_match_range(model);
            }
            SearchMode::FilterAll => {
                cursor.pos = index.lower_bound(model.arena(), &cursor.pat);
                cursor.seek_match(model);
            }
        }
        cursor
    }

    /// True iff the cursor has no current statement
    pub fn is_end(&self) -> bool {
        self.end
    }

    /// The current statement, in logical (S, P, O, G) order
    pub fn get(&self, model: &Model) -> Option<Quad> {
        if self.end || !self.validate(model) {
            return None;
        }
        let id = model.index_for(self.order).get(self.pos)?;
        Some(model.arena().get(id).clone())
    }

    /// One slot of the current statement
    pub fn get_field(&self, model: &Model, pos: QuadPos) -> Option<Node> {
        if self.end || !self.validate(model) {
            return None;
        }
        let id = model.index_for(self.order).get(self.pos)?;
        model.arena().get(id).slot(pos).cloned()
    }

    /// Advance to the next statement; true iff terminal afterwards
    pub fn advance(&mut self, model: &Model) -> bool {
        if self.end {
            return true;
        }
        if !self.validate(model) {
            self.end = true;
            return true;
        }
        self.forward(model);
        if !self.end {
            match self.mode {
                SearchMode::FullScan => {}
                SearchMode::SinglePoint => self.end = true,
                SearchMode::PrefixRange => {
                    if !self.prefix_matches(model) {
                        self.end = true;
                    }
                }
                SearchMode::FilterRange => self.seek_match_range(model),
                SearchMode::FilterAll => self.seek_match(model),
            }
        }
        self.end
    }

    /// The ordering this cursor walks
    pub fn order(&self) -> crate::order::StoreOrder {
        self.order
    }

    /// The pattern this cursor honors
    pub fn pattern(&self) -> &Pattern {
        &self.pat
    }

    pub(crate) fn belongs_to(&self, model: &Model) -> bool {
        self.model_id == model.id()
    }

    pub(crate) fn in_sync_with(&self, model: &Model) -> bool {
        self.version == model.version()
    }

    /// Accept the model's state after a mutation routed through this
    /// cursor
    pub(crate) fn resync(&mut self, version: u64) {
        self.version = version;
    }

    /// Re-establish the mode's invariant after the current entry was
    /// removed under the cursor (the next entry slid into its position)
    pub(crate) fn revalidate(&mut self, model: &Model) {
        if self.end {
            return;
        }
        if self.pos >= model.index_for(self.order).len() {
            self.end = true;
            return;
        }
        match self.mode {
            SearchMode::FullScan => {}
            SearchMode::SinglePoint => self.end = true,
            SearchMode::PrefixRange => {
                if !self.prefix_matches(model) {
                    self.end = true;
                }
            }
            SearchMode::FilterRange => self.seek_match_range(model),
            SearchMode::FilterAll => self.seek_match(model),
        }
    }

    fn validate(&self, model: &Model) -> bool {
        if !self.belongs_to(model) {
            model.world().report(&StoreError::ForeignCursor);
            return false;
        }
        if !self.in_sync_with(model) {
            model.world().report(&StoreError::StaleCursor);
            return false;
        }
        true
    }

    fn current_quad<'m>(&self, model: &'m Model) -> Option<&'m Quad> {
        let id = model.index_for(self.order).get(self.pos)?;
        Some(model.arena().get(id))
    }

    fn current_matches(&self, model: &Model) -> bool {
        self.current_quad(model)
            .is_some_and(|q| q.matches(&self.pat))
    }

    /// Step to the next index entry, honoring the skip-graphs flag
    fn forward(&mut self, model: &Model) {
        let index = model.index_for(self.order);
        if !self.skip_graphs {
            self.pos += 1;
            self.end = self.pos >= index.len();
            return;
        }

        // Remember the current triple and step past every entry that
        // repeats it in another graph.
        let initial = match self.current_quad(model) {
            Some(q) => [q.s.addr(), q.p.addr(), q.o.addr()],
            None => {
                self.end = true;
                return;
            }
        };
        loop {
            self.pos += 1;
            if self.pos >= index.len() {
                self.end = true;
                return;
            }
            let q = model.arena().get(index.get(self.pos).expect("in bounds"));
            if [q.s.addr(), q.p.addr(), q.o.addr()] != initial {
                return;
            }
        }
    }

    /// True iff the first `prefix` key slots still match the pattern
    fn prefix_matches(&self, model: &Model) -> bool {
        let Some(quad) = self.current_quad(model) else {
            return false;
        };
        self.perm[..self.prefix]
            .iter()
            .all(|&pos| slot_admits(quad.slot(pos), self.pat.slot(pos)))
    }

    /// Seek forward to the next full pattern match
    fn seek_match(&mut self, model: &Model) {
        loop {
            if self.end {
                return;
            }
            match self.current_quad(model) {
                None => {
                    self.end = true;
                    return;
                }
                Some(q) if q.matches(&self.pat) => return,
                Some(_) => self.forward(model),
            }
        }
    }

    /// Seek forward to the next full pattern match, stopping when the
    /// key prefix leaves the range
    fn seek_match_range(&mut self, model: &Model) {
        loop {
            if self.end {
                return;
            }
            match self.current_quad(model) {
                None => {
                    self.end = true;
                    return;
                }
                Some(q) if q.matches(&self.pat) => return,
                Some(_) => {
                    if !self.prefix_matches(model) {
                        self.end = true;
                        return;
                    }
                    self.forward(model);
                }
            }
        }
    }
}

/// Borrowing iterator over a model's matches
///
/// Returned by [`Model::find`](crate::Model::find) and friends. While a
/// `Matches` is alive the model cannot be mutated, so its statements
/// stream in the chosen ordering without invalidation hazards. Detach
/// the underlying [`Cursor`] with [`Matches::into_cursor`] to interleave
/// iteration with [`Model::erase`](crate::Model::erase).
pub struct Matches<'m> {
    model: &'m Model,
    cursor: Cursor,
}

impl<'m> Matches<'m> {
    pub(crate) fn new(model: &'m Model, cursor: Cursor) -> Self {
        Matches { model, cursor }
    }

    /// The model this iterator reads
    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// True iff there is no current statement
    pub fn is_end(&self) -> bool {
        self.cursor.is_end()
    }

    /// The current statement without advancing
    pub fn get(&self) -> Option<Quad> {
        self.cursor.get(self.model)
    }

    /// One slot of the current statement
    pub fn get_field(&self, pos: QuadPos) -> Option<Node> {
        self.cursor.get_field(self.model, pos)
    }

    /// Advance to the next statement; true iff terminal afterwards
    pub fn advance(&mut self) -> bool {
        self.cursor.advance(self.model)
    }

    /// Give up the borrow, keeping the position
    pub fn into_cursor(self) -> Cursor {
        self.cursor
    }
}

impl Iterator for Matches<'_> {
    type Item = Quad;

    fn next(&mut self) -> Option<Quad> {
        let quad = self.cursor.get(self.model)?;
        self.cursor.advance(self.model);
        Some(quad)
    }
}
