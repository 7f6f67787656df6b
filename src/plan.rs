//! Pattern analysis and index selection
//!
//! Given a pattern, pick the ordering to walk and the search mode to
//! walk it with. The decision is driven by the 3-bit signature of the
//! S/P/O slots plus whether the graph slot is bound:
//!
//! | S P O | Preferred orderings | Prefix | Mode         |
//! |-------|---------------------|--------|--------------|
//! | 0 0 0 | SPO (default)       | 0      | full scan    |
//! | 0 0 1 | OPS, OSP            | 1      | prefix range |
//! | 0 1 0 | POS, PSO            | 1      | prefix range |
//! | 0 1 1 | OPS, POS            | 2      | prefix range |
//! | 1 0 0 | SPO, SOP            | 1      | prefix range |
//! | 1 0 1 | SOP, OSP            | 2      | prefix range |
//! | 1 1 0 | SPO, PSO            | 2      | prefix range |
//! | 1 1 1 | SPO (default)       | -      | single point |
//!
//! When neither preferred ordering is materialized, signatures with two
//! bound slots fall back to a prefix-1 range that filters the rest;
//! the terminal fallback is a filtered scan of the default ordering.
//!
//! A bound graph slot lifts the chosen ordering to its graph-prefixed
//! variant with the prefix extended by one. When graphs are not
//! tracked, the graph constraint is honored by filtering instead; the
//! graph slot is still part of every stored key, so a fully bound
//! pattern stays a single-point probe.

use crate::order::StoreOrder;
use crate::quad::Pattern;

/// Mode for searching or iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Iterate to the end of the index, no filtering
    FullScan,
    /// A single exact match; the first advance terminates
    SinglePoint,
    /// Iterate while the key prefix matches the pattern
    PrefixRange,
    /// Prefix range that additionally filters each key
    FilterRange,
    /// Iterate to the end of the index, filtering each key
    FilterAll,
}

/// The plan for one `find`: which ordering, walked how
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strategy {
    pub order: StoreOrder,
    pub mode: SearchMode,
    /// Number of leading key slots the range is constrained by
    /// (`PrefixRange` and `FilterRange` only)
    pub prefix: usize,
}

/// S/P/O signature: bit 2 = subject bound, bit 1 = predicate, bit 0 = object
pub(crate) fn signature(pat: &Pattern) -> usize {
    (usize::from(pat.s.is_some()) << 2)
        | (usize::from(pat.p.is_some()) << 1)
        | usize::from(pat.o.is_some())
}

struct PlanRow {
    prefix: usize,
    candidates: [StoreOrder; 2],
}

/// Preferred orderings per signature; rows 0 and 7 are handled before
/// the table is consulted
static PREFERRED: [PlanRow; 8] = [
    PlanRow { prefix: 0, candidates: [StoreOrder::Spo, StoreOrder::Spo] },
    PlanRow { prefix: 1, candidates: [StoreOrder::Ops, StoreOrder::Osp] },
    PlanRow { prefix: 1, candidates: [StoreOrder::Pos, StoreOrder::Pso] },
    PlanRow { prefix: 2, candidates: [StoreOrder::Ops, StoreOrder::Pos] },
    PlanRow { prefix: 1, candidates: [StoreOrder::Spo, StoreOrder::Sop] },
    PlanRow { prefix: 2, candidates: [StoreOrder::Sop, StoreOrder::Osp] },
    PlanRow { prefix: 2, candidates: [StoreOrder::Spo, StoreOrder::Pso] },
    PlanRow { prefix: 0, candidates: [StoreOrder::Spo, StoreOrder::Spo] },
];

/// Filtered fallbacks: a prefix-1 range on one bound slot, filtering
/// the other. Only the two-bound signatures have one.
static FILTERED: [Option<PlanRow>; 8] = [
    None,
    None,
    None,
    Some(PlanRow { prefix: 1, candidates: [StoreOrder::Osp, StoreOrder::Pso] }),
    None,
    Some(PlanRow { prefix: 1, candidates: [StoreOrder::Spo, StoreOrder::Ops] }),
    Some(PlanRow { prefix: 1, candidates: [StoreOrder::Sop, StoreOrder::Pos] }),
    None,
];

/// Pick the best materialized ordering and search mode for `pat`
pub(crate) fn best_index(
    pat: &Pattern,
    graphs_tracked: bool,
    has: impl Fn(StoreOrder) -> bool,
) -> Strategy {
    let sig = signature(pat);
    let graph_bound = pat.g.is_some();

    if sig == 0b111 {
        // Exact key probe; the store is a set, so at most one match.
        let order = if graph_bound && graphs_tracked {
            StoreOrder::DEFAULT_GRAPH
        } else {
            StoreOrder::DEFAULT
        };
        return Strategy { order, mode: SearchMode::SinglePoint, prefix: 0 };
    }

    if sig == 0b000 {
        if graph_bound {
            return if graphs_tracked {
                Strategy {
                    order: StoreOrder::DEFAULT_GRAPH,
                    mode: SearchMode::PrefixRange,
                    prefix: 1,
                }
            } else {
                Strategy { order: StoreOrder::DEFAULT, mode: SearchMode::FilterAll, prefix: 0 }
            };
        }
        return Strategy { order: StoreOrder::DEFAULT, mode: SearchMode::FullScan, prefix: 0 };
    }

    let row = &PREFERRED[sig];

    if graph_bound && graphs_tracked {
        for candidate in row.candidates {
            let order = candidate.to_graph_order();
            if has(order) {
                return Strategy { order, mode: SearchMode::PrefixRange, prefix: row.prefix + 1 };
            }
        }
        if let Some(fallback) = &FILTERED[sig] {
            for candidate in fallback.candidates {
                let order = candidate.to_graph_order();
                if has(order) {
                    return Strategy {
                        order,
                        mode: SearchMode::FilterRange,
                        prefix: fallback.prefix + 1,
                    };
                }
            }
        }
        // GSPO exists whenever graphs are tracked
        return Strategy {
            order: StoreOrder::DEFAULT_GRAPH,
            mode: SearchMode::FilterRange,
            prefix: 1,
        };
    }

    // A bound graph without a graph index is honored by filtering
    let range_mode = if graph_bound { SearchMode::FilterRange } else { SearchMode::PrefixRange };

    for candidate in row.candidates {
        if has(candidate) {
            return Strategy { order: candidate, mode: range_mode, prefix: row.prefix };
        }
    }
    if let Some(fallback) = &FILTERED[sig] {
        for candidate in fallback.candidates {
            if has(candidate) {
                return Strategy {
                    order: candidate,
                    mode: SearchMode::FilterRange,
                    prefix: fallback.prefix,
                };
            }
        }
    }

    Strategy { order: StoreOrder::DEFAULT, mode: SearchMode::FilterAll, prefix: 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn pat(s: bool, p: bool, o: bool, g: bool) -> Pattern {
        Pattern {
            s: s.then(|| Node::uri("s")),
            p: p.then(|| Node::uri("p")),
            o: o.then(|| Node::uri("o")),
            g: g.then(|| Node::uri("g")),
        }
    }

    fn has_all(_: StoreOrder) -> bool {
        true
    }

    fn only(avail: &[StoreOrder]) -> impl Fn(StoreOrder) -> bool + '_ {
        move |o| avail.contains(&o)
    }

    #[test]
    fn test_signature_bits() {
        assert_eq!(signature(&pat(false, false, false, false)), 0b000);
        assert_eq!(signature(&pat(true, false, true, false)), 0b101);
        assert_eq!(signature(&pat(true, true, true, true)), 0b111);
    }

    #[test]
    fn test_preferred_orderings() {
        // Object bound -> OPS, prefix 1
        let s = best_index(&pat(false, false, true, false), false, has_all);
        assert_eq!(s.order, StoreOrder::Ops);
        assert_eq!(s.mode, SearchMode::PrefixRange);
        assert_eq!(s.prefix, 1);

        // Subject and predicate bound -> SPO, prefix 2
        let s = best_index(&pat(true, true, false, false), false, has_all);
        assert_eq!(s.order, StoreOrder::Spo);
        assert_eq!(s.prefix, 2);

        // Predicate and object bound -> OPS, prefix 2
        let s = best_index(&pat(false, true, true, false), false, has_all);
        assert_eq!(s.order, StoreOrder::Ops);
        assert_eq!(s.prefix, 2);
    }

    #[test]
    fn test_extremes_use_default_order() {
        let s = best_index(&pat(false, false, false, false), false, has_all);
        assert_eq!(s.order, StoreOrder::Spo);
        assert_eq!(s.mode, SearchMode::FullScan);

        let s = best_index(&pat(true, true, true, false), false, has_all);
        assert_eq!(s.order, StoreOrder::Spo);
        assert_eq!(s.mode, SearchMode::SinglePoint);
    }

    #[test]
    fn test_second_candidate_when_first_missing() {
        let avail = [StoreOrder::Spo, StoreOrder::Osp];
        let s = best_index(&pat(false, false, true, false), false, only(&avail));
        assert_eq!(s.order, StoreOrder::Osp);
        assert_eq!(s.mode, SearchMode::PrefixRange);
    }

    #[test]
    fn test_filtered_fallback() {
        // (P O) bound with only PSO available: prefix-1 range on P,
        // filtering O
        let avail = [StoreOrder::Spo, StoreOrder::Pso];
        let s = best_index(&pat(false, true, true, false), false, only(&avail));
        assert_eq!(s.order, StoreOrder::Pso);
        assert_eq!(s.mode, SearchMode::FilterRange);
        assert_eq!(s.prefix, 1);
    }

    #[test]
    fn test_terminal_fallback_scans_default() {
        // (P O) bound with only SPO available
        let avail = [StoreOrder::Spo];
        let s = best_index(&pat(false, true, true, false), false, only(&avail));
        assert_eq!(s.order, StoreOrder::Spo);
        assert_eq!(s.mode, SearchMode::FilterAll);
    }

    #[test]
    fn test_graph_lifts_to_graph_order() {
        let s = best_index(&pat(true, false, false, true), true, has_all);
        assert_eq!(s.order, StoreOrder::Gspo);
        assert_eq!(s.mode, SearchMode::PrefixRange);
        assert_eq!(s.prefix, 2);

        // Only the graph bound: prefix-1 range over GSPO
        let s = best_index(&pat(false, false, false, true), true, has_all);
        assert_eq!(s.order, StoreOrder::Gspo);
        assert_eq!(s.mode, SearchMode::PrefixRange);
        assert_eq!(s.prefix, 1);
    }

    #[test]
    fn test_graph_fallback_filter_range_on_gspo() {
        // Object bound + graph bound, but no GOPS/GOSP materialized
        let avail = [StoreOrder::Spo, StoreOrder::Gspo];
        let s = best_index(&pat(false, false, true, true), true, only(&avail));
        assert_eq!(s.order, StoreOrder::Gspo);
        assert_eq!(s.mode, SearchMode::FilterRange);
        assert_eq!(s.prefix, 1);
    }

    #[test]
    fn test_graph_without_tracking_filters() {
        let s = best_index(&pat(true, false, false, true), false, has_all);
        assert_eq!(s.order, StoreOrder::Spo);
        assert_eq!(s.mode, SearchMode::FilterRange);
        assert_eq!(s.prefix, 1);

        // Fully bound stays a point probe: the graph slot is part of
        // the stored key
        let s = best_index(&pat(true, true, true, true), false, has_all);
        assert_eq!(s.order, StoreOrder::Spo);
        assert_eq!(s.mode, SearchMode::SinglePoint);
    }
}
