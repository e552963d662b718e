//! Precedence level registry and resolution.
//!
//! Declarations go in one at a time; [`PrecedenceRegistry::resolve`] turns
//! the accumulated constraint graph into a [`ResolvedOrder`]. The registry
//! is a build-phase object: it borrows the interner, validates each
//! declaration as it arrives, and is consumed by resolution.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use tracing::debug;
use veld_ir::{Assoc, ConstraintKind, LevelDecl, LevelId, Name, Span, StringInterner};

use crate::order::{BitMatrix, ResolvedLevel, ResolvedOrder};
use crate::PrecedenceError;

/// Name of the upper sentinel level.
pub const HIGHEST: &str = "Highest";
/// Name of the lower sentinel level.
pub const LOWEST: &str = "Lowest";

struct LevelEntry {
    name: Name,
    assoc: Assoc,
    span: Span,
}

/// A looser-than edge: `from` binds looser than `to`.
#[derive(Copy, Clone, Eq, PartialEq)]
struct Edge {
    from: LevelId,
    to: LevelId,
}

/// Registry of declared precedence levels.
///
/// The two sentinels are injected at construction: `Lowest` at
/// [`LevelId::LOWEST`] and `Highest` at [`LevelId::HIGHEST`]. User
/// declarations may reference them as constraint targets but never redeclare
/// them or place anything beyond them.
pub struct PrecedenceRegistry<'i> {
    interner: &'i StringInterner,
    levels: Vec<LevelEntry>,
    by_name: FxHashMap<Name, LevelId>,
    edges: Vec<Edge>,
    highest: Name,
    lowest: Name,
}

impl<'i> PrecedenceRegistry<'i> {
    /// Create a registry with the sentinels pre-declared.
    pub fn new(interner: &'i StringInterner) -> Self {
        let lowest = interner.intern(LOWEST);
        let highest = interner.intern(HIGHEST);
        let levels = vec![
            LevelEntry {
                name: lowest,
                assoc: Assoc::None,
                span: Span::DUMMY,
            },
            LevelEntry {
                name: highest,
                assoc: Assoc::None,
                span: Span::DUMMY,
            },
        ];
        let mut by_name = FxHashMap::default();
        by_name.insert(lowest, LevelId::LOWEST);
        by_name.insert(highest, LevelId::HIGHEST);
        PrecedenceRegistry {
            interner,
            levels,
            by_name,
            edges: Vec::new(),
            highest,
            lowest,
        }
    }

    /// Declare a precedence level.
    ///
    /// On constraint errors the level itself stays registered (with its
    /// valid constraints), so later declarations referencing it report their
    /// own problems instead of cascading `UnknownReference`s.
    pub fn declare_level(&mut self, decl: &LevelDecl) -> Result<LevelId, Vec<PrecedenceError>> {
        if let Some(&prev) = self.by_name.get(&decl.name) {
            return Err(vec![PrecedenceError::DuplicateLevel {
                name: self.interner.lookup(decl.name).to_owned(),
                span: decl.span,
                first_span: self.levels[prev.index()].span,
            }]);
        }

        let id = LevelId::new(self.levels.len() as u32);
        self.levels.push(LevelEntry {
            name: decl.name,
            assoc: decl.assoc,
            span: decl.span,
        });
        self.by_name.insert(decl.name, id);

        let mut errors = Vec::new();
        for constraint in &decl.constraints {
            let Some(&target) = self.by_name.get(&constraint.target) else {
                errors.push(PrecedenceError::UnknownReference {
                    name: self.interner.lookup(constraint.target).to_owned(),
                    span: constraint.span,
                });
                continue;
            };
            match constraint.kind {
                ConstraintKind::LowerThan => {
                    // `lower_than Lowest` would place the level below the
                    // lower bound.
                    if target == LevelId::LOWEST {
                        errors.push(self.sentinel_violation(decl.name, self.lowest, constraint.span));
                        continue;
                    }
                    self.edges.push(Edge { from: id, to: target });
                }
                ConstraintKind::HigherThan => {
                    if target == LevelId::HIGHEST {
                        errors.push(self.sentinel_violation(decl.name, self.highest, constraint.span));
                        continue;
                    }
                    self.edges.push(Edge { from: target, to: id });
                }
            }
        }

        if errors.is_empty() {
            Ok(id)
        } else {
            Err(errors)
        }
    }

    fn sentinel_violation(&self, level: Name, sentinel: Name, span: Span) -> PrecedenceError {
        PrecedenceError::SentinelViolation {
            level: self.interner.lookup(level).to_owned(),
            sentinel: self.interner.lookup(sentinel).to_owned(),
            span,
        }
    }

    /// Resolve the constraint graph into an immutable order.
    ///
    /// Deterministic: topological ties break by declaration order, so
    /// identical inputs always produce identical outputs. Fails with
    /// [`PrecedenceError::CycleDetected`] naming an actual cycle.
    pub fn resolve(self) -> Result<ResolvedOrder, PrecedenceError> {
        let n = self.levels.len();

        // Forward adjacency (looser -> tighter), deduplicated. Every user
        // level sits strictly between the sentinels.
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        adj[LevelId::LOWEST.index()].push(LevelId::HIGHEST.index());
        for id in LevelId::SENTINEL_COUNT as usize..n {
            adj[LevelId::LOWEST.index()].push(id);
            adj[id].push(LevelId::HIGHEST.index());
        }
        for edge in &self.edges {
            adj[edge.from.index()].push(edge.to.index());
        }
        for row in &mut adj {
            row.sort_unstable();
            row.dedup();
        }

        let mut in_degree = vec![0usize; n];
        for row in &adj {
            for &to in row {
                in_degree[to] += 1;
            }
        }

        // Kahn's algorithm with a min-heap so ready levels leave in
        // declaration order.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut topo_order = Vec::with_capacity(n);
        while let Some(Reverse(u)) = ready.pop() {
            topo_order.push(u);
            for &v in &adj[u] {
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    ready.push(Reverse(v));
                }
            }
        }

        if topo_order.len() != n {
            return Err(self.extract_cycle(&adj, &in_degree));
        }

        let mut topo_index = vec![0u32; n];
        for (pos, &u) in topo_order.iter().enumerate() {
            topo_index[u] = pos as u32;
        }

        // Transitive closure in reverse topological order: a level reaches
        // its successors and everything they reach.
        let mut reach = BitMatrix::new(n);
        for &u in topo_order.iter().rev() {
            for &v in &adj[u] {
                reach.set(u, v);
                reach.union_rows(u, v);
            }
        }

        debug!(levels = n, edges = self.edges.len(), "resolved precedence order");

        let levels = self
            .levels
            .into_iter()
            .map(|entry| ResolvedLevel {
                name: entry.name,
                assoc: entry.assoc,
                span: entry.span,
            })
            .collect();
        Ok(ResolvedOrder::new(levels, self.by_name, topo_index, reach))
    }

    /// Walk predecessors among the unfinished levels until one repeats.
    ///
    /// Every level left with a nonzero in-degree has an unfinished
    /// predecessor, so the walk must close a loop. Smallest-id choices keep
    /// the reported cycle deterministic.
    fn extract_cycle(&self, adj: &[Vec<usize>], in_degree: &[usize]) -> PrecedenceError {
        let n = self.levels.len();
        let remaining: Vec<bool> = (0..n).map(|i| in_degree[i] > 0).collect();

        let mut radj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (from, row) in adj.iter().enumerate() {
            for &to in row {
                if remaining[from] && remaining[to] {
                    radj[to].push(from);
                }
            }
        }
        for row in &mut radj {
            row.sort_unstable();
        }

        let start = remaining
            .iter()
            .position(|&r| r)
            .unwrap_or_else(|| panic!("cycle extraction called without unfinished levels"));

        let mut path: Vec<usize> = vec![start];
        let mut on_path = vec![usize::MAX; n];
        on_path[start] = 0;
        loop {
            let current = path[path.len() - 1];
            let &pred = radj[current]
                .first()
                .unwrap_or_else(|| panic!("unfinished level without unfinished predecessor"));
            if on_path[pred] != usize::MAX {
                // Close the loop. The path was walked backwards (each entry
                // is a predecessor of the one before it), so the loop nodes
                // are re-ordered to read in looser-than direction, with the
                // entry level repeated at the end.
                let loop_nodes = &path[on_path[pred]..];
                let mut nodes: Vec<usize> = vec![loop_nodes[0]];
                nodes.extend(loop_nodes[1..].iter().rev());
                nodes.push(loop_nodes[0]);
                let first_span = self.levels[nodes[0]].span;
                let cycle = nodes
                    .into_iter()
                    .map(|i| self.interner.lookup(self.levels[i].name).to_owned())
                    .collect();
                return PrecedenceError::CycleDetected {
                    cycle,
                    span: first_span,
                };
            }
            on_path[pred] = path.len();
            path.push(pred);
        }
    }
}
