//! Lexicographic refinement of an optimal assignment.
//!
//! Any two optimal assignments differ by zero-cost cycles in the residual
//! graph of either one. Walking entries in index order, we look for the
//! lowest ride that entry `i` can move to through such a cycle while
//! entries `0..i` stay fixed, and apply the first one found. Potentials from
//! a single Bellman-Ford pass keep reduced costs non-negative across every
//! applied cycle, so each search is one Dijkstra run.
//!
//! Graph: `S -> E_i -> R_j -> T`, with residual arcs reversed where flow runs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::problem::TransportProblem;
use super::MatchingError;

const SOURCE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Source,
    Entry(usize),
    Ride(usize),
    Sink,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    entries: usize,
    rides: usize,
}

impl Layout {
    fn entry(&self, i: usize) -> usize {
        1 + i
    }

    fn ride(&self, j: usize) -> usize {
        1 + self.entries + j
    }

    fn sink(&self) -> usize {
        1 + self.entries + self.rides
    }

    fn len(&self) -> usize {
        self.entries + self.rides + 2
    }

    fn node(&self, v: usize) -> Node {
        if v == SOURCE {
            Node::Source
        } else if v <= self.entries {
            Node::Entry(v - 1)
        } else if v <= self.entries + self.rides {
            Node::Ride(v - 1 - self.entries)
        } else {
            Node::Sink
        }
    }
}

struct Arc {
    from: usize,
    to: usize,
    cost: i64,
}

fn inconsistent(msg: &str) -> MatchingError {
    MatchingError::SolverInconsistent(msg.to_string())
}

fn residual_arcs(problem: &TransportProblem, layout: Layout, choice: &[Option<usize>]) -> Vec<Arc> {
    let mut used = vec![0usize; problem.rides()];
    let mut arcs = Vec::new();
    for (i, assigned) in choice.iter().enumerate() {
        let e = layout.entry(i);
        match assigned {
            Some(j) => {
                used[*j] += 1;
                arcs.push(Arc { from: e, to: SOURCE, cost: 0 });
            }
            None => arcs.push(Arc { from: SOURCE, to: e, cost: 0 }),
        }
        for j in 0..problem.rides() {
            let Some(cost) = problem.cost(i, j) else { continue };
            // Costs fit in i64: checked when the problem was built.
            let cost = cost as i64;
            if *assigned == Some(j) {
                arcs.push(Arc { from: layout.ride(j), to: e, cost: -cost });
            } else {
                arcs.push(Arc { from: e, to: layout.ride(j), cost });
            }
        }
    }
    for (j, &used) in used.iter().enumerate() {
        let r = layout.ride(j);
        if used < problem.capacity(j) {
            arcs.push(Arc { from: r, to: layout.sink(), cost: 0 });
        }
        if used > 0 {
            arcs.push(Arc { from: layout.sink(), to: r, cost: 0 });
        }
    }
    arcs
}

/// Feasible potentials for the residual graph; fails if the starting
/// assignment admits a negative cycle, i.e. it was not optimal.
fn potentials(arcs: &[Arc], nodes: usize) -> Result<Vec<i64>, MatchingError> {
    let mut pi = vec![0i64; nodes];
    for _ in 0..=nodes {
        let mut changed = false;
        for arc in arcs {
            let candidate = pi[arc.from] + arc.cost;
            if candidate < pi[arc.to] {
                pi[arc.to] = candidate;
                changed = true;
            }
        }
        if !changed {
            return Ok(pi);
        }
    }
    Err(inconsistent("starting assignment is not cost-optimal"))
}

/// Shortest reduced-cost distances from every node to `target`, skipping
/// `blocked` nodes. `next[v]` is the successor of `v` on its shortest path.
fn distances_to(
    target: usize,
    arcs: &[Arc],
    pi: &[i64],
    blocked: impl Fn(usize) -> bool,
) -> Result<(Vec<Option<i64>>, Vec<Option<usize>>), MatchingError> {
    let nodes = pi.len();
    let mut incoming: Vec<Vec<(usize, i64)>> = vec![Vec::new(); nodes];
    for arc in arcs {
        if blocked(arc.from) || blocked(arc.to) {
            continue;
        }
        let reduced = arc.cost + pi[arc.from] - pi[arc.to];
        if reduced < 0 {
            return Err(inconsistent("negative reduced cost"));
        }
        incoming[arc.to].push((arc.from, reduced));
    }

    let mut dist: Vec<Option<i64>> = vec![None; nodes];
    let mut next: Vec<Option<usize>> = vec![None; nodes];
    let mut heap = BinaryHeap::new();
    dist[target] = Some(0);
    heap.push(Reverse((0i64, target)));

    while let Some(Reverse((d, v))) = heap.pop() {
        if dist[v].is_some_and(|best| d > best) {
            continue;
        }
        for &(u, reduced) in &incoming[v] {
            let candidate = d + reduced;
            if dist[u].map_or(true, |current| candidate < current) {
                dist[u] = Some(candidate);
                next[u] = Some(v);
                heap.push(Reverse((candidate, u)));
            }
        }
    }
    Ok((dist, next))
}

/// Rewrite `choice`, which must already be optimal, into the lexicographically
/// smallest optimal assignment.
pub(crate) fn refine_lexicographically(
    problem: &TransportProblem,
    choice: &mut [Option<usize>],
) -> Result<(), MatchingError> {
    let layout = Layout {
        entries: problem.entries(),
        rides: problem.rides(),
    };
    let pi = potentials(&residual_arcs(problem, layout, choice), layout.len())?;

    for i in 0..layout.entries {
        let (target, rank, current_cost) = match choice[i] {
            Some(k) => (layout.ride(k), k, problem.cost(i, k).unwrap_or_default() as i64),
            None => (SOURCE, layout.rides, 0),
        };
        if !(0..rank).any(|j| problem.cost(i, j).is_some()) {
            continue;
        }

        let arcs = residual_arcs(problem, layout, choice);
        let blocked = |v: usize| matches!(layout.node(v), Node::Entry(e) if e <= i);
        let (dist, next) = distances_to(target, &arcs, &pi, blocked)?;

        for j in 0..rank {
            let Some(cost) = problem.cost(i, j) else { continue };
            let r = layout.ride(j);
            let Some(reduced) = dist[r] else { continue };
            let path = reduced - pi[r] + pi[target];
            let delta = cost as i64 + path - current_cost;
            if delta < 0 {
                return Err(inconsistent("improving cycle in an optimal assignment"));
            }
            if delta == 0 {
                choice[i] = Some(j);
                apply_path(layout, choice, r, target, &next)?;
                break;
            }
        }
    }
    Ok(())
}

/// Push one unit of flow back along the shortest path from `start` to `target`.
fn apply_path(
    layout: Layout,
    choice: &mut [Option<usize>],
    start: usize,
    target: usize,
    next: &[Option<usize>],
) -> Result<(), MatchingError> {
    let mut v = start;
    for _ in 0..layout.len() {
        if v == target {
            return Ok(());
        }
        let u = next[v].ok_or_else(|| inconsistent("broken path"))?;
        if let Node::Entry(y) = layout.node(v) {
            choice[y] = match layout.node(u) {
                Node::Ride(x) => Some(x),
                Node::Source => None,
                _ => return Err(inconsistent("entry leaves to sink")),
            };
        }
        v = u;
    }
    Err(inconsistent("path does not reach its target"))
}
