//! Bounded A* over the 8-connected grid.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use safepath_core::{
    CellBounds, CellCoord, SpatialIndex, DIAGONAL_STEP_COST, NEIGHBOR_OFFSETS,
    ORTHOGONAL_STEP_COST,
};

use crate::{PartialReason, PathOutcome};

/// Memoised occlusion answers for the duration of a single query.
#[derive(Debug, Default)]
pub(crate) struct OcclusionMemo {
    walkable: HashMap<CellCoord, bool>,
    blocked: HashMap<(CellCoord, CellCoord), bool>,
}

impl OcclusionMemo {
    pub(crate) fn reset(&mut self) {
        self.walkable.clear();
        self.blocked.clear();
    }

    pub(crate) fn is_walkable<S>(&mut self, spatial: &S, cell: CellCoord, height: f32) -> bool
    where
        S: SpatialIndex + ?Sized,
    {
        *self
            .walkable
            .entry(cell)
            .or_insert_with(|| spatial.is_walkable(cell, height))
    }

    pub(crate) fn is_step_blocked<S>(
        &mut self,
        spatial: &S,
        from: CellCoord,
        to: CellCoord,
        height: f32,
    ) -> bool
    where
        S: SpatialIndex + ?Sized,
    {
        *self.blocked.entry((from, to)).or_insert_with(|| {
            spatial.is_segment_blocked(from.to_world(height), to.to_world(height))
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    sequence: u64,
    g: u32,
    cell: CellCoord,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the lowest F, oldest entry first.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Inputs of a single search between two already snapped cells.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SearchBounds {
    pub(crate) start: CellCoord,
    pub(crate) goal: CellCoord,
    pub(crate) area: CellBounds,
    pub(crate) height: f32,
    pub(crate) max_iterations: usize,
}

/// Where a search ended and why.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SearchResult {
    pub(crate) end: CellCoord,
    pub(crate) outcome: PathOutcome,
    pub(crate) iterations: usize,
}

/// Reusable allocations for successive searches.
#[derive(Debug, Default)]
pub(crate) struct SearchScratch {
    pub(crate) memo: OcclusionMemo,
    open: BinaryHeap<OpenEntry>,
    best_cost: HashMap<CellCoord, u32>,
    closed: HashSet<CellCoord>,
    parents: HashMap<CellCoord, CellCoord>,
    sequence: u64,
}

impl SearchScratch {
    fn clear(&mut self) {
        self.open.clear();
        self.best_cost.clear();
        self.closed.clear();
        self.parents.clear();
        self.sequence = 0;
    }

    fn push(&mut self, cell: CellCoord, g: u32, h: u32) {
        self.open.push(OpenEntry {
            f: g.saturating_add(h),
            sequence: self.sequence,
            g,
            cell,
        });
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Runs A* from `start` towards `goal` inside `area`.
    ///
    /// When the goal is not reached the result ends at the expanded cell with
    /// the lowest heuristic, so callers always receive a usable partial route.
    pub(crate) fn run<S>(&mut self, spatial: &S, bounds: SearchBounds) -> SearchResult
    where
        S: SpatialIndex + ?Sized,
    {
        self.clear();
        let SearchBounds {
            start,
            goal,
            area,
            height,
            max_iterations,
        } = bounds;

        let start_h = start.octile_cost(goal);
        let _ = self.best_cost.insert(start, 0);
        self.push(start, 0, start_h);

        let mut best = (start, start_h);
        let mut iterations = 0_usize;
        let mut exhausted = false;

        while let Some(current) = self.open.pop() {
            iterations += 1;
            if iterations > max_iterations {
                exhausted = true;
                break;
            }

            if self.closed.contains(&current.cell) {
                continue;
            }
            if self
                .best_cost
                .get(&current.cell)
                .is_some_and(|&cost| cost < current.g)
            {
                continue;
            }
            let _ = self.closed.insert(current.cell);

            let h = current.f - current.g;
            if h < best.1 {
                best = (current.cell, h);
            }

            if current.cell == goal {
                return SearchResult {
                    end: goal,
                    outcome: PathOutcome::Reached,
                    iterations,
                };
            }

            for (dx, dz) in NEIGHBOR_OFFSETS {
                let next = current.cell.offset(dx, dz);
                if !area.contains(next) || self.closed.contains(&next) {
                    continue;
                }
                if !self.memo.is_walkable(spatial, next, height) {
                    continue;
                }

                let diagonal = dx != 0 && dz != 0;
                if diagonal
                    && (!self
                        .memo
                        .is_walkable(spatial, current.cell.offset(dx, 0), height)
                        || !self
                            .memo
                            .is_walkable(spatial, current.cell.offset(0, dz), height))
                {
                    continue;
                }
                if self
                    .memo
                    .is_step_blocked(spatial, current.cell, next, height)
                {
                    continue;
                }

                let step = if diagonal {
                    DIAGONAL_STEP_COST
                } else {
                    ORTHOGONAL_STEP_COST
                };
                let tentative = current.g.saturating_add(step);
                let improves = self
                    .best_cost
                    .get(&next)
                    .map_or(true, |&existing| tentative < existing);
                if improves {
                    let _ = self.best_cost.insert(next, tentative);
                    let _ = self.parents.insert(next, current.cell);
                    self.push(next, tentative, next.octile_cost(goal));
                }
            }
        }

        let reason = if exhausted {
            log::debug!(
                "search {start:?} -> {goal:?} exhausted its budget of {max_iterations} iterations"
            );
            PartialReason::BudgetExhausted
        } else {
            PartialReason::Unreachable
        };

        SearchResult {
            end: best.0,
            outcome: PathOutcome::Partial(reason),
            iterations: iterations.min(max_iterations),
        }
    }

    /// Cells from the start of the last search to `end`, inclusive.
    pub(crate) fn trace(&self, end: CellCoord) -> Vec<CellCoord> {
        let mut cells = vec![end];
        let mut cursor = end;
        while let Some(&parent) = self.parents.get(&cursor) {
            cells.push(parent);
            cursor = parent;
        }
        cells.reverse();
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safepath_core::Vec3;
    use std::cell::Cell;

    struct OpenField {
        probes: Cell<usize>,
    }

    impl SpatialIndex for OpenField {
        fn is_walkable(&self, _cell: CellCoord, _reference_height: f32) -> bool {
            self.probes.set(self.probes.get() + 1);
            true
        }

        fn is_segment_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
            false
        }
    }

    #[test]
    fn heap_pops_lowest_f_then_oldest() {
        let mut scratch = SearchScratch::default();
        scratch.push(CellCoord::new(0, 0), 10, 10);
        scratch.push(CellCoord::new(1, 0), 5, 5);
        scratch.push(CellCoord::new(2, 0), 0, 10);

        let order: Vec<_> = std::iter::from_fn(|| scratch.open.pop())
            .map(|entry| entry.cell)
            .collect();
        assert_eq!(
            order,
            vec![
                CellCoord::new(1, 0),
                CellCoord::new(2, 0),
                CellCoord::new(0, 0),
            ]
        );
    }

    #[test]
    fn memo_answers_repeated_probes_once() {
        let field = OpenField {
            probes: Cell::new(0),
        };
        let mut memo = OcclusionMemo::default();
        let cell = CellCoord::new(3, 3);

        assert!(memo.is_walkable(&field, cell, 0.0));
        assert!(memo.is_walkable(&field, cell, 0.0));
        assert_eq!(field.probes.get(), 1);

        memo.reset();
        assert!(memo.is_walkable(&field, cell, 0.0));
        assert_eq!(field.probes.get(), 2);
    }

    #[test]
    fn open_field_search_reaches_goal_with_octile_cost() {
        let field = OpenField {
            probes: Cell::new(0),
        };
        let mut scratch = SearchScratch::default();
        let start = CellCoord::new(0, 0);
        let goal = CellCoord::new(4, 2);

        let result = scratch.run(
            &field,
            SearchBounds {
                start,
                goal,
                area: CellBounds::spanning(start, goal).expanded(4),
                height: 0.0,
                max_iterations: 1_000,
            },
        );

        assert_eq!(result.outcome, PathOutcome::Reached);
        assert_eq!(result.end, goal);
        assert_eq!(scratch.best_cost.get(&goal), Some(&start.octile_cost(goal)));
        let cells = scratch.trace(goal);
        assert_eq!(cells.first(), Some(&start));
        assert_eq!(cells.last(), Some(&goal));
        assert_eq!(cells.len(), 5);
    }
}
