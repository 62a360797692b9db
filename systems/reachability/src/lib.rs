#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first reachability and step-path planning over the battlefield grid.
//!
//! Both searches expand neighbours in the fixed order `+x, -x, +y, -y`, so the
//! emission order of [`ReachableSet`] and the shape of every [`step_path`] are
//! deterministic for a given occupancy snapshot.

use std::collections::{HashSet, VecDeque};

use skirmish_core::{CellCoord, GridBounds};

const UNVISITED: u32 = u32::MAX;

/// Cells a unit may end its movement on, in breadth-first emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReachableSet {
    order: Vec<CellCoord>,
    members: HashSet<CellCoord>,
}

impl ReachableSet {
    /// Reports whether `cell` can be reached.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.members.contains(&cell)
    }

    /// Iterator over the reachable cells in emission order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.order.iter().copied()
    }

    /// Number of reachable cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Reports whether no cell can be reached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Picks the cell, `origin` included, that minimises the Manhattan
    /// distance to `goal`.
    ///
    /// Ties keep the earliest candidate: `origin` first, then emission order.
    #[must_use]
    pub fn closest_to(&self, origin: CellCoord, goal: CellCoord) -> CellCoord {
        let mut best = origin;
        let mut best_distance = origin.manhattan_distance(goal);
        for cell in self.iter() {
            let distance = cell.manhattan_distance(goal);
            if distance < best_distance {
                best = cell;
                best_distance = distance;
            }
        }
        best
    }

    fn record(&mut self, cell: CellCoord) {
        if self.members.insert(cell) {
            self.order.push(cell);
        }
    }
}

/// Computes every cell reachable from `origin` within `budget` orthogonal steps.
///
/// `occupied` must not contain `origin`; occupied cells are neither entered nor
/// stepped through. The origin itself is never part of the result.
#[must_use]
pub fn reachable_cells(
    origin: CellCoord,
    budget: u32,
    bounds: GridBounds,
    occupied: &HashSet<CellCoord>,
) -> ReachableSet {
    let mut reachable = ReachableSet::default();
    let Some(mut search) = Search::start(origin, bounds) else {
        return reachable;
    };

    while let Some((cell, distance)) = search.queue.pop_front() {
        if distance > 0 {
            reachable.record(cell);
        }

        if distance >= budget {
            continue;
        }

        search.expand(cell, distance, occupied);
    }

    reachable
}

/// Plans the deterministic orthogonal route from `origin` to `destination`.
///
/// The returned cells exclude `origin` and end on `destination`. Returns
/// `None` when the destination cannot be reached within `budget` steps or
/// coincides with the origin.
#[must_use]
pub fn step_path(
    origin: CellCoord,
    destination: CellCoord,
    budget: u32,
    bounds: GridBounds,
    occupied: &HashSet<CellCoord>,
) -> Option<Vec<CellCoord>> {
    if origin == destination || !bounds.contains(destination) {
        return None;
    }

    let mut search = Search::start(origin, bounds)?;
    while let Some((cell, distance)) = search.queue.pop_front() {
        if cell == destination {
            return search.trace_back(destination);
        }

        if distance >= budget {
            continue;
        }

        search.expand(cell, distance, occupied);
    }

    None
}

#[derive(Debug)]
struct Search {
    bounds: GridBounds,
    width: usize,
    distances: Vec<u32>,
    parents: Vec<Option<CellCoord>>,
    queue: VecDeque<(CellCoord, u32)>,
}

impl Search {
    fn start(origin: CellCoord, bounds: GridBounds) -> Option<Self> {
        if !bounds.contains(origin) {
            return None;
        }

        let width = usize::try_from(bounds.columns()).ok()?;
        let cell_count = bounds.cell_count();
        let mut search = Self {
            bounds,
            width,
            distances: vec![UNVISITED; cell_count],
            parents: vec![None; cell_count],
            queue: VecDeque::new(),
        };

        let origin_index = index(width, origin)?;
        search.distances[origin_index] = 0;
        search.queue.push_back((origin, 0));
        Some(search)
    }

    fn expand(&mut self, cell: CellCoord, distance: u32, occupied: &HashSet<CellCoord>) {
        let next_distance = distance + 1;
        for neighbor in self.bounds.neighbors(cell) {
            if occupied.contains(&neighbor) {
                continue;
            }

            let Some(neighbor_index) = index(self.width, neighbor) else {
                continue;
            };

            if self.distances[neighbor_index] != UNVISITED {
                continue;
            }

            self.distances[neighbor_index] = next_distance;
            self.parents[neighbor_index] = Some(cell);
            self.queue.push_back((neighbor, next_distance));
        }
    }

    fn trace_back(&self, destination: CellCoord) -> Option<Vec<CellCoord>> {
        let mut path = Vec::new();
        let mut cursor = destination;
        while let Some(parent) = self.parents[index(self.width, cursor)?] {
            path.push(cursor);
            cursor = parent;
        }
        path.reverse();
        Some(path)
    }
}

fn index(width: usize, cell: CellCoord) -> Option<usize> {
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
