//! Breadth-first navigation over a [`BlockWorld`].
//!
//! The route ends at the nearest passable cell within `reach` (Chebyshev
//! distance) of the goal, never on the goal itself. The worker advances up
//! to `speed` cells per tick. If the next step has become blocked since the
//! route was planned, the route is planned again from the current position.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use colony_types::Coordinate;

use crate::traits::{BlockWorld, Navigator};

/// Upper bound on cells visited by one search.
pub const DEFAULT_SEARCH_LIMIT: usize = 32_768;

/// [`Navigator`] implementation using breadth-first search over the six
/// face neighbours of each cell.
#[derive(Debug, Clone)]
pub struct GridNavigator {
    position: Coordinate,
    reach: u32,
    speed: u32,
    search_limit: usize,
    goal: Option<Coordinate>,
    route: VecDeque<Coordinate>,
    unreachable: bool,
}

impl GridNavigator {
    /// A navigator standing at `position`.
    pub const fn new(position: Coordinate, reach: u32, speed: u32) -> Self {
        Self {
            position,
            reach,
            speed: if speed == 0 { 1 } else { speed },
            search_limit: DEFAULT_SEARCH_LIMIT,
            goal: None,
            route: VecDeque::new(),
            unreachable: false,
        }
    }

    /// The current goal, if any.
    pub const fn goal(&self) -> Option<Coordinate> {
        self.goal
    }

    /// Cells left on the planned route.
    pub fn remaining_steps(&self) -> usize {
        self.route.len()
    }

    fn within_reach(&self, pos: Coordinate, goal: Coordinate) -> bool {
        pos != goal && pos.chebyshev_distance(goal) <= self.reach
    }

    /// Plan from the current position. Returns `false` if no route exists.
    fn plan(&mut self, world: &dyn BlockWorld, goal: Coordinate) -> bool {
        self.route.clear();
        if self.within_reach(self.position, goal) {
            return true;
        }

        let start = self.position;
        let mut prev: BTreeMap<Coordinate, Coordinate> = BTreeMap::new();
        let mut visited = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut found = None;

        while let Some(current) = queue.pop_front() {
            if visited.len() > self.search_limit {
                break;
            }
            for next in current.neighbors() {
                if !world.is_passable(next) || !visited.insert(next) {
                    continue;
                }
                prev.insert(next, current);
                if self.within_reach(next, goal) {
                    found = Some(next);
                    break;
                }
                queue.push_back(next);
            }
            if found.is_some() {
                break;
            }
        }

        let Some(end) = found else {
            debug!(from = %start, %goal, visited = visited.len(), "No route to goal");
            return false;
        };

        let mut current = end;
        self.route.push_front(current);
        while let Some(&step) = prev.get(&current) {
            if step == start {
                break;
            }
            self.route.push_front(step);
            current = step;
        }
        true
    }
}

impl Navigator for GridNavigator {
    fn position(&self) -> Coordinate {
        self.position
    }

    fn try_set_goal(&mut self, world: &dyn BlockWorld, goal: Coordinate) {
        self.goal = Some(goal);
        self.unreachable = !self.plan(world, goal);
    }

    fn has_reached_goal(&self) -> bool {
        self.goal
            .is_some_and(|goal| self.within_reach(self.position, goal))
    }

    fn tick(&mut self, world: &dyn BlockWorld) {
        let Some(goal) = self.goal else {
            return;
        };
        if self.unreachable {
            return;
        }

        for _ in 0..self.speed {
            let Some(&next) = self.route.front() else {
                break;
            };
            if !world.is_passable(next) {
                if !self.plan(world, goal) {
                    self.unreachable = true;
                }
                break;
            }
            self.route.pop_front();
            self.position = next;
        }
    }

    fn is_path_unreachable(&self) -> bool {
        self.unreachable
    }

    fn reset(&mut self) {
        self.goal = None;
        self.route.clear();
        self.unreachable = false;
    }
}
