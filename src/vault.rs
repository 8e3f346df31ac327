//! Solver for the vault antechamber.
//!
//! The antechamber floor is a 4×4 grid of tiles. The orb starts on the
//! south-west tile weighing 22 and must arrive at the north-east vault
//! door weighing 30. Number tiles combine with the operation tile just
//! crossed; the orb shatters if its weight ever drops to zero or below,
//! and returning to the starting tile resets it. A breadth-first search
//! over (position, weight) finds a shortest walk.

use log::debug;
use std::collections::{HashSet, VecDeque};
use std::fmt;

pub const INITIAL_WEIGHT: i32 = 22;
pub const TARGET_WEIGHT: i32 = 30;

/// Weights can only grow so far before no subtraction chain can bring
/// them back; pruning here keeps the search space finite
const WEIGHT_LIMIT: i32 = 32767;

const GRID_SIZE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridOp {
    Add,
    Sub,
    Mul,
}

impl GridOp {
    fn apply(self, weight: i32, value: i32) -> i32 {
        match self {
            GridOp::Add => weight + value,
            GridOp::Sub => weight - value,
            GridOp::Mul => weight * value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tile {
    /// The orb's starting tile; stepping back onto it resets the orb
    Start,
    Number(i32),
    Op(GridOp),
    /// The vault door, with the value its lock applies
    Door(i32),
}

/// The antechamber as etched on the floor, rows south to north
const GRID: [[Tile; 4]; 4] = [
    [
        Tile::Start,
        Tile::Op(GridOp::Sub),
        Tile::Number(9),
        Tile::Op(GridOp::Mul),
    ],
    [
        Tile::Op(GridOp::Add),
        Tile::Number(4),
        Tile::Op(GridOp::Sub),
        Tile::Number(18),
    ],
    [
        Tile::Number(4),
        Tile::Op(GridOp::Mul),
        Tile::Number(11),
        Tile::Op(GridOp::Mul),
    ],
    [
        Tile::Op(GridOp::Mul),
        Tile::Number(8),
        Tile::Op(GridOp::Sub),
        Tile::Door(1),
    ],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// Exploration (and tie-break) order
const DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Breadth-first search for a shortest walk from the starting tile to the
/// door that arrives at the target weight. The first complete path found
/// is shortest; ties break in N, E, S, W order.
pub fn find_shortest_path() -> Result<Vec<Direction>, String> {
    let mut queue: VecDeque<(i32, i32, i32, Vec<Direction>)> = VecDeque::new();
    let mut visited: HashSet<(i32, i32, i32)> = HashSet::new();

    queue.push_back((0, 0, INITIAL_WEIGHT, Vec::new()));
    visited.insert((0, 0, INITIAL_WEIGHT));

    while let Some((x, y, weight, path)) = queue.pop_front() {
        for direction in DIRECTIONS {
            let (dx, dy) = direction.delta();
            let (nx, ny) = (x + dx, y + dy);
            if !(0..GRID_SIZE).contains(&nx) || !(0..GRID_SIZE).contains(&ny) {
                continue;
            }

            match GRID[ny as usize][nx as usize] {
                Tile::Start => continue,
                Tile::Op(_) => {
                    if visited.insert((nx, ny, weight)) {
                        let mut next_path = path.clone();
                        next_path.push(direction);
                        queue.push_back((nx, ny, weight, next_path));
                    }
                }
                Tile::Number(value) => {
                    // number tiles always follow an operation tile on this
                    // grid, starting tile excepted
                    let Tile::Op(op) = GRID[y as usize][x as usize] else {
                        continue;
                    };
                    let next_weight = op.apply(weight, value);
                    if next_weight <= 0 || next_weight > WEIGHT_LIMIT {
                        continue;
                    }
                    if visited.insert((nx, ny, next_weight)) {
                        let mut next_path = path.clone();
                        next_path.push(direction);
                        queue.push_back((nx, ny, next_weight, next_path));
                    }
                }
                Tile::Door(value) => {
                    let Tile::Op(op) = GRID[y as usize][x as usize] else {
                        continue;
                    };
                    let final_weight = op.apply(weight, value);
                    if final_weight == TARGET_WEIGHT {
                        let mut next_path = path.clone();
                        next_path.push(direction);
                        debug!("vault path found in {} moves", next_path.len());
                        return Ok(next_path);
                    }
                    // wrong weight: the orb vanishes at the door, so this
                    // branch ends here
                }
            }
        }
    }

    Err("no walk through the antechamber reaches the door at the target weight".to_string())
}
