use std::f64::consts::SQRT_2;
use std::fs;

use anyhow::{anyhow, bail, Context, Result};

/// Movement model, fixed when the map is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementType {
    /// 4-connected, unit cost per move.
    Manhattan,
    /// 8-connected, diagonals cost sqrt(2).
    Octile,
}

const CARDINAL_DIRECTIONS: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const DIAGONAL_DIRECTIONS: [(i64, i64); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    neighbors: Vec<(usize, usize)>,
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

/// Immutable rectangular grid. Shared read-only by every component for the
/// lifetime of a solve.
#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub movement: MovementType,
    grid: Vec<Vec<Tile>>,
}

impl Map {
    pub fn from_file(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading map file {path}"))?;
        Self::from_str(&text).with_context(|| format!("parsing map file {path}"))
    }

    /// Parses the map format: `type <movement>`, `height <H>`, `width <W>`,
    /// `map`, then H rows of W characters where `.` is passable and any
    /// other character an obstacle.
    pub fn from_str(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let movement = match header_value(lines.next(), "type")? {
            "manhattan" => MovementType::Manhattan,
            "octile" => MovementType::Octile,
            other => bail!("unknown movement type {other:?}"),
        };
        let height: usize = header_value(lines.next(), "height")?
            .parse()
            .context("parsing map height")?;
        let width: usize = header_value(lines.next(), "width")?
            .parse()
            .context("parsing map width")?;
        let map_marker = lines.next().ok_or_else(|| anyhow!("missing map marker"))?;
        if map_marker.trim() != "map" {
            bail!("expected `map` marker, found {map_marker:?}");
        }

        let mut grid = Vec::with_capacity(height);
        for row in 0..height {
            let line = lines
                .next()
                .ok_or_else(|| anyhow!("missing map row {row}"))?;
            let tiles: Vec<Tile> = line
                .chars()
                .take(width)
                .map(|ch| Tile {
                    passable: ch == '.',
                    neighbors: Vec::new(),
                })
                .collect();
            if tiles.len() != width {
                bail!("map row {row} has {} cells, expected {width}", tiles.len());
            }
            grid.push(tiles);
        }

        let mut map = Map {
            height,
            width,
            movement,
            grid,
        };
        map.initialize_neighbors();
        Ok(map)
    }

    fn initialize_neighbors(&mut self) {
        for row in 0..self.height {
            for col in 0..self.width {
                if self.grid[row][col].passable {
                    self.grid[row][col].neighbors = self.compute_neighbors(row, col);
                }
            }
        }
    }

    fn compute_neighbors(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        let directions: Vec<(i64, i64)> = match self.movement {
            MovementType::Manhattan => CARDINAL_DIRECTIONS.to_vec(),
            MovementType::Octile => CARDINAL_DIRECTIONS
                .iter()
                .chain(DIAGONAL_DIRECTIONS.iter())
                .copied()
                .collect(),
        };

        let mut neighbors = Vec::new();
        for (drow, dcol) in directions {
            let new_row = row as i64 + drow;
            let new_col = col as i64 + dcol;
            if new_row >= 0
                && new_col >= 0
                && new_row < self.height as i64
                && new_col < self.width as i64
                && self.grid[new_row as usize][new_col as usize].passable
            {
                neighbors.push((new_row as usize, new_col as usize));
            }
        }
        neighbors
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width
    }

    /// Out-of-bounds cells are not obstacles; bounds are checked separately.
    pub fn is_obstacle(&self, row: usize, col: usize) -> bool {
        self.in_bounds(row, col) && !self.grid[row][col].passable
    }

    pub fn is_passable(&self, row: usize, col: usize) -> bool {
        self.in_bounds(row, col) && self.grid[row][col].passable
    }

    /// In-bounds, non-obstacle cells reachable in one move. Waiting is the
    /// planner's business, not the map's.
    pub fn get_neighbors(&self, row: usize, col: usize) -> &[(usize, usize)] {
        &self.grid[row][col].neighbors
    }

    /// 1.0 for cardinal moves, sqrt(2) for octile diagonals, infinite when
    /// the target is blocked or out of bounds.
    pub fn move_cost(&self, row1: usize, col1: usize, row2: usize, col2: usize) -> f64 {
        if !self.is_passable(row2, col2) || !self.in_bounds(row1, col1) {
            return f64::INFINITY;
        }

        let drow = row1.abs_diff(row2);
        let dcol = col1.abs_diff(col2);
        match self.movement {
            MovementType::Manhattan if drow + dcol == 1 => 1.0,
            MovementType::Octile if drow + dcol == 1 => 1.0,
            MovementType::Octile if drow == 1 && dcol == 1 => SQRT_2,
            _ => f64::INFINITY,
        }
    }

    /// Admissible and consistent under the configured movement model.
    pub fn heuristic(&self, row1: usize, col1: usize, row2: usize, col2: usize) -> f64 {
        let drow = row1.abs_diff(row2) as f64;
        let dcol = col1.abs_diff(col2) as f64;
        match self.movement {
            MovementType::Manhattan => drow + dcol,
            MovementType::Octile => drow.max(dcol) + (SQRT_2 - 1.0) * drow.min(dcol),
        }
    }
}

fn header_value<'a>(line: Option<&'a str>, label: &str) -> Result<&'a str> {
    let line = line.ok_or_else(|| anyhow!("missing `{label}` header"))?;
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some(found) if found == label => {}
        other => bail!("expected `{label}` header, found {other:?}"),
    }
    parts
        .next()
        .ok_or_else(|| anyhow!("`{label}` header has no value"))
}
