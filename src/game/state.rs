use std::collections::VecDeque;

use super::action::Direction;

/// A cell on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Neighbouring cell one step towards `direction`
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Snake body, head at the front of the deque
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    body: VecDeque<Position>,
    pub direction: Direction,
}

impl Snake {
    /// Lay out `length` segments trailing behind `head`
    pub fn new(head: Position, direction: Direction, length: usize) -> Self {
        let behind = match direction {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        };
        let body = std::iter::successors(Some(head), |p| Some(p.step(behind)))
            .take(length.max(1))
            .collect();
        Self { body, direction }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Segments from head to tail
    pub fn segments(&self) -> impl Iterator<Item = &Position> {
        self.body.iter()
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Whether moving the head onto `pos` bites the body.
    /// The tail cell is vacated on a non-growing move, so it only counts when growing.
    pub fn would_bite(&self, pos: Position, growing: bool) -> bool {
        let checked = if growing {
            self.body.len()
        } else {
            self.body.len() - 1
        };
        self.body.iter().take(checked).any(|&p| p == pos)
    }

    /// Push a new head in the current direction, dropping the tail unless growing
    pub fn advance(&mut self, grow: bool) {
        let new_head = self.head().step(self.direction);
        self.body.push_front(new_head);
        if !grow {
            self.body.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Type of collision that ended an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionType {
    Wall,
    SelfCollision,
}

/// Complete game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub snake: Snake,
    /// `None` once the snake fills the whole board
    pub food: Option<Position>,
    pub grid_width: usize,
    pub grid_height: usize,
    pub score: u32,
    pub steps: u32,
    pub is_alive: bool,
}

impl GameState {
    pub fn new(snake: Snake, food: Option<Position>, grid_width: usize, grid_height: usize) -> Self {
        Self {
            snake,
            food,
            grid_width,
            grid_height,
            score: 0,
            steps: 0,
            is_alive: true,
        }
    }

    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.x < self.grid_width as i32
            && pos.y >= 0
            && pos.y < self.grid_height as i32
    }

    /// Cells not covered by the snake, row-major
    pub fn free_cells(&self) -> Vec<Position> {
        (0..self.grid_height as i32)
            .flat_map(|y| (0..self.grid_width as i32).map(move |x| Position::new(x, y)))
            .filter(|&p| !self.snake.occupies(p))
            .collect()
    }
}
