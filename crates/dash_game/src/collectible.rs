//! The apple: grid-aligned random placement, a looping frame animation, and
//! the overlap test that counts as a pickup.
//!
//! A placement is accepted when the apple's box is clear of solid tiles and
//! some tile within `max_jump_rows` rows below it is solid, so the apple is
//! always reachable from a standing surface. Placement always terminates:
//! random sampling gives up after `max_placement_attempts`, then every
//! candidate cell is scanned in order, first with both rules and then with
//! only the clearance rule, and as a last resort the top-left candidate is
//! used even if it overlaps terrain.

use dash_core::rect::{PixelRect, Rect};
use rand::Rng;

use crate::config::CollectibleConfig;
use crate::tile_grid::TileGrid;

/// How a spawn position was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Random sample satisfying both rules.
    Random { attempts: u32 },
    /// First cell in scan order satisfying both rules.
    Scanned,
    /// Clear of terrain but with no ground in reach.
    Floating,
    /// No clear cell exists; top-left candidate.
    Forced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    col: i32,
    row: i32,
}

#[derive(Debug, Clone)]
pub struct Collectible {
    pub x: f32,
    pub y: f32,
    pub active: bool,
    spawn_time_ms: u64,
    frame_index: u32,
    frame_timer: u32,
    config: CollectibleConfig,
    world_w: f32,
    world_h: f32,
}

impl Collectible {
    /// Inactive until the first `spawn`.
    pub fn new(config: CollectibleConfig, world: (f32, f32)) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            active: false,
            spawn_time_ms: 0,
            frame_index: 0,
            frame_timer: 0,
            config,
            world_w: world.0,
            world_h: world.1,
        }
    }

    fn size(&self) -> f32 {
        self.config.display_size() as f32
    }

    pub fn bounding_box(&self) -> Rect {
        Rect::new(self.x, self.y, self.size(), self.size())
    }

    pub fn spawn_time(&self) -> u64 {
        self.spawn_time_ms
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn source_rect(&self) -> PixelRect {
        let size = self.config.frame_size;
        PixelRect::new(self.frame_index * size, 0, size, size)
    }

    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        grid: &TileGrid,
        rng: &mut R,
        now_ms: u64,
    ) -> Placement {
        let (cell, placement) = self.choose_cell(grid, rng);
        self.x = (cell.col * grid.tile_px_w()) as f32;
        self.y = (cell.row * grid.tile_px_h()) as f32;
        self.active = true;
        self.spawn_time_ms = now_ms;
        self.frame_index = 0;
        self.frame_timer = 0;

        match placement {
            Placement::Random { attempts } => log::debug!(
                "Apple spawned at ({}, {}) row {} col {} after {} attempt(s)",
                self.x,
                self.y,
                cell.row,
                cell.col,
                attempts
            ),
            Placement::Scanned => log::warn!(
                "Random placement gave up, apple placed by scan at row {} col {}",
                cell.row,
                cell.col
            ),
            Placement::Floating => log::warn!(
                "No reachable cell in level '{}', apple placed without ground at row {} col {}",
                grid.level_id,
                cell.row,
                cell.col
            ),
            Placement::Forced => log::warn!(
                "No clear cell in level '{}', apple forced to row {} col {}",
                grid.level_id,
                cell.row,
                cell.col
            ),
        }
        placement
    }

    fn choose_cell<R: Rng + ?Sized>(&self, grid: &TileGrid, rng: &mut R) -> (Cell, Placement) {
        let tile_w = grid.tile_px_w();
        let tile_h = grid.tile_px_h();
        let min_row = self.config.min_row as i32;
        if tile_w <= 0 || tile_h <= 0 {
            return (Cell { col: 0, row: min_row }, Placement::Forced);
        }

        let size = self.size() as i32;
        let max_col = ((self.world_w as i32 - size) / tile_w).max(0);
        let max_row = ((self.world_h as i32 - size) / tile_h).max(min_row);

        for attempt in 1..=self.config.max_placement_attempts {
            let cell = Cell {
                col: rng.random_range(0..=max_col),
                row: rng.random_range(min_row..=max_row),
            };
            if self.is_clear(grid, cell) && self.has_ground_below(grid, cell) {
                return (cell, Placement::Random { attempts: attempt });
            }
        }

        let candidates = || {
            (min_row..=max_row).flat_map(move |row| (0..=max_col).map(move |col| Cell { col, row }))
        };
        if let Some(cell) =
            candidates().find(|&cell| self.is_clear(grid, cell) && self.has_ground_below(grid, cell))
        {
            return (cell, Placement::Scanned);
        }
        if let Some(cell) = candidates().find(|&cell| self.is_clear(grid, cell)) {
            return (cell, Placement::Floating);
        }
        (Cell { col: 0, row: min_row }, Placement::Forced)
    }

    fn box_at_cell(&self, grid: &TileGrid, col: i32, row: i32) -> Rect {
        Rect::new(
            (col * grid.tile_px_w()) as f32,
            (row * grid.tile_px_h()) as f32,
            self.size(),
            self.size(),
        )
    }

    fn is_clear(&self, grid: &TileGrid, cell: Cell) -> bool {
        !grid.is_colliding(self.box_at_cell(grid, cell.col, cell.row))
    }

    /// Solid terrain under the cell within jump reach.
    fn has_ground_below(&self, grid: &TileGrid, cell: Cell) -> bool {
        let last_row = (cell.row + self.config.max_jump_rows as i32).min(grid.rows() as i32 - 1);
        ((cell.row + 1)..=last_row)
            .any(|row| grid.is_colliding(self.box_at_cell(grid, cell.col, row)))
    }

    /// Advance the animation. With `respawn_after` set, an apple left for that
    /// long moves itself; returns `true` when that happened.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        grid: &TileGrid,
        rng: &mut R,
        now_ms: u64,
        respawn_after: Option<u64>,
    ) -> bool {
        if !self.active {
            return false;
        }

        self.frame_timer += 1;
        if self.frame_timer >= self.config.frame_delay {
            self.frame_index = (self.frame_index + 1) % self.config.frame_count.max(1);
            self.frame_timer = 0;
        }

        match respawn_after {
            Some(timeout) if now_ms.saturating_sub(self.spawn_time_ms) >= timeout => {
                log::info!("Apple timed out after {timeout}ms, respawning");
                self.spawn(grid, rng, now_ms);
                true
            }
            _ => false,
        }
    }

    /// Strict overlap with the actor's box; touching edges do not count.
    pub fn is_collected(&self, actor: &Rect) -> bool {
        self.active && actor.intersects(&self.bounding_box())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Push the spawn stamp forward, e.g. by the time spent paused.
    pub fn extend_lifetime(&mut self, ms: u64) {
        self.spawn_time_ms = self.spawn_time_ms.saturating_add(ms);
    }
}
