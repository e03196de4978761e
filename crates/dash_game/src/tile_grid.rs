//! Tile map: the level's collision oracle and its tile render list.
//!
//! The map is a fixed `rows x cols` table of tile IDs. ID 0 is empty; every
//! other ID is solid and doubles as an index into the tileset atlas
//! (`id mod atlas_cols`, `id div atlas_cols`). The grid is built once at level
//! load and never mutated afterwards.
//!
//! Collision queries take pixel-space rectangles. The rectangle is mapped to
//! an inclusive tile index range, clamped to the grid, and scanned. Space
//! outside the grid is open: a rectangle hanging off the edge only collides
//! with the cells it covers inside the map.

use std::fs;
use std::path::Path;

use dash_core::rect::{PixelRect, Rect};
use serde::Deserialize;

use crate::config::TileMetrics;

pub const EMPTY_TILE: u32 = 0;

const LEVEL_FILE_VERSION: &str = "0.1";

const G: u32 = 4; // gold brick, atlas row 1 col 0
const D: u32 = 6; // dirt block, atlas row 1 col 2

/// Built-in level used when no level file is present.
#[rustfmt::skip]
const BUILTIN_LAYOUT: [[u32; 22]; 11] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, G, G, G, G, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, G, G, 0, 0, 0, 0, G, G, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, G, G, G, 0, 0, 0, 0, 0, 0, 0, 0, G, G, G, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, G, G, G, G, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [G, G, G, G, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, G, G, G, G],
    [D, D, 0, 0, 0, 0, D, D, D, D, D, D, D, D, D, D, D, D, D, D, D, D],
    [G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G, G],
];

#[derive(Debug, Deserialize, Clone)]
pub struct LevelFile {
    pub version: String,
    pub level_id: String,
    pub rows: usize,
    pub cols: usize,
    /// Row-major tile IDs, `rows` rows of `cols` entries.
    pub tiles: Vec<Vec<u32>>,
}

/// Source/destination pair for one visible tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSprite {
    pub src: PixelRect,
    pub dst: Rect,
}

#[derive(Debug, Clone)]
pub struct TileGrid {
    pub level_id: String,
    pub metrics: TileMetrics,
    rows: usize,
    cols: usize,
    tiles: Vec<u32>,
}

impl TileGrid {
    /// Builds a grid from a parsed level file. The table must be rectangular
    /// and match the declared `rows` x `cols`, so `tile_at` can index it.
    pub fn from_file(file: LevelFile, metrics: TileMetrics) -> Result<Self, String> {
        validate_level_file(&file, &metrics)?;
        let tiles = file.tiles.into_iter().flatten().collect();
        Ok(Self {
            level_id: file.level_id,
            metrics,
            rows: file.rows,
            cols: file.cols,
            tiles,
        })
    }

    pub fn builtin(metrics: TileMetrics) -> Self {
        Self {
            level_id: "builtin".to_string(),
            metrics,
            rows: BUILTIN_LAYOUT.len(),
            cols: BUILTIN_LAYOUT[0].len(),
            tiles: BUILTIN_LAYOUT.iter().flatten().copied().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// On-screen tile width in pixels (`tile_width * scale`).
    pub fn tile_px_w(&self) -> i32 {
        (self.metrics.tile_width * self.metrics.scale) as i32
    }

    /// On-screen tile height in pixels (`tile_height * scale`).
    pub fn tile_px_h(&self) -> i32 {
        (self.metrics.tile_height * self.metrics.scale) as i32
    }

    /// Tile ID at `(row, col)`; cells outside the grid read as empty.
    pub fn tile_at(&self, row: i32, col: i32) -> u32 {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return EMPTY_TILE;
        }
        self.tiles[row as usize * self.cols + col as usize]
    }

    pub fn is_solid(&self, row: i32, col: i32) -> bool {
        self.tile_at(row, col) != EMPTY_TILE
    }

    /// Tile row containing pixel row `y`.
    pub fn row_at(&self, y: f32) -> i32 {
        let tile_h = self.tile_px_h();
        if tile_h <= 0 {
            return 0;
        }
        (y.floor() as i32).div_euclid(tile_h)
    }

    /// True if any grid cell touched by `rect` holds a solid tile.
    pub fn is_colliding(&self, rect: Rect) -> bool {
        let tile_w = self.tile_px_w();
        let tile_h = self.tile_px_h();
        if tile_w <= 0 || tile_h <= 0 || self.rows == 0 || self.cols == 0 {
            return false;
        }

        let x = rect.x.floor() as i32;
        let y = rect.y.floor() as i32;
        let w = rect.w as i32;
        let h = rect.h as i32;
        if w <= 0 || h <= 0 {
            return false;
        }

        let left = x.div_euclid(tile_w).max(0);
        let right = (x + w - 1).div_euclid(tile_w).min(self.cols as i32 - 1);
        let top = y.div_euclid(tile_h).max(0);
        let bottom = (y + h - 1).div_euclid(tile_h).min(self.rows as i32 - 1);

        for row in top..=bottom {
            for col in left..=right {
                if self.is_solid(row, col) {
                    return true;
                }
            }
        }
        false
    }

    /// Atlas region for a tile ID.
    pub fn tile_source_rect(&self, tile_id: u32) -> PixelRect {
        let cols = self.metrics.atlas_cols.max(1);
        PixelRect::new(
            (tile_id % cols) * self.metrics.tile_width,
            (tile_id / cols) * self.metrics.tile_height,
            self.metrics.tile_width,
            self.metrics.tile_height,
        )
    }

    /// Render list for every non-empty cell, row by row.
    pub fn tile_sprites(&self) -> impl Iterator<Item = TileSprite> + '_ {
        let tile_w = self.tile_px_w() as f32;
        let tile_h = self.tile_px_h() as f32;
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, &id)| id != EMPTY_TILE)
            .map(move |(index, &id)| {
                let row = index / self.cols;
                let col = index % self.cols;
                TileSprite {
                    src: self.tile_source_rect(id),
                    dst: Rect::new(col as f32 * tile_w, row as f32 * tile_h, tile_w, tile_h),
                }
            })
    }

    pub fn solid_count(&self) -> usize {
        self.tiles.iter().filter(|&&id| id != EMPTY_TILE).count()
    }
}

pub fn load_level_from_path(path: &Path, metrics: TileMetrics) -> Result<TileGrid, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let file: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", path.display()))?;
    TileGrid::from_file(file, metrics)
}

fn validate_level_file(file: &LevelFile, metrics: &TileMetrics) -> Result<(), String> {
    if file.version != LEVEL_FILE_VERSION {
        return Err(format!(
            "Level validation failed: unsupported version '{}'",
            file.version
        ));
    }
    if file.rows == 0 || file.cols == 0 {
        return Err("Level validation failed: rows and cols must be > 0".to_string());
    }
    if file.tiles.len() != file.rows {
        return Err(format!(
            "Level validation failed: expected {} rows, found {}",
            file.rows,
            file.tiles.len()
        ));
    }

    let atlas_tiles = metrics.atlas_cols * metrics.atlas_rows;
    for (row, cells) in file.tiles.iter().enumerate() {
        if cells.len() != file.cols {
            return Err(format!(
                "Level validation failed: row {} has {} cells, expected {}",
                row,
                cells.len(),
                file.cols
            ));
        }
        for (col, &id) in cells.iter().enumerate() {
            if id >= atlas_tiles {
                return Err(format!(
                    "Level validation failed: tile id {} at ({}, {}) is outside the {}-tile atlas",
                    id, row, col, atlas_tiles
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "dash_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    /// 4x4 grid, 64px tiles, single solid cell at row 1 col 2.
    fn single_block_grid() -> TileGrid {
        TileGrid::from_file(
            LevelFile {
                version: "0.1".to_string(),
                level_id: "test".to_string(),
                rows: 4,
                cols: 4,
                tiles: vec![
                    vec![0, 0, 0, 0],
                    vec![0, 0, 5, 0],
                    vec![0, 0, 0, 0],
                    vec![0, 0, 0, 0],
                ],
            },
            TileMetrics::default(),
        )
        .expect("test level is valid")
    }

    #[test]
    fn rect_inside_empty_cells_does_not_collide() {
        let grid = single_block_grid();
        assert!(!grid.is_colliding(Rect::new(0.0, 0.0, 64.0, 64.0)));
        assert!(!grid.is_colliding(Rect::new(10.0, 140.0, 100.0, 50.0)));
        // Flush against the block's left and top edges without entering it.
        assert!(!grid.is_colliding(Rect::new(64.0, 64.0, 64.0, 64.0)));
        assert!(!grid.is_colliding(Rect::new(128.0, 0.0, 64.0, 64.0)));
    }

    #[test]
    fn rect_overlapping_solid_cell_collides() {
        let grid = single_block_grid();
        assert!(grid.is_colliding(Rect::new(128.0, 64.0, 64.0, 64.0)));
        assert!(grid.is_colliding(Rect::new(100.0, 100.0, 30.0, 30.0)));
        assert!(grid.is_colliding(Rect::new(191.0, 127.0, 1.0, 1.0)));
        assert!(grid.is_colliding(Rect::new(0.0, 0.0, 256.0, 256.0)));
    }

    #[test]
    fn outside_of_grid_is_open() {
        let grid = single_block_grid();
        assert!(!grid.is_colliding(Rect::new(-200.0, -200.0, 64.0, 64.0)));
        assert!(!grid.is_colliding(Rect::new(300.0, 0.0, 64.0, 64.0)));
        assert!(!grid.is_colliding(Rect::new(0.0, 300.0, 64.0, 64.0)));
        // Partially off-grid rect still sees the block it covers.
        assert!(grid.is_colliding(Rect::new(150.0, -10.0, 64.0, 100.0)));
    }

    #[test]
    fn zero_tile_size_never_collides() {
        let mut grid = single_block_grid();
        grid.metrics.scale = 0;
        assert!(!grid.is_colliding(Rect::new(128.0, 64.0, 64.0, 64.0)));
        assert_eq!(grid.row_at(100.0), 0);
    }

    #[test]
    fn empty_rect_never_collides() {
        let grid = single_block_grid();
        assert!(!grid.is_colliding(Rect::new(140.0, 80.0, 0.0, 10.0)));
    }

    #[test]
    fn builtin_layout_has_solid_floor() {
        let grid = TileGrid::builtin(TileMetrics::default());
        assert_eq!(grid.rows(), 11);
        assert_eq!(grid.cols(), 22);
        for col in 0..22 {
            assert!(grid.is_solid(10, col), "floor column {col} should be solid");
        }
        assert!(!grid.is_solid(0, 0));
    }

    #[test]
    fn tile_sprites_use_atlas_and_screen_coordinates() {
        let grid = single_block_grid();
        let sprites: Vec<TileSprite> = grid.tile_sprites().collect();
        assert_eq!(sprites.len(), 1);
        // id 5 in a 4-column atlas: col 1, row 1.
        assert_eq!(sprites[0].src, PixelRect::new(16, 16, 16, 16));
        assert_eq!(sprites[0].dst, Rect::new(128.0, 64.0, 64.0, 64.0));
    }

    #[test]
    fn row_at_uses_scaled_tile_height() {
        let grid = single_block_grid();
        assert_eq!(grid.row_at(0.0), 0);
        assert_eq!(grid.row_at(63.9), 0);
        assert_eq!(grid.row_at(64.0), 1);
        assert_eq!(grid.row_at(-1.0), -1);
    }

    #[test]
    fn load_level_valid_file_parses() {
        let path = temp_file_path("valid");
        fs::write(
            &path,
            r#"{
              "version": "0.1",
              "level_id": "test",
              "rows": 2,
              "cols": 3,
              "tiles": [[0, 0, 0], [4, 4, 6]]
            }"#,
        )
        .expect("write temp file");

        let grid = load_level_from_path(&path, TileMetrics::default()).expect("level should load");
        assert_eq!(grid.level_id, "test");
        assert_eq!(grid.solid_count(), 3);
        assert!(grid.is_solid(1, 2));
        assert!(!grid.is_solid(0, 2));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_level_rejects_ragged_rows() {
        let path = temp_file_path("ragged");
        fs::write(
            &path,
            r#"{
              "version": "0.1",
              "level_id": "test",
              "rows": 2,
              "cols": 3,
              "tiles": [[0, 0, 0], [4, 4]]
            }"#,
        )
        .expect("write temp file");

        let err = load_level_from_path(&path, TileMetrics::default())
            .expect_err("ragged rows should fail");
        assert!(err.contains("row 1 has 2 cells"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn ragged_table_is_rejected_before_indexing() {
        let ragged = LevelFile {
            version: "0.1".to_string(),
            level_id: "ragged".to_string(),
            rows: 3,
            cols: 4,
            tiles: vec![vec![0, 0, 0, 0], vec![4, 4], vec![0, 0, 0, 0]],
        };
        let err = TileGrid::from_file(ragged, TileMetrics::default())
            .expect_err("short row should fail");
        assert!(err.contains("row 1 has 2 cells"));

        let missing_row = LevelFile {
            version: "0.1".to_string(),
            level_id: "short".to_string(),
            rows: 3,
            cols: 2,
            tiles: vec![vec![4, 4], vec![4, 4]],
        };
        let err = TileGrid::from_file(missing_row, TileMetrics::default())
            .expect_err("missing row should fail");
        assert!(err.contains("expected 3 rows, found 2"));
    }

    #[test]
    fn load_level_rejects_tile_outside_atlas() {
        let path = temp_file_path("atlas");
        fs::write(
            &path,
            r#"{
              "version": "0.1",
              "level_id": "test",
              "rows": 1,
              "cols": 2,
              "tiles": [[0, 16]]
            }"#,
        )
        .expect("write temp file");

        let err = load_level_from_path(&path, TileMetrics::default())
            .expect_err("tile id 16 does not fit a 4x4 atlas");
        assert!(err.contains("outside the 16-tile atlas"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_level_missing_file_reports_path() {
        let path = temp_file_path("missing");
        let err = load_level_from_path(&path, TileMetrics::default())
            .expect_err("missing file should fail");
        assert!(err.contains("Failed to read"));
    }
}
