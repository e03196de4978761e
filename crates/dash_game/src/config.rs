//! Game configuration loaded from `assets/config/game.json`.
//!
//! Every field has a default, so the file may be absent or partial. Values
//! that would break the simulation (zero-sized tiles, an empty spawn band,
//! volume bounds out of order) are rejected at load time.

use std::fs;
use std::path::Path;

use dash_core::animation::{AnimationSet, AnimationTag};
use serde::Deserialize;

pub const MAX_VOLUME: u8 = 128;

/// Tile sizes for the tileset atlas and the on-screen grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TileMetrics {
    pub tile_width: u32,
    pub tile_height: u32,
    /// Integer scale from atlas pixels to screen pixels.
    pub scale: u32,
    pub atlas_cols: u32,
    pub atlas_rows: u32,
}

impl Default for TileMetrics {
    fn default() -> Self {
        Self {
            tile_width: 16,
            tile_height: 16,
            scale: 4,
            atlas_cols: 4,
            atlas_rows: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    pub gravity: f32,
    /// Initial vertical velocity of a jump; negative is up.
    pub jump_force: f32,
    pub move_speed: f32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub scale: u32,
    pub frame_delay: u32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            jump_force: -12.0,
            move_speed: 4.5,
            spawn_x: 100.0,
            spawn_y: 500.0,
            scale: 2,
            frame_delay: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectibleConfig {
    pub frame_size: u32,
    pub scale: u32,
    pub frame_count: u32,
    pub frame_delay: u32,
    /// Topmost tile row a collectible may occupy.
    pub min_row: u32,
    /// How many rows below the spawn cell ground is searched for.
    pub max_jump_rows: u32,
    pub max_placement_attempts: u32,
}

impl Default for CollectibleConfig {
    fn default() -> Self {
        Self {
            frame_size: 32,
            scale: 2,
            frame_count: 17,
            frame_delay: 6,
            min_row: 2,
            max_jump_rows: 9,
            max_placement_attempts: 256,
        }
    }
}

impl CollectibleConfig {
    pub fn display_size(&self) -> u32 {
        self.frame_size * self.scale
    }
}

/// What happens when a collectible is not picked up in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Move the collectible somewhere else and restart its timer.
    Respawn,
    /// End the run.
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Start in the menu; when false the game boots straight into play.
    pub has_menu: bool,
    pub timeout_policy: TimeoutPolicy,
    pub timeout_ms: u64,
    pub default_volume: u8,
    pub volume_step: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            has_menu: true,
            timeout_policy: TimeoutPolicy::GameOver,
            timeout_ms: 8000,
            default_volume: 64,
            volume_step: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub tick_rate_hz: u32,
    /// Present frames in step with the display refresh.
    pub vsync: bool,
    pub tiles: TileMetrics,
    pub actor: ActorConfig,
    pub collectible: CollectibleConfig,
    pub session: SessionConfig,
    /// Character animation tags this build ships sheets for.
    pub animations: Vec<AnimationTag>,
    pub level_path: String,
    pub manifest_path: String,
    pub high_score_file: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            tick_rate_hz: dash_core::time::DEFAULT_TICK_RATE_HZ,
            vsync: true,
            tiles: TileMetrics::default(),
            actor: ActorConfig::default(),
            collectible: CollectibleConfig::default(),
            session: SessionConfig::default(),
            animations: AnimationTag::ALL.to_vec(),
            level_path: "assets/levels/level1.json".to_string(),
            manifest_path: "assets/manifest.json".to_string(),
            high_score_file: "highscore.txt".to_string(),
        }
    }
}

impl GameConfig {
    pub fn animation_set(&self) -> AnimationSet {
        AnimationSet::from_tags(&self.animations)
    }

    pub fn world_size(&self) -> (f32, f32) {
        (self.window_width as f32, self.window_height as f32)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.window_width == 0 || config.window_height == 0 {
        return Err("Config validation failed: window size must be > 0".to_string());
    }
    let tiles = &config.tiles;
    if tiles.tile_width == 0 || tiles.tile_height == 0 || tiles.scale == 0 {
        return Err("Config validation failed: tile size and scale must be > 0".to_string());
    }
    if tiles.atlas_cols == 0 || tiles.atlas_rows == 0 {
        return Err("Config validation failed: atlas grid must be > 0".to_string());
    }
    if config.actor.scale == 0 {
        return Err("Config validation failed: actor scale must be > 0".to_string());
    }
    let collectible = &config.collectible;
    if collectible.display_size() == 0 || collectible.frame_count == 0 {
        return Err("Config validation failed: collectible sprite must be non-empty".to_string());
    }
    let tile_h = tiles.tile_height * tiles.scale;
    let max_row = config.window_height.saturating_sub(collectible.display_size()) / tile_h;
    if collectible.min_row > max_row {
        return Err(format!(
            "Config validation failed: collectible min_row {} is below the last usable row {}",
            collectible.min_row, max_row
        ));
    }
    if config.actor.frame_delay == 0 || collectible.frame_delay == 0 {
        return Err("Config validation failed: frame_delay must be > 0".to_string());
    }
    let session = &config.session;
    if session.timeout_ms == 0 {
        return Err("Config validation failed: timeout_ms must be > 0".to_string());
    }
    if session.default_volume > MAX_VOLUME || session.volume_step > MAX_VOLUME {
        return Err(format!(
            "Config validation failed: default_volume and volume_step must be <= {MAX_VOLUME}"
        ));
    }
    if !config.animations.contains(&AnimationTag::Idle) {
        return Err("Config validation failed: animations must include idle".to_string());
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
            "dash_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn defaults_are_valid() {
        let config = GameConfig::default();
        validate_config(&config).expect("defaults should validate");
        assert_eq!(config.world_size(), (1280.0, 720.0));
        assert!(config.vsync);
        assert_eq!(config.collectible.display_size(), 64);
        assert!(config.animation_set().contains(AnimationTag::WallJump));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let path = temp_file_path("partial");
        fs::write(
            &path,
            r#"{
              "session": { "has_menu": false, "timeout_policy": "respawn", "timeout_ms": 5000 },
              "animations": ["idle", "run", "jump", "fall"]
            }"#,
        )
        .expect("write temp file");

        let config = load_config_from_path(&path).expect("config should load");
        assert!(!config.session.has_menu);
        assert_eq!(config.session.timeout_policy, TimeoutPolicy::Respawn);
        assert_eq!(config.session.timeout_ms, 5000);
        assert_eq!(config.session.default_volume, 64);
        assert_eq!(config.actor, ActorConfig::default());
        assert!(!config.animation_set().contains(AnimationTag::Hit));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut config = GameConfig::default();
        config.tiles.scale = 0;
        let err = validate_config(&config).expect_err("zero scale should fail");
        assert!(err.contains("tile size and scale"));
    }

    #[test]
    fn loud_default_volume_is_rejected() {
        let mut config = GameConfig::default();
        config.session.default_volume = 200;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn spawn_band_must_exist() {
        let mut config = GameConfig::default();
        config.collectible.min_row = 11;
        let err = validate_config(&config).expect_err("min_row past the window should fail");
        assert!(err.contains("min_row"));
    }

    #[test]
    fn unknown_policy_fails_to_parse() {
        let path = temp_file_path("policy");
        fs::write(&path, r#"{ "session": { "timeout_policy": "explode" } }"#)
            .expect("write temp file");
        let err = load_config_from_path(&path).expect_err("bad policy should fail");
        assert!(err.contains("Failed to parse config JSON"));
        let _ = fs::remove_file(path);
    }
}
