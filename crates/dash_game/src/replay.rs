//! Scripted input sequences for determinism tests. A replay is a JSON list of
//! held-key frames, each repeated for `repeat` ticks.

use dash_core::input::InputSnapshot;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    /// Milliseconds the session clock advances per tick.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub pause: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<InputSnapshot> {
        let mut out = Vec::new();
        for frame in &self.frames {
            for i in 0..frame.repeat.max(1) {
                out.push(InputSnapshot {
                    left: frame.left,
                    right: frame.right,
                    jump: frame.jump,
                    // Pause is an edge; only the first tick of a held frame sees it.
                    pause_pressed: frame.pause && i == 0,
                });
            }
        }
        out
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.tick_ms == 0 {
        return Err("Replay validation failed: tick_ms must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_tick_ms() -> u64 {
    16
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::config::GameConfig;
    use crate::session::{Phase, Session};
    use crate::tile_grid::TileGrid;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "dash_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    const RUN_AND_JUMP: &str = r#"{
      "frames": [
        { "right": true, "repeat": 40 },
        { "right": true, "jump": true, "repeat": 2 },
        { "right": true, "repeat": 80 },
        { "left": true, "jump": true, "repeat": 30 },
        { "left": true, "repeat": 45 },
        { "repeat": 90 }
      ]
    }"#;

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "tick_ms": 16,
              "frames": [
                { "right": true, "repeat": 3 },
                { "jump": true },
                { "pause": true, "repeat": 2 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 6);
        assert!(expanded[0].right && !expanded[0].left);
        assert!(expanded[3].jump);
        assert!(expanded[4].pause_pressed);
        assert!(!expanded[5].pause_pressed);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn empty_replay_is_rejected() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn actor_replay_is_deterministic() {
        let path = temp_file_path("actor");
        fs::write(&path, RUN_AND_JUMP).expect("write replay file");
        let replay = load_replay_from_path(&path).expect("replay should load");
        let inputs = replay.expanded_inputs();

        let config = GameConfig::default();
        let grid = TileGrid::builtin(config.tiles);
        let mut run_a = Actor::new(config.actor, config.animation_set(), config.world_size());
        let mut run_b = run_a.clone();
        for input in &inputs {
            run_a.handle_input(input);
            run_a.update(&grid);
        }
        for input in &inputs {
            run_b.handle_input(input);
            run_b.update(&grid);
        }

        assert_eq!(run_a.x, run_b.x);
        assert_eq!(run_a.y, run_b.y);
        assert_eq!(run_a.vel_y, run_b.vel_y);
        assert_eq!(run_a.anim.tag, run_b.anim.tag);
        assert_eq!(run_a.anim.frame_index, run_b.anim.frame_index);
        assert!(run_a.grounded, "idle tail should leave the actor standing");
        assert!(!grid.is_colliding(run_a.bounding_box()));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn seeded_session_replay_is_deterministic() {
        let path = temp_file_path("session");
        fs::write(&path, RUN_AND_JUMP).expect("write replay file");
        let replay = load_replay_from_path(&path).expect("replay should load");
        let inputs = replay.expanded_inputs();

        let mut config = GameConfig::default();
        config.session.has_menu = false;
        config.session.timeout_ms = 60_000;
        let run = || {
            let grid = TileGrid::builtin(config.tiles);
            let mut session = Session::new(&config, grid, 0, Pcg32::seed_from_u64(77), 0);
            let mut now = 0;
            for input in &inputs {
                now += replay.tick_ms;
                session.tick(input, now);
            }
            session
        };

        let a = run();
        let b = run();
        assert_eq!(a.phase(), Phase::Playing);
        assert_eq!(a.phase(), b.phase());
        assert_eq!(a.score(), b.score());
        assert_eq!((a.actor.x, a.actor.y), (b.actor.x, b.actor.y));
        assert_eq!(
            (a.collectible.x, a.collectible.y),
            (b.collectible.x, b.collectible.y)
        );
        assert_eq!(a.collectible.spawn_time(), b.collectible.spawn_time());

        let _ = fs::remove_file(path);
    }
}
