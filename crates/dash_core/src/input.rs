//! Keyboard state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every tick the key
//!   is physically down. Movement and jumping read this, so holding jump
//!   re-jumps as soon as the player lands.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only during the
//!   tick the transition happened. Cleared by `end_tick()` once the simulation
//!   has consumed them. Pause and the debug toggles read these.
//!
//! The simulation never sees `InputState` directly; it receives a read-only
//! `InputSnapshot` built once per tick.

use std::collections::HashSet;

/// Logical keys. Several physical keys may map onto one logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Jump,
    Pause,
    DebugPanel,
    DebugBoxes,
}

/// Per-tick input consumed by the simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub pause_pressed: bool,
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// Drop all held keys, e.g. when the window loses focus and key-up
    /// events would otherwise never arrive.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            left: self.is_held(Key::Left),
            right: self.is_held(Key::Right),
            jump: self.is_held(Key::Jump),
            pause_pressed: self.is_just_pressed(Key::Pause),
        }
    }

    pub fn end_tick(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        assert!(input.is_held(Key::Left));
        assert!(input.is_just_pressed(Key::Left));
    }

    #[test]
    fn test_key_up_clears_held_sets_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_up(Key::Left);
        assert!(!input.is_held(Key::Left));
        assert!(input.is_just_released(Key::Left));
    }

    #[test]
    fn test_key_repeat_does_not_retrigger_after_end_tick() {
        let mut input = InputState::new();
        input.key_down(Key::Pause);
        input.end_tick();
        // OS key repeat delivers another press while the key is still held.
        input.key_down(Key::Pause);
        assert!(input.is_held(Key::Pause));
        assert!(!input.is_just_pressed(Key::Pause));
    }

    #[test]
    fn test_key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::Jump);
        assert!(!input.is_just_released(Key::Jump));
        assert!(!input.is_held(Key::Jump));
    }

    #[test]
    fn test_end_tick_clears_transient_state() {
        let mut input = InputState::new();
        input.key_down(Key::Right);
        input.key_down(Key::Jump);
        input.end_tick();
        assert!(!input.is_just_pressed(Key::Right));
        assert!(!input.is_just_pressed(Key::Jump));
        assert!(input.is_held(Key::Right));
        assert!(input.is_held(Key::Jump));
    }

    #[test]
    fn test_release_all_reports_released_keys() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Jump);
        input.release_all();
        assert!(!input.is_held(Key::Left));
        assert!(!input.is_held(Key::Jump));
        assert!(input.is_just_released(Key::Left));
        assert!(input.is_just_released(Key::Jump));
    }

    #[test]
    fn test_snapshot_reads_held_movement_and_pause_edge() {
        let mut input = InputState::new();
        input.key_down(Key::Left);
        input.key_down(Key::Jump);
        input.key_down(Key::Pause);

        let snapshot = input.snapshot();
        assert!(snapshot.left);
        assert!(!snapshot.right);
        assert!(snapshot.jump);
        assert!(snapshot.pause_pressed);

        input.end_tick();
        let snapshot = input.snapshot();
        assert!(snapshot.left);
        assert!(snapshot.jump);
        assert!(!snapshot.pause_pressed, "pause is edge-triggered");
    }

    #[test]
    fn test_default_state_is_empty() {
        let input = InputState::new();
        assert_eq!(input.snapshot(), InputSnapshot::default());
        assert!(!input.is_just_pressed(Key::DebugPanel));
        assert!(!input.is_just_released(Key::DebugBoxes));
    }
}
