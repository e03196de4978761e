//! Game session: phase machine, score keeping and the collect-before-timeout
//! rule. Owns the level, the player and the apple for the whole run.
//!
//! Phases: Menu <-> Settings, Menu -> Playing, Playing <-> Paused,
//! Playing -> GameOver -> Playing. Without a menu the session boots into
//! Playing. Side effects the shell has to act on (music, logging, persistence)
//! are queued as `SessionEvent`s and drained once per tick.

use dash_core::input::InputSnapshot;
use rand_pcg::Pcg32;

use crate::actor::{Actor, StepOutcome};
use crate::collectible::Collectible;
use crate::config::{GameConfig, SessionConfig, TimeoutPolicy, MAX_VOLUME};
use crate::tile_grid::TileGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Menu,
    Settings,
    Playing,
    Paused,
    GameOver,
}

/// Button presses coming back from the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Play,
    OpenSettings,
    Back,
    VolumeUp,
    VolumeDown,
    Restart,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    MusicPaused,
    MusicResumed,
    VolumeChanged(u8),
    Collected { score: u32 },
    CollectibleRespawned,
    PitFall,
    GameOver { score: u32 },
}

pub struct Session {
    pub grid: TileGrid,
    pub actor: Actor,
    pub collectible: Collectible,
    phase: Phase,
    score: u32,
    high_score: u32,
    volume: u8,
    time_left_ms: Option<u64>,
    paused_at_ms: Option<u64>,
    config: SessionConfig,
    rng: Pcg32,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(
        config: &GameConfig,
        grid: TileGrid,
        high_score: u32,
        rng: Pcg32,
        now_ms: u64,
    ) -> Self {
        let world = config.world_size();
        let mut session = Self {
            grid,
            actor: Actor::new(config.actor, config.animation_set(), world),
            collectible: Collectible::new(config.collectible, world),
            phase: Phase::Menu,
            score: 0,
            high_score,
            volume: config.session.default_volume.min(MAX_VOLUME),
            time_left_ms: None,
            paused_at_ms: None,
            config: config.session,
            rng,
            events: Vec::new(),
        };
        if config.session.has_menu {
            session
                .collectible
                .spawn(&session.grid, &mut session.rng, now_ms);
        } else {
            session.reset(now_ms);
        }
        log::info!(
            "Session ready: level '{}', starting in {:?}, high score {}",
            session.grid.level_id,
            session.phase,
            high_score
        );
        session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Countdown until the apple times out. Only shown while playing; the
    /// pause dialog hides it.
    pub fn time_left_ms(&self) -> Option<u64> {
        match self.phase {
            Phase::Playing => self.time_left_ms,
            _ => None,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start a fresh run. The high score survives.
    pub fn reset(&mut self, now_ms: u64) {
        self.score = 0;
        self.phase = Phase::Playing;
        self.paused_at_ms = None;
        self.actor.respawn();
        self.collectible.spawn(&self.grid, &mut self.rng, now_ms);
        self.time_left_ms = Some(self.config.timeout_ms);
        log::info!("Run started");
    }

    pub fn increment_score(&mut self) {
        self.score += 1;
        self.high_score = self.high_score.max(self.score);
    }

    /// One fixed simulation step.
    pub fn tick(&mut self, input: &InputSnapshot, now_ms: u64) {
        if input.pause_pressed {
            self.toggle_pause(now_ms);
        }
        if self.phase != Phase::Playing {
            return;
        }

        self.actor.handle_input(input);
        if self.actor.update(&self.grid) == StepOutcome::FellOut {
            self.events.push(SessionEvent::PitFall);
        }

        let respawn_after = match self.config.timeout_policy {
            TimeoutPolicy::Respawn => Some(self.config.timeout_ms),
            TimeoutPolicy::GameOver => None,
        };
        if self
            .collectible
            .update(&self.grid, &mut self.rng, now_ms, respawn_after)
        {
            self.events.push(SessionEvent::CollectibleRespawned);
        }

        if self.collectible.is_collected(&self.actor.bounding_box()) {
            self.increment_score();
            log::info!("Apple collected, score {}", self.score);
            self.events.push(SessionEvent::Collected { score: self.score });
            self.collectible.deactivate();
            self.collectible.spawn(&self.grid, &mut self.rng, now_ms);
            self.events.push(SessionEvent::CollectibleRespawned);
        }

        let elapsed = now_ms.saturating_sub(self.collectible.spawn_time());
        if elapsed >= self.config.timeout_ms && self.config.timeout_policy == TimeoutPolicy::GameOver
        {
            self.phase = Phase::GameOver;
            self.time_left_ms = None;
            log::info!("Apple timed out, game over with score {}", self.score);
            self.events.push(SessionEvent::GameOver { score: self.score });
        } else {
            self.time_left_ms = Some(self.config.timeout_ms.saturating_sub(elapsed));
        }
    }

    fn toggle_pause(&mut self, now_ms: u64) {
        match self.phase {
            Phase::Playing => {
                self.phase = Phase::Paused;
                self.paused_at_ms = Some(now_ms);
                self.events.push(SessionEvent::MusicPaused);
                log::info!("Paused");
            }
            Phase::Paused => self.resume(now_ms),
            _ => {}
        }
    }

    /// The apple timer does not run while paused.
    fn resume(&mut self, now_ms: u64) {
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.collectible
                .extend_lifetime(now_ms.saturating_sub(paused_at));
        }
        self.phase = Phase::Playing;
        self.events.push(SessionEvent::MusicResumed);
        log::info!("Resumed");
    }

    /// Apply a button press. Returns `false` when the button does nothing in
    /// the current phase.
    pub fn handle_action(&mut self, action: MenuAction, now_ms: u64) -> bool {
        match (self.phase, action) {
            (Phase::Menu, MenuAction::Play) | (Phase::GameOver, MenuAction::Restart) => {
                self.reset(now_ms);
            }
            (Phase::Menu, MenuAction::OpenSettings) => self.phase = Phase::Settings,
            (Phase::Settings, MenuAction::Back) => self.phase = Phase::Menu,
            (Phase::Settings, MenuAction::VolumeUp) => {
                self.set_volume(self.volume.saturating_add(self.config.volume_step));
            }
            (Phase::Settings, MenuAction::VolumeDown) => {
                self.set_volume(self.volume.saturating_sub(self.config.volume_step));
            }
            (Phase::Paused, MenuAction::Resume) => self.resume(now_ms),
            (phase, action) => {
                log::debug!("Ignoring {action:?} in {phase:?}");
                return false;
            }
        }
        true
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(MAX_VOLUME);
        log::info!("Volume: {}", self.volume);
        self.events.push(SessionEvent::VolumeChanged(self.volume));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileMetrics;
    use dash_core::animation::AnimationTag;
    use rand::SeedableRng;

    fn session_with(config: &GameConfig) -> Session {
        let grid = TileGrid::builtin(config.tiles);
        Session::new(config, grid, 0, Pcg32::seed_from_u64(2024), 0)
    }

    fn playing_session(timeout_policy: TimeoutPolicy, timeout_ms: u64) -> Session {
        let mut config = GameConfig::default();
        config.session.has_menu = false;
        config.session.timeout_policy = timeout_policy;
        config.session.timeout_ms = timeout_ms;
        session_with(&config)
    }

    fn no_input() -> InputSnapshot {
        InputSnapshot::default()
    }

    fn pause_key() -> InputSnapshot {
        InputSnapshot {
            pause_pressed: true,
            ..Default::default()
        }
    }

    #[test]
    fn menu_config_starts_in_menu() {
        let mut session = session_with(&GameConfig::default());
        assert_eq!(session.phase(), Phase::Menu);
        assert_eq!(session.time_left_ms(), None);

        let x = session.actor.x;
        session.tick(&no_input(), 16);
        assert_eq!(session.actor.x, x, "menu must not simulate");

        assert!(session.handle_action(MenuAction::Play, 100));
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.collectible.spawn_time(), 100);
    }

    #[test]
    fn menu_less_config_starts_playing() {
        let session = playing_session(TimeoutPolicy::GameOver, 8000);
        assert_eq!(session.phase(), Phase::Playing);
        assert!(session.collectible.active);
        assert_eq!(session.time_left_ms(), Some(8000));
    }

    #[test]
    fn settings_round_trip_and_volume_clamp() {
        let mut session = session_with(&GameConfig::default());
        assert!(!session.handle_action(MenuAction::VolumeUp, 0));
        assert!(session.handle_action(MenuAction::OpenSettings, 0));
        assert_eq!(session.phase(), Phase::Settings);

        for _ in 0..10 {
            session.handle_action(MenuAction::VolumeUp, 0);
        }
        assert_eq!(session.volume(), 128);
        for _ in 0..10 {
            session.handle_action(MenuAction::VolumeDown, 0);
        }
        assert_eq!(session.volume(), 0);

        let events = session.drain_events();
        assert_eq!(events.first(), Some(&SessionEvent::VolumeChanged(80)));
        assert_eq!(events.last(), Some(&SessionEvent::VolumeChanged(0)));

        assert!(session.handle_action(MenuAction::Back, 0));
        assert_eq!(session.phase(), Phase::Menu);
    }

    #[test]
    fn pause_key_toggles_and_freezes_simulation() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        session.drain_events();

        session.tick(&pause_key(), 16);
        assert_eq!(session.phase(), Phase::Paused);
        let y = session.actor.y;
        session.tick(&no_input(), 32);
        assert_eq!(session.actor.y, y);

        session.tick(&pause_key(), 48);
        assert_eq!(session.phase(), Phase::Playing);
        let music: Vec<SessionEvent> = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::MusicPaused | SessionEvent::MusicResumed))
            .collect();
        assert_eq!(
            music,
            vec![SessionEvent::MusicPaused, SessionEvent::MusicResumed]
        );

        session.tick(&pause_key(), 64);
        assert!(session.handle_action(MenuAction::Resume, 70));
        assert_eq!(session.phase(), Phase::Playing);
    }

    #[test]
    fn paused_time_does_not_count_toward_timeout() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        session.collectible.x = 1216.0;
        session.collectible.y = 128.0;
        let t0 = session.collectible.spawn_time();

        session.tick(&no_input(), t0 + 1000);
        assert_eq!(session.time_left_ms(), Some(7000));
        session.tick(&pause_key(), t0 + 2000);
        assert_eq!(session.phase(), Phase::Paused);
        assert_eq!(session.time_left_ms(), None);

        assert!(session.handle_action(MenuAction::Resume, t0 + 12_000));
        assert_eq!(session.collectible.spawn_time(), t0 + 10_000);
        session.tick(&no_input(), t0 + 12_016);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left_ms(), Some(5984));
    }

    #[test]
    fn countdown_is_hidden_while_paused() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        session.collectible.x = 1216.0;
        session.collectible.y = 128.0;
        let t0 = session.collectible.spawn_time();

        session.tick(&no_input(), t0 + 500);
        assert_eq!(session.time_left_ms(), Some(7500));

        session.tick(&pause_key(), t0 + 516);
        assert_eq!(session.phase(), Phase::Paused);
        session.tick(&no_input(), t0 + 532);
        assert_eq!(session.time_left_ms(), None);

        session.tick(&pause_key(), t0 + 548);
        assert_eq!(session.phase(), Phase::Playing);
        assert!(session.time_left_ms().is_some());
    }

    #[test]
    fn score_and_high_score_invariants() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        for _ in 0..3 {
            session.increment_score();
            assert!(session.high_score() >= session.score());
        }
        assert_eq!((session.score(), session.high_score()), (3, 3));

        session.reset(0);
        assert_eq!(session.score(), 0);
        assert_eq!(session.high_score(), 3);

        session.increment_score();
        assert_eq!((session.score(), session.high_score()), (1, 3));
    }

    #[test]
    fn loaded_high_score_is_kept() {
        let mut config = GameConfig::default();
        config.session.has_menu = false;
        let grid = TileGrid::builtin(TileMetrics::default());
        let mut session = Session::new(&config, grid, 41, Pcg32::seed_from_u64(1), 0);
        session.increment_score();
        assert_eq!(session.high_score(), 41);
    }

    #[test]
    fn timeout_ends_the_run_exactly_once() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        // Out of reach of the actor resting on the spawn ledge.
        session.collectible.x = 1216.0;
        session.collectible.y = 128.0;
        let t0 = session.collectible.spawn_time();
        session.drain_events();

        let mut now = t0;
        while now + 16 < t0 + 8000 {
            now += 16;
            session.tick(&no_input(), now);
            assert_eq!(session.phase(), Phase::Playing, "too early at {now}");
        }
        assert_eq!(session.score(), 0);

        session.tick(&no_input(), t0 + 7999);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.time_left_ms(), Some(1));

        session.tick(&no_input(), t0 + 8000);
        assert_eq!(session.phase(), Phase::GameOver);
        assert_eq!(session.time_left_ms(), None);

        session.tick(&no_input(), t0 + 8016);
        session.tick(&no_input(), t0 + 9000);
        let game_overs = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);

        assert!(session.handle_action(MenuAction::Restart, 10_000));
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.collectible.spawn_time(), 10_000);
    }

    #[test]
    fn respawn_policy_moves_apple_instead_of_ending() {
        let mut session = playing_session(TimeoutPolicy::Respawn, 5000);
        let t0 = session.collectible.spawn_time();
        session.drain_events();

        session.tick(&no_input(), t0 + 5000);
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.collectible.spawn_time(), t0 + 5000);
        assert!(session
            .drain_events()
            .contains(&SessionEvent::CollectibleRespawned));
        assert_eq!(session.time_left_ms(), Some(5000));
    }

    #[test]
    fn touching_the_apple_scores_and_respawns_it() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        session.drain_events();
        session.actor.x = session.collectible.x;
        session.actor.y = session.collectible.y;
        session.actor.vel_y = 0.0;

        session.tick(&no_input(), 500);
        assert_eq!(session.score(), 1);
        assert_eq!(session.high_score(), 1);
        assert!(session.collectible.active);
        assert_eq!(session.collectible.spawn_time(), 500);
        assert!(!session.grid.is_colliding(session.collectible.bounding_box()));

        let events = session.drain_events();
        assert_eq!(events[0], SessionEvent::Collected { score: 1 });
        assert_eq!(events[1], SessionEvent::CollectibleRespawned);
    }

    #[test]
    fn pit_fall_is_reported() {
        let mut session = playing_session(TimeoutPolicy::GameOver, 8000);
        session.drain_events();
        session.actor.x = 2.0 * 64.0 + 8.0;
        session.actor.y = 730.0;
        session.actor.grounded = false;

        session.tick(&no_input(), 16);
        assert!(session.drain_events().contains(&SessionEvent::PitFall));
        assert_eq!(session.actor.anim.tag, AnimationTag::Fall);
        assert_eq!((session.actor.x, session.actor.y), (100.0, 500.0));
    }
}
