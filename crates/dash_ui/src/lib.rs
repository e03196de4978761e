pub mod overlay;

pub use overlay::{DebugStats, GameOverlay, HudState, Screen, UiAction};
