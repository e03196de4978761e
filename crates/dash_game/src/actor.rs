use dash_core::animation::{
    AnimationInfo, AnimationSet, AnimationState, AnimationTag, FALLBACK_FRAME_SIZE,
};
use dash_core::input::InputSnapshot;
use dash_core::rect::{PixelRect, Rect};

use crate::config::ActorConfig;
use crate::tile_grid::TileGrid;

/// Multiplier on gravity for the vertical-velocity dead zone around the jump
/// apex. Inside the zone the airborne tag is left alone.
const APEX_THRESHOLD_FACTOR: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    /// Dropped below the window and was put back at the spawn point.
    FellOut,
}

/// The player character: position is the top-left of the bounding box, and
/// the box size always follows the current animation's frame size.
#[derive(Debug, Clone)]
pub struct Actor {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub grounded: bool,
    pub moving: bool,
    pub just_jumped: bool,
    pub facing_left: bool,
    pub anim: AnimationState,
    width: f32,
    height: f32,
    config: ActorConfig,
    animations: AnimationSet,
    world_w: f32,
    world_h: f32,
}

impl Actor {
    pub fn new(config: ActorConfig, animations: AnimationSet, world: (f32, f32)) -> Self {
        let mut actor = Self {
            x: config.spawn_x,
            y: config.spawn_y,
            vel_x: 0.0,
            vel_y: 0.0,
            grounded: false,
            moving: false,
            just_jumped: false,
            facing_left: false,
            anim: AnimationState::new(AnimationTag::Idle),
            width: 0.0,
            height: 0.0,
            config,
            animations,
            world_w: world.0,
            world_h: world.1,
        };
        actor.refresh_box_size();
        actor
    }

    pub fn bounding_box(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn box_at(&self, x: f32, y: f32) -> Rect {
        Rect::new(x, y, self.width, self.height)
    }

    pub fn animation_info(&self) -> Option<AnimationInfo> {
        self.animations.get(self.anim.tag)
    }

    pub fn source_rect(&self) -> PixelRect {
        self.anim.source_rect(self.animation_info())
    }

    /// Read held keys for this tick. Right wins when both directions are held;
    /// jump only starts from the ground.
    pub fn handle_input(&mut self, input: &InputSnapshot) {
        self.moving = false;
        self.vel_x = 0.0;

        if input.left {
            self.vel_x = -self.config.move_speed;
            self.moving = true;
            self.facing_left = true;
        }
        if input.right {
            self.vel_x = self.config.move_speed;
            self.moving = true;
            self.facing_left = false;
        }
        if input.jump && self.grounded {
            self.vel_y = self.config.jump_force;
            self.grounded = false;
            self.just_jumped = true;
        }
    }

    pub fn update(&mut self, grid: &TileGrid) -> StepOutcome {
        let old_x = self.x;
        let old_y = self.y;

        if !self.grounded {
            self.vel_y += self.config.gravity;
        }
        self.x += self.vel_x;
        self.y += self.vel_y;

        // Horizontal first, tested at the old height.
        if grid.is_colliding(self.box_at(self.x, old_y)) {
            self.x = old_x;
            self.vel_x = 0.0;
        }

        if grid.is_colliding(self.box_at(self.x, self.y)) {
            let tile_h = grid.tile_px_h() as f32;
            if self.vel_y > 0.0 {
                let row = grid.row_at(self.y + self.height - 1.0);
                self.y = row as f32 * tile_h - self.height;
                self.vel_y = 0.0;
                self.grounded = true;
            } else if self.vel_y < 0.0 {
                let row = grid.row_at(self.y);
                self.y = (row + 1) as f32 * tile_h;
                self.vel_y = 0.0;
            }
        } else {
            // Resting flush on a tile never overlaps it, so probe one pixel down
            // to keep a standing actor grounded between ticks.
            self.grounded =
                self.vel_y >= 0.0 && grid.is_colliding(self.box_at(self.x, self.y + 1.0));
            if self.grounded {
                self.vel_y = 0.0;
            }
        }

        let max_x = self.world_w - self.width;
        if self.x < 0.0 {
            self.x = 0.0;
            self.vel_x = 0.0;
        }
        if self.x > max_x {
            self.x = max_x;
            self.vel_x = 0.0;
        }
        if self.y < 0.0 {
            self.y = 0.0;
            self.vel_y = 0.0;
        }

        let outcome = if self.y > self.world_h {
            log::debug!("Actor fell out at x={:.1}, respawning", self.x);
            self.respawn();
            StepOutcome::FellOut
        } else {
            StepOutcome::Moved
        };

        self.resolve_animation();
        self.just_jumped = false;
        self.anim
            .tick(self.animation_info(), self.config.frame_delay);
        outcome
    }

    /// Back to the spawn point, airborne, in the fall pose.
    pub fn respawn(&mut self) {
        self.x = self.config.spawn_x;
        self.y = self.config.spawn_y;
        self.vel_x = 0.0;
        self.vel_y = 0.0;
        self.grounded = false;
        self.just_jumped = false;
        self.set_animation(AnimationTag::Fall);
    }

    fn resolve_animation(&mut self) {
        let threshold = self.config.gravity * APEX_THRESHOLD_FACTOR;
        let next = if self.grounded {
            if self.moving {
                AnimationTag::Run
            } else {
                AnimationTag::Idle
            }
        } else if self.just_jumped {
            AnimationTag::Jump
        } else if self.vel_y > threshold {
            AnimationTag::Fall
        } else if self.vel_y < -threshold && self.anim.tag != AnimationTag::Jump {
            AnimationTag::Jump
        } else {
            self.anim.tag
        };
        self.set_animation(next);
    }

    pub(crate) fn set_animation(&mut self, tag: AnimationTag) {
        if self.anim.set_tag(tag) {
            self.refresh_box_size();
        }
    }

    fn refresh_box_size(&mut self) {
        let scale = self.config.scale as f32;
        match self.animation_info() {
            Some(info) => {
                self.width = info.frame_w as f32 * scale;
                self.height = info.frame_h as f32 * scale;
            }
            None => {
                log::warn!(
                    "Animation '{}' is not mapped, using {}x{} fallback frame",
                    self.anim.tag,
                    FALLBACK_FRAME_SIZE,
                    FALLBACK_FRAME_SIZE
                );
                self.width = FALLBACK_FRAME_SIZE as f32 * scale;
                self.height = FALLBACK_FRAME_SIZE as f32 * scale;
            }
        }
    }
}
