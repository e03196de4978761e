//! Sprite-sheet animation tags, their metadata, and tick-driven playback.
//!
//! Every animation is a horizontal strip of equally sized frames. Playback is
//! counted in simulation ticks, not wall time: a frame is held for
//! `frame_delay` ticks, then the index advances modulo the frame count.
//!
//! Tags form a closed enum. An `AnimationSet` maps each tag to fixed metadata
//! and may leave tags unmapped (reduced feature sets); looking up an unmapped
//! tag is the only way to hit the "unknown animation" fallback.

use serde::Deserialize;

use crate::rect::PixelRect;

/// Frame size used when a tag has no metadata.
pub const FALLBACK_FRAME_SIZE: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationTag {
    Idle,
    Run,
    Jump,
    Fall,
    Hit,
    DoubleJump,
    WallJump,
}

impl AnimationTag {
    pub const COUNT: usize = 7;

    pub const ALL: [AnimationTag; Self::COUNT] = [
        AnimationTag::Idle,
        AnimationTag::Run,
        AnimationTag::Jump,
        AnimationTag::Fall,
        AnimationTag::Hit,
        AnimationTag::DoubleJump,
        AnimationTag::WallJump,
    ];

    /// The smallest set the movement state machine can drive.
    pub const MINIMAL: [AnimationTag; 4] = [
        AnimationTag::Idle,
        AnimationTag::Run,
        AnimationTag::Jump,
        AnimationTag::Fall,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Run => "run",
            Self::Jump => "jump",
            Self::Fall => "fall",
            Self::Hit => "hit",
            Self::DoubleJump => "double_jump",
            Self::WallJump => "wall_jump",
        }
    }
}

impl std::fmt::Display for AnimationTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Layout of one sprite strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationInfo {
    pub frame_count: u32,
    pub frame_w: u32,
    pub frame_h: u32,
}

impl AnimationInfo {
    pub const fn new(frame_count: u32, frame_w: u32, frame_h: u32) -> Self {
        Self {
            frame_count,
            frame_w,
            frame_h,
        }
    }

    /// Built-in metadata for the stock character sheets.
    pub const fn stock(tag: AnimationTag) -> Self {
        match tag {
            AnimationTag::Idle => Self::new(11, 32, 32),
            AnimationTag::Run => Self::new(12, 32, 32),
            AnimationTag::Jump => Self::new(1, 32, 32),
            AnimationTag::Fall => Self::new(1, 32, 32),
            AnimationTag::Hit => Self::new(7, 32, 32),
            AnimationTag::DoubleJump => Self::new(6, 32, 32),
            AnimationTag::WallJump => Self::new(5, 32, 32),
        }
    }
}

/// Metadata for the tags enabled in this build of the character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSet {
    entries: [Option<AnimationInfo>; AnimationTag::COUNT],
}

impl AnimationSet {
    pub fn empty() -> Self {
        Self {
            entries: [None; AnimationTag::COUNT],
        }
    }

    pub fn full() -> Self {
        Self::from_tags(&AnimationTag::ALL)
    }

    pub fn minimal() -> Self {
        Self::from_tags(&AnimationTag::MINIMAL)
    }

    /// Stock metadata for the listed tags; every other tag stays unmapped.
    pub fn from_tags(tags: &[AnimationTag]) -> Self {
        let mut set = Self::empty();
        for &tag in tags {
            set.insert(tag, AnimationInfo::stock(tag));
        }
        set
    }

    pub fn insert(&mut self, tag: AnimationTag, info: AnimationInfo) {
        self.entries[tag.index()] = Some(info);
    }

    pub fn get(&self, tag: AnimationTag) -> Option<AnimationInfo> {
        self.entries[tag.index()]
    }

    pub fn contains(&self, tag: AnimationTag) -> bool {
        self.get(tag).is_some()
    }
}

impl Default for AnimationSet {
    fn default() -> Self {
        Self::full()
    }
}

/// Playback position inside the current tag's strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    pub tag: AnimationTag,
    pub frame_index: u32,
    pub frame_timer: u32,
}

impl AnimationState {
    pub fn new(tag: AnimationTag) -> Self {
        Self {
            tag,
            frame_index: 0,
            frame_timer: 0,
        }
    }

    /// Switch tags. Returns `true` (and rewinds playback) only on a change.
    pub fn set_tag(&mut self, tag: AnimationTag) -> bool {
        if self.tag == tag {
            return false;
        }
        self.tag = tag;
        self.frame_index = 0;
        self.frame_timer = 0;
        true
    }

    /// Advance by one tick. Single-frame and unmapped strips stay on frame 0.
    pub fn tick(&mut self, info: Option<AnimationInfo>, frame_delay: u32) {
        let Some(info) = info else {
            self.frame_index = 0;
            return;
        };
        if info.frame_count <= 1 {
            self.frame_index = 0;
            return;
        }

        self.frame_timer += 1;
        if self.frame_timer >= frame_delay {
            self.frame_index = (self.frame_index + 1) % info.frame_count;
            self.frame_timer = 0;
        }
    }

    pub fn source_rect(&self, info: Option<AnimationInfo>) -> PixelRect {
        match info {
            Some(info) => PixelRect::new(
                self.frame_index * info.frame_w,
                0,
                info.frame_w,
                info.frame_h,
            ),
            None => PixelRect::new(0, 0, FALLBACK_FRAME_SIZE, FALLBACK_FRAME_SIZE),
        }
    }
}
