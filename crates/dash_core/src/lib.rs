pub mod animation;
pub mod input;
pub mod rect;
pub mod time;
