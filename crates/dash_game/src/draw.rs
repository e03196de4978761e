//! Draw-list building. Turns settled session state into textured quads and
//! then into one vertex/index mesh with a draw call per texture run.
//!
//! Paint order: background layers, tiles, player, apple, debug boxes. Menu
//! and settings screens only show the background.

use dash_core::rect::{PixelRect, Rect};
use dash_render::SpriteVertex;

use crate::assets::{AssetStore, TextureHandle, TextureKey};
use crate::background::Parallax;
use crate::session::{Phase, Session};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const TILE_BOX_COLOR: [f32; 4] = [0.15, 0.9, 0.15, 0.35];
const ACTOR_BOX_COLOR: [f32; 4] = [1.0, 0.3, 0.3, 0.5];
const COLLECTIBLE_BOX_COLOR: [f32; 4] = [1.0, 0.85, 0.1, 0.5];

/// One textured quad. `src: None` samples the whole texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCmd {
    pub texture: TextureHandle,
    pub src: Option<PixelRect>,
    pub dst: Rect,
    pub flip_x: bool,
    pub color: [f32; 4],
}

/// A contiguous index range drawn with one texture bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: TextureHandle,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<SpriteVertex>,
    pub indices: Vec<u32>,
    pub draw_calls: Vec<DrawCall>,
}

impl Mesh {
    pub fn sprite_count(&self) -> usize {
        self.indices.len() / 6
    }
}

pub fn build_scene<T>(
    session: &Session,
    parallax: &Parallax,
    store: &AssetStore<T>,
    window: (f32, f32),
    show_boxes: bool,
) -> Vec<DrawCmd> {
    let mut cmds = Vec::with_capacity(256);

    for layer in parallax.layers() {
        let Some(texture) = store.handle(TextureKey::Background(layer.index)) else {
            continue;
        };
        cmds.extend(layer.tiles(window.0, window.1).into_iter().map(|dst| DrawCmd {
            texture,
            src: None,
            dst,
            flip_x: false,
            color: WHITE,
        }));
    }

    if matches!(session.phase(), Phase::Menu | Phase::Settings) {
        return cmds;
    }

    if let Some(texture) = store.handle(TextureKey::Tileset) {
        cmds.extend(session.grid.tile_sprites().map(|tile| DrawCmd {
            texture,
            src: Some(tile.src),
            dst: tile.dst,
            flip_x: false,
            color: WHITE,
        }));
    }

    let actor = &session.actor;
    if let Some(texture) = store.handle(TextureKey::Actor(actor.anim.tag)) {
        cmds.push(DrawCmd {
            texture,
            src: Some(actor.source_rect()),
            dst: actor.bounding_box(),
            flip_x: actor.facing_left,
            color: WHITE,
        });
    }

    let apple = &session.collectible;
    if apple.active {
        if let Some(texture) = store.handle(TextureKey::Collectible) {
            cmds.push(DrawCmd {
                texture,
                src: Some(apple.source_rect()),
                dst: apple.bounding_box(),
                flip_x: false,
                color: WHITE,
            });
        }
    }

    if show_boxes {
        if let Some(white) = store.handle(TextureKey::White) {
            let solid_box = |dst, color| DrawCmd {
                texture: white,
                src: None,
                dst,
                flip_x: false,
                color,
            };
            cmds.extend(
                session
                    .grid
                    .tile_sprites()
                    .map(|tile| solid_box(tile.dst, TILE_BOX_COLOR)),
            );
            cmds.push(solid_box(actor.bounding_box(), ACTOR_BOX_COLOR));
            if apple.active {
                cmds.push(solid_box(apple.bounding_box(), COLLECTIBLE_BOX_COLOR));
            }
        }
    }

    cmds
}

/// Texture coordinates `[u0, v0, u1, v1]` for a source region.
fn uv_rect(src: Option<PixelRect>, size: (u32, u32)) -> [f32; 4] {
    match src {
        Some(src) if size.0 > 0 && size.1 > 0 => {
            let w = size.0 as f32;
            let h = size.1 as f32;
            [
                src.x as f32 / w,
                src.y as f32 / h,
                (src.x + src.w) as f32 / w,
                (src.y + src.h) as f32 / h,
            ]
        }
        _ => [0.0, 0.0, 1.0, 1.0],
    }
}

pub fn build_mesh<T>(cmds: &[DrawCmd], store: &AssetStore<T>) -> Mesh {
    let mut mesh = Mesh {
        vertices: Vec::with_capacity(cmds.len() * 4),
        indices: Vec::with_capacity(cmds.len() * 6),
        draw_calls: Vec::with_capacity(16),
    };

    for cmd in cmds {
        let Some(size) = store.size(cmd.texture) else {
            log::warn!("Skipping quad with unknown texture {:?}", cmd.texture);
            continue;
        };
        let [mut u0, v0, mut u1, v1] = uv_rect(cmd.src, size);
        if cmd.flip_x {
            std::mem::swap(&mut u0, &mut u1);
        }

        let Rect { x, y, w, h } = cmd.dst;
        let base_index = mesh.vertices.len() as u32;
        mesh.vertices.extend_from_slice(&[
            SpriteVertex {
                position: [x, y],
                tex_coords: [u0, v0],
                color: cmd.color,
            },
            SpriteVertex {
                position: [x + w, y],
                tex_coords: [u1, v0],
                color: cmd.color,
            },
            SpriteVertex {
                position: [x + w, y + h],
                tex_coords: [u1, v1],
                color: cmd.color,
            },
            SpriteVertex {
                position: [x, y + h],
                tex_coords: [u0, v1],
                color: cmd.color,
            },
        ]);

        let draw_start = mesh.indices.len() as u32;
        mesh.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);
        push_draw_call(&mut mesh.draw_calls, cmd.texture, draw_start, 6);
    }

    mesh
}

/// Append a draw call, merging with the previous one when the texture matches
/// and the indices are contiguous. Tiles and background columns are emitted
/// back to back, so each collapses into a single `draw_indexed`.
fn push_draw_call(
    draw_calls: &mut Vec<DrawCall>,
    texture: TextureHandle,
    index_start: u32,
    index_count: u32,
) {
    if let Some(last) = draw_calls.last_mut() {
        let contiguous = last.index_start + last.index_count == index_start;
        if last.texture == texture && contiguous {
            last.index_count += index_count;
            return;
        }
    }
    draw_calls.push(DrawCall {
        texture,
        index_start,
        index_count,
    });
}
