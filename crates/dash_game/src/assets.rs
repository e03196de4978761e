//! Asset manifest loading and the texture store.
//!
//! The manifest (`assets/manifest.json`) names every image the game draws:
//! the tileset, the apple sheet, one sheet per character animation and the
//! background layers, plus the looped music track. It is optional; defaults
//! reproduce the stock layout.
//!
//! `AssetStore` owns loaded textures and hands out opaque `TextureHandle`s
//! keyed by `TextureKey`. A texture that fails to load is logged once and
//! left unmapped, so anything drawn with it is skipped. The simulation never
//! touches the store.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use dash_core::animation::AnimationTag;
use serde::Deserialize;

const MANIFEST_VERSION: &str = "0.1";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnimationSheet {
    pub tag: AnimationTag,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BackgroundLayer {
    pub path: String,
    /// Horizontal scroll in pixels per tick.
    pub speed: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AssetManifest {
    pub version: String,
    pub tileset: String,
    pub collectible: String,
    pub animations: Vec<AnimationSheet>,
    pub background: Vec<BackgroundLayer>,
    pub music: String,
}

impl Default for AssetManifest {
    fn default() -> Self {
        let sheet = |tag, file: &str| AnimationSheet {
            tag,
            path: format!("assets/animation/{file}"),
        };
        let layer = |file: &str, speed| BackgroundLayer {
            path: format!("assets/{file}"),
            speed,
        };
        Self {
            version: MANIFEST_VERSION.to_string(),
            tileset: "assets/platforms.png".to_string(),
            collectible: "assets/apple.png".to_string(),
            animations: vec![
                sheet(AnimationTag::Idle, "idle32x32.png"),
                sheet(AnimationTag::Run, "run32x32.png"),
                sheet(AnimationTag::Jump, "jump32x32.png"),
                sheet(AnimationTag::Fall, "fall32x32.png"),
                sheet(AnimationTag::Hit, "hit32x32.png"),
                sheet(AnimationTag::DoubleJump, "doublejump32x32.png"),
                sheet(AnimationTag::WallJump, "walljump32x32.png"),
            ],
            background: vec![
                layer("Yellow.png", 0.2),
                layer("Blue.png", 0.4),
                layer("Green.png", 0.6),
                layer("Purple.png", 0.8),
                layer("Gray.png", 1.0),
            ],
            music: "assets/music/time_for_adventure.mp3".to_string(),
        }
    }
}

pub fn load_manifest_from_path(path: &Path) -> Result<AssetManifest, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let manifest: AssetManifest = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse asset manifest {}: {e}", path.display()))?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

fn validate_manifest(manifest: &AssetManifest) -> Result<(), String> {
    if manifest.version != MANIFEST_VERSION {
        return Err(format!(
            "Manifest validation failed: unsupported version '{}'",
            manifest.version
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for sheet in &manifest.animations {
        if !seen.insert(sheet.tag) {
            return Err(format!(
                "Manifest validation failed: duplicate sheet for animation '{}'",
                sheet.tag
            ));
        }
    }
    for (i, layer) in manifest.background.iter().enumerate() {
        if !layer.speed.is_finite() || layer.speed < 0.0 {
            return Err(format!(
                "Manifest validation failed: background layer {i} has invalid speed {}",
                layer.speed
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKey {
    Tileset,
    Collectible,
    Actor(AnimationTag),
    Background(usize),
    /// 1x1 white texel for solid-color quads.
    White,
}

/// Opaque index into an `AssetStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

pub struct StoredTexture<T> {
    pub texture: T,
    pub size: (u32, u32),
}

pub struct AssetStore<T> {
    textures: Vec<StoredTexture<T>>,
    keys: HashMap<TextureKey, TextureHandle>,
}

impl<T> AssetStore<T> {
    pub fn new() -> Self {
        Self {
            textures: Vec::new(),
            keys: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: TextureKey, texture: T, size: (u32, u32)) -> TextureHandle {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(StoredTexture { texture, size });
        self.keys.insert(key, handle);
        handle
    }

    /// Load every texture the manifest names. Failures are logged and skipped.
    pub fn load_manifest<F>(&mut self, manifest: &AssetManifest, base_dir: &Path, mut load: F)
    where
        F: FnMut(&Path) -> Result<(T, (u32, u32)), String>,
    {
        let mut entries = vec![
            (TextureKey::Tileset, manifest.tileset.as_str()),
            (TextureKey::Collectible, manifest.collectible.as_str()),
        ];
        entries.extend(
            manifest
                .animations
                .iter()
                .map(|sheet| (TextureKey::Actor(sheet.tag), sheet.path.as_str())),
        );
        entries.extend(
            manifest
                .background
                .iter()
                .enumerate()
                .map(|(i, layer)| (TextureKey::Background(i), layer.path.as_str())),
        );

        let mut missing = 0;
        for (key, relative) in entries {
            let path = base_dir.join(relative);
            match load(&path) {
                Ok((texture, size)) => {
                    self.insert(key, texture, size);
                }
                Err(e) => {
                    log::error!("Texture {:?} unavailable, its sprites are skipped: {e}", key);
                    missing += 1;
                }
            }
        }
        log::info!(
            "Loaded {} texture(s), {} missing",
            self.textures.len(),
            missing
        );
    }

    pub fn handle(&self, key: TextureKey) -> Option<TextureHandle> {
        self.keys.get(&key).copied()
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&StoredTexture<T>> {
        self.textures.get(handle.0 as usize)
    }

    pub fn size(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.get(handle).map(|stored| stored.size)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl<T> Default for AssetStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
