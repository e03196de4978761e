//! Window surface, device and queue for the game's single window.
//!
//! The surface is configured once at startup and again on every resize. A
//! minimized window (zero extent) leaves the surface unconfigured and
//! `size` at zero, which the caller uses to skip drawing.

use std::sync::Arc;
use winit::window::Window;

pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    /// Current drawable extent in physical pixels; `(0, 0)` while minimized.
    pub size: (u32, u32),
    max_extent: u32,
}

impl GpuContext {
    /// Create the surface, adapter and device for `window`. Any failure here is
    /// a bootstrap failure; the caller logs it and aborts startup.
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self, String> {
        let inner = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| format!("Failed to create window surface: {e}"))?;

        // Sprites and a text overlay need no discrete GPU.
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| "No GPU adapter can present to the game window".to_string())?;

        let info = adapter.get_info();
        log::info!(
            "GPU adapter: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Apple Dash Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| format!("Failed to open GPU device: {e}"))?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = pick_surface_format(&caps.formats)
            .ok_or_else(|| "Window surface reports no supported formats".to_string())?;
        let present_mode = pick_present_mode(&caps.present_modes, vsync);
        let alpha_mode = pick_alpha_mode(&caps.alpha_modes);
        log::info!("Surface: {surface_format:?}, {present_mode:?}, {alpha_mode:?}");

        let max_extent = device.limits().max_texture_dimension_2d;
        let size = surface_extent(inner.width, inner.height, max_extent).unwrap_or((0, 0));
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        if size != (0, 0) {
            surface.configure(&device, &config);
        }

        Ok(Self {
            surface,
            device,
            queue,
            config,
            surface_format,
            size,
            max_extent,
        })
    }

    /// Reconfigure for a new physical size. Zero extents mark the window as
    /// minimized; the next non-zero resize reconfigures.
    pub fn resize(&mut self, width: u32, height: u32) {
        let Some((w, h)) = surface_extent(width, height, self.max_extent) else {
            if self.size != (0, 0) {
                log::debug!("Window minimized, drawing suspended");
            }
            self.size = (0, 0);
            return;
        };
        if (w, h) == self.size {
            return;
        }
        self.size = (w, h);
        self.config.width = w;
        self.config.height = h;
        self.surface.configure(&self.device, &self.config);
        log::info!("Surface resized to {w}x{h}");
    }

    /// Acquire the next swapchain image. `None` means skip this frame; lost
    /// and outdated surfaces are reconfigured for the next one.
    pub fn begin_frame(&self) -> Option<(wgpu::SurfaceTexture, wgpu::TextureView)> {
        if self.size == (0, 0) {
            return None;
        }
        let output = match self.surface.get_current_texture() {
            Ok(tex) => tex,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::debug!("Surface {e}, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return None;
            }
            Err(wgpu::SurfaceError::Timeout) => return None,
            Err(e) => {
                log::error!("Dropping frame: {e}");
                return None;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Apple Dash Frame"),
            ..Default::default()
        });
        Some((output, view))
    }
}

/// sRGB 8-bit formats first so sprite colors come out as authored.
pub fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    const PREFERRED: [wgpu::TextureFormat; 2] = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    PREFERRED
        .iter()
        .find(|f| formats.contains(*f))
        .or_else(|| formats.iter().find(|f| f.is_srgb()))
        .or_else(|| formats.first())
        .copied()
}

/// Fifo is always supported. Without vsync prefer Mailbox, then Immediate.
pub fn pick_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|m| modes.contains(m))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

/// The game draws an opaque sky, so an opaque window is preferred.
pub fn pick_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        wgpu::CompositeAlphaMode::Opaque
    } else {
        modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto)
    }
}

/// Clamp a window size to what the device can allocate. `None` for a
/// zero-area (minimized) window.
pub fn surface_extent(width: u32, height: u32, max: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    Some((width.min(max), height.min(max)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode, PresentMode, TextureFormat};

    #[test]
    fn srgb_format_is_preferred() {
        let formats = [
            TextureFormat::Rgba16Float,
            TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb,
        ];
        assert_eq!(
            pick_surface_format(&formats),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(
            pick_surface_format(&[TextureFormat::Rgba8Unorm]),
            Some(TextureFormat::Rgba8Unorm)
        );
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn vsync_always_uses_fifo() {
        let modes = [PresentMode::Immediate, PresentMode::Mailbox, PresentMode::Fifo];
        assert_eq!(pick_present_mode(&modes, true), PresentMode::Fifo);
        assert_eq!(pick_present_mode(&modes, false), PresentMode::Mailbox);
        assert_eq!(
            pick_present_mode(&[PresentMode::Fifo, PresentMode::Immediate], false),
            PresentMode::Immediate
        );
        assert_eq!(pick_present_mode(&[PresentMode::Fifo], false), PresentMode::Fifo);
    }

    #[test]
    fn opaque_alpha_is_preferred() {
        assert_eq!(
            pick_alpha_mode(&[CompositeAlphaMode::PreMultiplied, CompositeAlphaMode::Opaque]),
            CompositeAlphaMode::Opaque
        );
        assert_eq!(
            pick_alpha_mode(&[CompositeAlphaMode::Inherit]),
            CompositeAlphaMode::Inherit
        );
        assert_eq!(pick_alpha_mode(&[]), CompositeAlphaMode::Auto);
    }

    #[test]
    fn minimized_window_has_no_extent() {
        assert_eq!(surface_extent(0, 720, 8192), None);
        assert_eq!(surface_extent(1280, 0, 8192), None);
        assert_eq!(surface_extent(1280, 720, 8192), Some((1280, 720)));
        assert_eq!(surface_extent(10_000, 720, 8192), Some((8192, 720)));
    }
}
