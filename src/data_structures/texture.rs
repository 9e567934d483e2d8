//! Textures: decoded RGBA8 images on the CPU and their GPU counterparts.
//!
//! [`TextureImage`] is the format every texture source converges to, whether it
//! was decoded from a file or produced by a procedural generator. [`Texture`]
//! wraps the uploaded WGPU texture with its view and sampler.

use image::GenericImageView;

use crate::error::{Result, RoomError};

/// Tightly packed RGBA8 pixels, row-major, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Wraps a pixel buffer after checking it holds exactly `width * height * 4` bytes.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>, source_name: &str) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(RoomError::TextureLoad {
                source_name: source_name.to_string(),
                reason: format!(
                    "expected {expected} bytes for {width}x{height} RGBA8, got {}",
                    rgba.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, colour: [u8; 4]) -> Self {
        let rgba = colour
            .iter()
            .cycle()
            .take(width as usize * height as usize * 4)
            .copied()
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    /// Decodes an encoded image file (PNG, JPEG, BMP), guessing the format.
    pub fn decode(bytes: &[u8], source_name: &str) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| RoomError::TextureLoad {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        let (width, height) = img.dimensions();
        Self::new(width, height, img.to_rgba8().into_raw(), source_name)
    }

    pub fn byte_len(&self) -> u64 {
        self.rgba.len() as u64
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing the main pass.
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Square depth target rendered from the light and read back texel by texel
    /// with `textureLoad` in the main pass, hence no sampler.
    pub fn create_shadow_map(device: &wgpu::Device, resolution: u32) -> Self {
        Self::create_depth_texture(device, [resolution, resolution], "shadow_map")
    }

    /// Upload a decoded image as an sRGB colour texture.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &TextureImage,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: img.width,
            height: img.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &img.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * img.width),
                rows_per_image: Some(img.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}
