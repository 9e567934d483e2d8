use cgmath::{
    ElementWise, EuclideanSpace, InnerSpace, Matrix4, Point3, Vector3, Vector4, ortho,
};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    config::{LightConfig, MaterialConfig, ShadowConfig},
};

/// Sun-like light. `direction` points from the light into the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl From<&LightConfig> for DirectionalLight {
    fn from(config: &LightConfig) -> Self {
        Self {
            direction: config.direction.normalize(),
            color: config.color.into(),
            intensity: config.intensity,
        }
    }
}

/// Light-space projection * view in OpenGL clip convention: an orthographic
/// box of half extent `shadow.extent` around `center`, seen along the light
/// direction.
pub fn light_space_matrix(
    light: &DirectionalLight,
    shadow: &ShadowConfig,
    center: Point3<f32>,
) -> Matrix4<f32> {
    let direction = light.direction.normalize();
    let eye = center - direction * shadow.distance;
    // look_at degenerates when looking straight along the up vector
    let up = if direction.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(eye, center, up);
    let e = shadow.extent;
    ortho(-e, e, -e, e, shadow.near, shadow.far) * view
}

/// Everything the shaders need to light a fragment.
///
/// Matches `struct Light` in the WGSL sources; each vec3 is padded to 16 bytes
/// by the scalar that follows it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Light-space matrix with wgpu's [0, 1] depth range.
    pub view_proj: [[f32; 4]; 4],
    pub direction: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub ambient: f32,
    pub highlight_color: [f32; 3],
    pub highlight_blend: f32,
    pub specular_strength: f32,
    pub shininess: f32,
    pub shadow_bias: f32,
    pub max_attenuation: f32,
    pub pcf_radius: i32,
    _padding: [u32; 3],
}

impl LightUniform {
    pub fn new(
        light: &DirectionalLight,
        shadow: &ShadowConfig,
        material: &MaterialConfig,
        center: Point3<f32>,
    ) -> Self {
        Self {
            view_proj: (OPENGL_TO_WGPU_MATRIX * light_space_matrix(light, shadow, center)).into(),
            direction: light.direction.normalize().into(),
            intensity: light.intensity,
            color: light.color.into(),
            ambient: material.ambient,
            highlight_color: material.highlight_color,
            highlight_blend: material.highlight_blend,
            specular_strength: material.specular_strength,
            shininess: material.shininess,
            shadow_bias: shadow.bias,
            max_attenuation: shadow.max_attenuation,
            pcf_radius: shadow.pcf_radius,
            _padding: [0; 3],
        }
    }
}

/// The light uniform buffer and its bind group, shared by both passes.
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, uniform: LightUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

/// Projects `world_position` into shadow-map space: x and y as texture
/// coordinates (v pointing down), z as depth in [0, 1]. Points behind the
/// light's projection return `None`.
pub fn shadow_map_coords(
    light_space: &Matrix4<f32>,
    world_position: Point3<f32>,
) -> Option<Vector3<f32>> {
    let clip: Vector4<f32> = light_space * world_position.to_homogeneous();
    if clip.w.abs() < f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(Vector3::new(
        ndc.x * 0.5 + 0.5,
        -ndc.y * 0.5 + 0.5,
        ndc.z * 0.5 + 0.5,
    ))
}

/// Fraction of PCF taps in shadow, in [0, 1].
///
/// `light_space` is the OpenGL-convention matrix from [`light_space_matrix`];
/// `depth_at(x, y)` reads the shadow map texel. Fragments projecting outside
/// the unit cube are never shadowed.
pub fn shadow_factor<F>(
    light_space: &Matrix4<f32>,
    world_position: Point3<f32>,
    resolution: u32,
    shadow: &ShadowConfig,
    depth_at: F,
) -> f32
where
    F: Fn(u32, u32) -> f32,
{
    let Some(coords) = shadow_map_coords(light_space, world_position) else {
        return 0.0;
    };
    let inside = |c: f32| (0.0..=1.0).contains(&c);
    if !(inside(coords.x) && inside(coords.y) && inside(coords.z)) || resolution == 0 {
        return 0.0;
    }
    let last = resolution as i64 - 1;
    let texel_x = ((coords.x * resolution as f32) as i64).clamp(0, last);
    let texel_y = ((coords.y * resolution as f32) as i64).clamp(0, last);
    let radius = shadow.pcf_radius.max(0) as i64;

    let mut shadowed = 0u32;
    let mut taps = 0u32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let x = (texel_x + dx).clamp(0, last) as u32;
            let y = (texel_y + dy).clamp(0, last) as u32;
            if coords.z - shadow.bias > depth_at(x, y) {
                shadowed += 1;
            }
            taps += 1;
        }
    }
    shadowed as f32 / taps as f32
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub albedo: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub position: Point3<f32>,
    pub shadow: f32,
    pub selected: bool,
}

/// Phong shading of one fragment, as done by the main pass.
pub fn shade_fragment(
    light: &DirectionalLight,
    material: &MaterialConfig,
    max_attenuation: f32,
    view_position: Point3<f32>,
    fragment: &Fragment,
) -> Vector3<f32> {
    let normal = fragment.normal.normalize();
    let light_dir = light.direction.normalize();
    let view_dir = (view_position - fragment.position).normalize();
    let radiance = light.color * light.intensity;

    let diffuse_strength = normal.dot(-light_dir).max(0.0);
    let diffuse = radiance.mul_element_wise(fragment.albedo) * diffuse_strength;

    let reflected = light_dir - normal * 2.0 * normal.dot(light_dir);
    let specular_strength = view_dir.dot(reflected).max(0.0).powf(material.shininess);
    let specular = radiance * specular_strength * material.specular_strength;

    let ambient = fragment.albedo * material.ambient;
    let lit = ambient + (diffuse + specular) * (1.0 - fragment.shadow * max_attenuation);

    if fragment.selected {
        let highlight = Vector3::from(material.highlight_color);
        lit + (highlight - lit) * material.highlight_blend
    } else {
        lit
    }
}

/// Center of the shadow frustum for a room with walls `room_height` tall.
pub fn shadow_center(room_height: f32) -> Point3<f32> {
    Point3::origin() + Vector3::new(0.0, room_height * 0.5, 0.0)
}
