//! Engine configuration.
//!
//! Every tunable of the renderer, the room and the camera lives in
//! [`EngineConfig`]. Defaults describe a 10x10 m room with a door and a window,
//! lit by a warm afternoon sun.

use cgmath::{Deg, Point3, Vector3};

use crate::data_structures::geometry::{WallOpening, WallSide};

/// Directional light. `direction` points from the light into the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightConfig {
    pub direction: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-0.4, -1.0, -0.3),
            color: [1.0, 0.96, 0.9],
            intensity: 1.0,
        }
    }
}

/// Shadow map and PCF parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowConfig {
    /// Side length of the square depth map.
    pub resolution: u32,
    /// Half extent of the light's orthographic frustum around the room center.
    pub extent: f32,
    pub near: f32,
    pub far: f32,
    /// Distance of the virtual light position from the room center.
    pub distance: f32,
    pub bias: f32,
    /// 1 gives a 3x3 kernel.
    pub pcf_radius: i32,
    /// Fraction of direct light removed in full shadow.
    pub max_attenuation: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            extent: 15.0,
            near: 0.1,
            far: 40.0,
            distance: 20.0,
            bias: 0.005,
            pcf_radius: 1,
            max_attenuation: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialConfig {
    pub ambient: f32,
    pub specular_strength: f32,
    pub shininess: f32,
    pub highlight_color: [f32; 3],
    pub highlight_blend: f32,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            ambient: 0.25,
            specular_strength: 0.3,
            shininess: 32.0,
            highlight_color: [1.0, 0.85, 0.3],
            highlight_blend: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RoomConfig {
    pub size: f32,
    pub wall_height: f32,
    /// Thickness of the wall slabs used for picking.
    pub wall_thickness: f32,
    pub openings: Vec<WallOpening>,
    pub floor_color: [f32; 4],
    pub wall_color: [f32; 4],
    /// Whether clicks can select the floor and walls. When off, clicks on
    /// them fall through to the camera.
    pub selectable_surfaces: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            size: 10.0,
            wall_height: 3.0,
            wall_thickness: 0.1,
            openings: vec![
                WallOpening::door(WallSide::South, 2.5, 1.0, 2.1),
                WallOpening::window(WallSide::North, 0.0, 0.9, 2.0, 1.2),
            ],
            floor_color: [0.62, 0.55, 0.47, 1.0],
            wall_color: [0.88, 0.86, 0.82, 1.0],
            selectable_surfaces: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    pub target: Point3<f32>,
    pub distance: f32,
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Fly speed in units per second.
    pub speed: f32,
    /// Degrees of rotation per pixel of pointer drag.
    pub sensitivity: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target: Point3::new(0.0, 0.5, 0.0),
            distance: 12.0,
            yaw: Deg(90.0),
            pitch: Deg(35.0),
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
            speed: 4.0,
            sensitivity: 0.3,
            min_distance: 1.0,
            max_distance: 40.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_colour: wgpu::Color,
    pub light: LightConfig,
    pub shadow: ShadowConfig,
    pub material: MaterialConfig,
    pub room: RoomConfig,
    pub camera: CameraConfig,
    /// Degrees added by one rotate command.
    pub rotate_step: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Room Designer".to_string(),
            width: 1280,
            height: 720,
            clear_colour: wgpu::Color {
                r: 0.1,
                g: 0.12,
                b: 0.15,
                a: 1.0,
            },
            light: LightConfig::default(),
            shadow: ShadowConfig::default(),
            material: MaterialConfig::default(),
            room: RoomConfig::default(),
            camera: CameraConfig::default(),
            rotate_step: 15.0,
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_clear_colour(mut self, clear_colour: wgpu::Color) -> Self {
        self.clear_colour = clear_colour;
        self
    }

    pub fn with_light(mut self, light: LightConfig) -> Self {
        self.light = light;
        self
    }

    pub fn with_shadow(mut self, shadow: ShadowConfig) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn with_material(mut self, material: MaterialConfig) -> Self {
        self.material = material;
        self
    }

    pub fn with_room(mut self, room: RoomConfig) -> Self {
        self.room = room;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_rotate_step(mut self, degrees: f32) -> Self {
        self.rotate_step = degrees;
        self
    }
}
