//! Camera rig, projection and input controller.
//!
//! All matrices produced here follow the OpenGL clip convention (NDC depth in
//! [-1, 1]) so they can be inverted for picking as they are. Only the GPU upload
//! in [`CameraUniform`] folds in [`OPENGL_TO_WGPU_MATRIX`].

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use instant::Duration;
use winit::keyboard::KeyCode;

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraMode {
    /// Circles `target`; yaw and pitch give the direction from the target to the eye.
    Orbit {
        target: Point3<f32>,
        distance: f32,
        yaw: Rad<f32>,
        pitch: Rad<f32>,
    },
    /// Free flight; yaw and pitch give the viewing direction.
    Fly {
        position: Point3<f32>,
        yaw: Rad<f32>,
        pitch: Rad<f32>,
    },
}

fn direction(yaw: Rad<f32>, pitch: Rad<f32>) -> Vector3<f32> {
    let (sin_pitch, cos_pitch) = pitch.0.sin_cos();
    let (sin_yaw, cos_yaw) = yaw.0.sin_cos();
    Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Zero sizes (minimised windows) keep the previous aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Viewer state shared by both render passes and the picker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraRig {
    pub mode: CameraMode,
    pub projection: Projection,
    /// Orbit distance restored when switching back from fly mode.
    orbit_distance: f32,
}

impl CameraRig {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            mode: CameraMode::Orbit {
                target: config.target,
                distance: config.distance,
                yaw: config.yaw.into(),
                pitch: config.pitch.into(),
            },
            projection: Projection::new(width, height, config.fovy, config.znear, config.zfar),
            orbit_distance: config.distance,
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        match self.mode {
            CameraMode::Orbit {
                target,
                distance,
                yaw,
                pitch,
            } => target + direction(yaw, pitch) * distance,
            CameraMode::Fly { position, .. } => position,
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        match self.mode {
            CameraMode::Orbit { yaw, pitch, .. } => -direction(yaw, pitch),
            CameraMode::Fly { yaw, pitch, .. } => direction(yaw, pitch),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.eye(), self.forward(), Vector3::unit_y())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.calc_matrix()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    pub fn is_orbit(&self) -> bool {
        matches!(self.mode, CameraMode::Orbit { .. })
    }

    /// Switches between orbit and fly mode without moving the eye.
    pub fn toggle_mode(&mut self) {
        let eye = self.eye();
        let forward = self.forward();
        let yaw = Rad(forward.z.atan2(forward.x));
        let pitch = Rad(forward.y.clamp(-1.0, 1.0).asin());
        self.mode = match self.mode {
            CameraMode::Orbit { distance, .. } => {
                self.orbit_distance = distance;
                CameraMode::Fly {
                    position: eye,
                    yaw,
                    pitch,
                }
            }
            CameraMode::Fly { .. } => CameraMode::Orbit {
                target: eye + forward * self.orbit_distance,
                distance: self.orbit_distance,
                yaw: yaw + Rad(std::f32::consts::PI),
                pitch: -pitch,
            },
        };
        log::info!(
            "Camera switched to {} mode",
            if self.is_orbit() { "orbit" } else { "fly" }
        );
    }
}

/// Camera data as the shaders see it.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, rig: &CameraRig) {
        self.view_position = rig.eye().to_homogeneous().into();
        self.view_proj =
            (OPENGL_TO_WGPU_MATRIX * rig.projection_matrix() * rig.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates input between frames and applies it in [`update`](Self::update).
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
    speed: f32,
    sensitivity: f32,
    min_distance: f32,
    max_distance: f32,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            scroll: 0.0,
            speed: config.speed,
            sensitivity: config.sensitivity,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
        }
    }

    /// Returns whether the key is a movement key.
    pub fn process_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let amount = if pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.amount_forward = amount;
                true
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.amount_backward = amount;
                true
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.amount_left = amount;
                true
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.amount_right = amount;
                true
            }
            KeyCode::KeyE | KeyCode::Space => {
                self.amount_up = amount;
                true
            }
            KeyCode::KeyQ | KeyCode::ShiftLeft => {
                self.amount_down = amount;
                true
            }
            _ => false,
        }
    }

    /// Pointer drag in pixels.
    pub fn process_drag(&mut self, dx: f32, dy: f32) {
        self.rotate_horizontal += dx;
        self.rotate_vertical += dy;
    }

    /// Positive values zoom in.
    pub fn process_scroll(&mut self, delta: f32) {
        self.scroll += delta;
    }

    pub fn update(&mut self, rig: &mut CameraRig, dt: Duration) {
        let dt = dt.as_secs_f32();
        let turn = Rad::from(cgmath::Deg(self.sensitivity));
        let strafe = self.amount_right - self.amount_left;
        let advance = self.amount_forward - self.amount_backward;
        let climb = self.amount_up - self.amount_down;

        match &mut rig.mode {
            CameraMode::Orbit {
                distance,
                yaw,
                pitch,
                ..
            } => {
                *yaw += turn * self.rotate_horizontal + Rad(strafe * dt);
                *pitch += turn * self.rotate_vertical;
                *pitch = Rad(pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
                *distance -= (self.scroll + advance * dt * self.speed) * distance.max(1.0) * 0.1;
                *distance = distance.clamp(self.min_distance, self.max_distance);
            }
            CameraMode::Fly {
                position,
                yaw,
                pitch,
            } => {
                let (yaw_sin, yaw_cos) = yaw.0.sin_cos();
                let forward = Vector3::new(yaw_cos, 0.0, yaw_sin).normalize();
                let right = Vector3::new(-yaw_sin, 0.0, yaw_cos).normalize();
                *position += forward * advance * self.speed * dt;
                *position += right * strafe * self.speed * dt;
                *position += direction(*yaw, *pitch) * self.scroll * self.speed * 0.1;
                position.y += climb * self.speed * dt;

                *yaw += turn * self.rotate_horizontal;
                *pitch -= turn * self.rotate_vertical;
                *pitch = Rad(pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
            }
        }

        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;
        self.scroll = 0.0;
    }
}

/// GPU side of the camera: uniform buffer and bind group.
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, rig: &CameraRig) -> Self {
        use wgpu::util::DeviceExt;

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(rig);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("camera_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, rig: &CameraRig) {
        self.uniform.update_view_proj(rig);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
