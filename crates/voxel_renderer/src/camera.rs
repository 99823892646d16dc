//! Orbit camera.
//!
//! The camera is described by a focus point, a yaw/pitch rotation and a signed
//! offset along the resulting front vector. Every call to [`orient`] derives
//! the basis and matrices from scratch; nothing is cached between frames.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec2, Vec3};

/// Vertical field of view in radians.
pub const FIELD_OF_VIEW: f32 = 1.0;
pub const NEAR_PLANE: f32 = 1e-4;
pub const FAR_PLANE: f32 = 5000.0;

/// Pitch is kept this far away from straight up/down, where the basis degenerates.
const PITCH_MARGIN: f32 = 0.01;
const MIN_OFFSET: f32 = 0.05;

/// Orthonormal camera axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub front: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl CameraBasis {
    /// Builds the basis for `rotation = (yaw, pitch)` in radians.
    ///
    /// Yaw is offset by a quarter turn so a zero rotation faces +Z. The right
    /// and up vectors are undefined when front is parallel to world up.
    pub fn from_rotation(rotation: Vec2) -> Self {
        let pitch = rotation.y;
        let yaw = rotation.x + 90f32.to_radians();
        let front = Vec3::new(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        )
        .normalize();
        let right = front.cross(Vec3::Y).normalize();
        let up = right.cross(front).normalize();
        Self { front, right, up }
    }
}

/// Everything a frame needs from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub basis: CameraBasis,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Places the camera `offset` units from `focus` along the front vector.
///
/// The camera looks along front, so a negative offset puts it behind the
/// focus point looking at it. `aspect` must be positive.
pub fn orient(focus: Vec3, rotation: Vec2, offset: f32, aspect: f32) -> CameraPose {
    let basis = CameraBasis::from_rotation(rotation);
    let position = focus + basis.front * offset;
    let view = Mat4::look_at_rh(position, position + basis.front, basis.up);
    let projection = Mat4::perspective_rh(FIELD_OF_VIEW, aspect, NEAR_PLANE, FAR_PLANE);
    CameraPose {
        position,
        basis,
        view,
        projection,
    }
}

/// Mutable orbit state driven by the input layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub offset: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            offset: -3.0,
        }
    }
}

impl OrbitCamera {
    pub fn new(focus: Vec3, yaw: f32, pitch: f32, offset: f32) -> Self {
        Self {
            focus,
            yaw,
            pitch: clamp_pitch(pitch),
            offset,
        }
    }

    pub fn rotation(&self) -> Vec2 {
        Vec2::new(self.yaw, self.pitch)
    }

    pub fn rotate_by(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = clamp_pitch(self.pitch + delta_pitch);
    }

    /// Scales the distance to the focus point by `exp(-delta)`.
    ///
    /// The sign of the offset (which side of the focus the camera sits on) is
    /// preserved, and the magnitude never drops below a small minimum.
    pub fn zoom_by(&mut self, delta: f32) {
        let sign = if self.offset < 0.0 { -1.0 } else { 1.0 };
        let magnitude = (self.offset.abs() * (-delta).exp()).max(MIN_OFFSET);
        self.offset = sign * magnitude;
    }

    pub fn orient(&self, aspect: f32) -> CameraPose {
        orient(self.focus, self.rotation(), self.offset, aspect)
    }
}

fn clamp_pitch(pitch: f32) -> f32 {
    let limit = FRAC_PI_2 - PITCH_MARGIN;
    pitch.clamp(-limit, limit)
}
