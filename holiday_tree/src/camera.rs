//! Camera rig and perspective projection for the software renderer.
//!
//! The scene sits in a group offset below the origin.  While scattered the
//! whole group yaws and pitches after the hand; once the tree assembles the
//! camera slowly orbits instead.  Zooming freezes both.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3, Vec4Swizzles};
use serde::Deserialize;
use thiserror::Error;
use tree_morph::interp::approach;
use tree_morph::{HandPosition, MorphState, SceneMode};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub eye: [f32; 3],
    /// Vertical field of view, degrees.
    pub fov_deg: f32,
    /// Translation applied to the whole scene before the rig rotation.
    pub group_offset: [f32; 3],
    /// Yaw at full hand deflection, radians.
    pub yaw_range: f32,
    /// Pitch at full hand deflection, radians.
    pub pitch_range: f32,
    pub follow_speed: f32,
    /// Orbit speed while assembled; one revolution every `60 / auto_rotate` s.
    pub auto_rotate: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            eye: [0.0, 4.0, 20.0],
            fov_deg: 40.0,
            group_offset: [0.0, -3.0, 0.0],
            yaw_range: PI / 3.0,
            pitch_range: PI / 6.0,
            follow_speed: 2.0,
            auto_rotate: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("camera.{field} must be finite (got {value})")]
    NotFinite { field: &'static str, value: f32 },

    #[error("camera.fov_deg must lie strictly between 0 and 180 (got {0})")]
    FieldOfView(f32),

    #[error("camera.{field} must be a non-negative number (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("camera.eye must not sit on the vertical axis through the scene")]
    EyeOnAxis,
}

impl CameraSettings {
    pub fn validate(&self) -> Result<(), CameraError> {
        let scalars = [
            ("eye.x", self.eye[0]),
            ("eye.y", self.eye[1]),
            ("eye.z", self.eye[2]),
            ("group_offset.x", self.group_offset[0]),
            ("group_offset.y", self.group_offset[1]),
            ("group_offset.z", self.group_offset[2]),
            ("auto_rotate", self.auto_rotate),
        ];
        for (field, value) in scalars {
            if !value.is_finite() {
                return Err(CameraError::NotFinite { field, value });
            }
        }
        if !(self.fov_deg > 0.0 && self.fov_deg < 180.0) {
            return Err(CameraError::FieldOfView(self.fov_deg));
        }
        for (field, value) in [
            ("yaw_range", self.yaw_range),
            ("pitch_range", self.pitch_range),
            ("follow_speed", self.follow_speed),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CameraError::Negative { field, value });
            }
        }
        // look_at with +Y up degenerates when the eye is straight above or below.
        if self.eye[0] == 0.0 && self.eye[2] == 0.0 {
            return Err(CameraError::EyeOnAxis);
        }
        Ok(())
    }
}

/// A projected point in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// Distance along the view axis; larger is farther.
    pub depth: f32,
    /// Pixels per world unit at this depth.
    pub scale: f32,
}

const NEAR: f32 = 0.1;
const FAR: f32 = 200.0;

#[derive(Debug, Clone)]
pub struct CameraRig {
    settings: CameraSettings,
    yaw: f32,
    pitch: f32,
    orbit: f32,
}

impl CameraRig {
    pub fn new(settings: CameraSettings) -> Self {
        CameraRig { settings, yaw: 0.0, pitch: 0.0, orbit: 0.0 }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn orbit(&self) -> f32 {
        self.orbit
    }

    pub fn tick(&mut self, mode: SceneMode, hand: HandPosition, dt: f32) {
        let s = &self.settings;
        let (yaw, pitch) = if mode.state == MorphState::Scattered && !mode.zoomed {
            (hand.x * s.yaw_range, hand.y * s.pitch_range)
        } else {
            (0.0, 0.0)
        };
        self.yaw = approach(self.yaw, yaw, s.follow_speed, dt);
        self.pitch = approach(self.pitch, pitch, s.follow_speed, dt);

        if mode.state == MorphState::TreeShape && !mode.zoomed {
            self.orbit = (self.orbit + s.auto_rotate * TAU / 60.0 * dt.max(0.0)) % TAU;
        }
    }

    /// World → scene group → rig rotation → camera orbit.
    fn model(&self) -> Mat4 {
        Mat4::from_rotation_y(-self.orbit)
            * Mat4::from_rotation_x(self.pitch)
            * Mat4::from_rotation_y(self.yaw)
            * Mat4::from_translation(Vec3::from_array(self.settings.group_offset))
    }

    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(Vec3::from_array(self.settings.eye), Vec3::ZERO, Vec3::Y)
    }

    pub fn project(&self, world: Vec3, width: usize, height: usize) -> Option<ScreenPoint> {
        let (w, h) = (width as f32, height as f32);
        let fov = self.settings.fov_deg.to_radians();
        let eye = (self.view() * self.model()).transform_point3(world);
        let depth = -eye.z;
        if depth <= NEAR {
            return None;
        }
        let clip = Mat4::perspective_rh_gl(fov, w / h, NEAR, FAR) * eye.extend(1.0);
        let ndc = clip.xyz() / clip.w;
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * w,
            y: (1.0 - ndc.y) * 0.5 * h,
            depth,
            scale: h * 0.5 / (depth * (fov * 0.5).tan()),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
