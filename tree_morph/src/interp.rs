//! Interpolation between the scattered and assembled layouts.
//!
//! Each group carries one [`Progress`] scalar that decays exponentially
//! toward the state machine's target, and every entity keeps its own
//! scalar at a [`lagged_speed`] so heavy entities trail whichever way the
//! group is heading.  Entity transforms are pure functions of (entity,
//! eased progress, time); photos additionally keep their own
//! pose because zooming pulls one card out of the dual-position scheme.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::config::PhotoConfig;
use crate::gesture::HandPosition;
use crate::morph::{MorphState, SceneMode};
use crate::scene::{Ornament, Particle, Photo};

// ════════════════════════════════════════════════════════════════════════════
// Scalar helpers
// ════════════════════════════════════════════════════════════════════════════

/// Cubic ease-in-out: accelerate through the first half, decelerate through
/// the second.  Input is clamped to `[0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Fraction of the remaining gap closed in `dt` seconds at `speed`.
/// Always in `[0, 1)`, so repeated application never overshoots.
pub fn smoothing_factor(speed: f32, dt: f32) -> f32 {
    if speed <= 0.0 || dt <= 0.0 {
        0.0
    } else {
        1.0 - (-speed * dt).exp()
    }
}

/// Move `current` toward `target` by one frame of exponential smoothing.
pub fn approach(current: f32, target: f32, speed: f32, dt: f32) -> f32 {
    current + (target - current) * smoothing_factor(speed, dt)
}

fn approach_vec(current: Vec3, target: Vec3, speed: f32, dt: f32) -> Vec3 {
    current.lerp(target, smoothing_factor(speed, dt))
}

/// Smoothing speed of one entity inside a group.  `weight` in `[0, 1]`:
/// heavier entities close the gap more slowly, so they trail the group in
/// both directions.  Never below `speed * (1 - spread)`.
pub fn lagged_speed(speed: f32, weight: f32, spread: f32) -> f32 {
    speed * (1.0 - weight.clamp(0.0, 1.0) * spread.clamp(0.0, 0.99))
}

/// A group's distance-to-target scalar.  There is no "arrived" event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    value: f32,
}

impl Progress {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn eased(&self) -> f32 {
        ease_in_out_cubic(self.value)
    }

    pub fn advance(&mut self, target: f32, speed: f32, dt: f32) -> f32 {
        self.value = approach(self.value, target, speed, dt).clamp(0.0, 1.0);
        self.value
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Transform
// ════════════════════════════════════════════════════════════════════════════

/// What the render surface receives per entity per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// XYZ Euler angles, radians.
    pub rotation: Vec3,
    /// Uniform scale.
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Transform { position: Vec3::ZERO, rotation: Vec3::ZERO, scale: 1.0 }
    }
}

impl Transform {
    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn scale3(&self) -> Vec3 {
        Vec3::splat(self.scale)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale3(), self.quat(), self.position)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-entity transforms
// ════════════════════════════════════════════════════════════════════════════

/// Foliage particle.  `t` is the entity's eased progress.
pub fn particle_transform(p: &Particle, t: f32, time: f32, noise_cutoff: f32) -> Transform {
    let mut position = p.position.lerp(t);
    if t < noise_cutoff {
        let fade = 1.0 - t;
        let shimmer = (time * 2.0 + p.seed * 10.0).sin() * 0.1;
        let float_y = (time * 0.5 + p.seed * 5.0).sin() * 0.2;
        position += Vec3::new(shimmer * 0.5, float_y + shimmer * 0.5, shimmer * 0.5) * fade;
    }
    Transform {
        position,
        rotation: Vec3::ZERO,
        scale: 0.5 + p.seed,
    }
}

/// Gift or bauble.  Drifts and spins while scattered, grows slightly when
/// it settles on the tree.
pub fn ornament_transform(o: &Ornament, t: f32, time: f32, noise_cutoff: f32) -> Transform {
    let mut scatter = o.position.scatter;
    let drift = 1.0 - t;
    if t < noise_cutoff {
        let phase = o.id as f32;
        scatter.x += (time + phase).sin() * 0.5 * drift;
        scatter.y += (time * 0.5 + phase).cos() * 0.5 * drift;
    }
    Transform {
        position: scatter.lerp(o.position.tree, t),
        rotation: Vec3::new(
            o.rotation.x + time * 0.1 * drift,
            o.rotation.y + time * 0.2 * drift,
            o.rotation.z,
        ),
        scale: o.scale * (0.8 + 0.2 * t),
    }
}

/// Where a photo wants to be this frame, and how fast it gets there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoTarget {
    pub pose: Transform,
    pub rate: f32,
    /// The zoomed card tracks its tilt at `rate`; everyone else idles.
    pub follows_hand: bool,
}

pub fn photo_target(
    photo: &Photo,
    mode: SceneMode,
    hand: HandPosition,
    active: bool,
    cfg: &PhotoConfig,
) -> PhotoTarget {
    let assembled = mode.state == MorphState::TreeShape;
    let mut pose = Transform {
        position: if assembled { photo.position.tree } else { photo.position.scatter },
        rotation: photo.rotation,
        scale: if assembled { 0.0 } else { cfg.rest_scale },
    };
    let mut rate = cfg.speed;
    let mut follows_hand = false;

    if mode.zoomed {
        if active {
            pose.position = Vec3::from_array(cfg.zoom_anchor)
                + Vec3::new(hand.x * cfg.parallax, hand.y * cfg.parallax, 0.0);
            pose.rotation = Vec3::new(hand.y * cfg.tilt, -hand.x * cfg.tilt, 0.0);
            pose.scale = cfg.zoom_scale;
            rate = cfg.zoom_speed;
            follows_hand = true;
        } else {
            pose.scale = 0.0;
            rate = cfg.hide_speed;
        }
    }
    PhotoTarget { pose, rate, follows_hand }
}

/// Per-tick inputs shared by every group: the machine snapshot, the latest
/// (possibly stale) hand position, and the frame delta in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInput {
    pub mode: SceneMode,
    pub hand: HandPosition,
    pub dt: f32,
}

/// Advance one photo's pose by `input.dt`.  Pure: the caller owns `current`.
///
/// `assembled` is the photo group's eased progress; the idle wobble fades
/// out as the cards tuck into the tree.
pub fn photo_step(
    current: &Transform,
    photo: &Photo,
    active: bool,
    input: &FrameInput,
    time: f32,
    assembled: f32,
    cfg: &PhotoConfig,
) -> Transform {
    let dt = input.dt;
    let target = photo_target(photo, input.mode, input.hand, active, cfg);

    let rotation = if target.follows_hand {
        approach_vec(current.rotation, target.pose.rotation, target.rate, dt)
    } else {
        let phase = photo.id as f32;
        let amplitude = cfg.wobble * (1.0 - assembled.clamp(0.0, 1.0));
        let wobble = Vec3::new(
            (time * 0.5 + phase).sin() * amplitude,
            (time * 0.3 + phase).cos() * amplitude,
            0.0,
        );
        approach_vec(current.rotation, target.pose.rotation + wobble, 1.0, dt)
    };

    Transform {
        position: approach_vec(current.position, target.pose.position, target.rate, dt),
        rotation,
        scale: approach(current.scale, target.pose.scale, target.rate, dt).max(0.0),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::DualPosition;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn photo() -> Photo {
        Photo {
            id: 2,
            position: DualPosition {
                scatter: Vec3::new(4.0, 1.0, -3.0),
                tree: Vec3::new(0.0, 0.5, 0.0),
            },
            rotation: Vec3::new(0.1, -0.1, 0.0),
        }
    }

    fn ornament() -> Ornament {
        Ornament {
            id: 7,
            kind: crate::scene::OrnamentKind::Gift,
            position: DualPosition {
                scatter: Vec3::new(10.0, -4.0, 2.0),
                tree: Vec3::new(1.0, 3.0, 0.5),
            },
            rotation: Vec3::new(0.3, 1.2, 0.0),
            scale: 0.4,
            palette_slot: 0,
            weight: 0.5,
        }
    }

    #[test]
    fn ease_fixed_points() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ease_clamps_input() {
        assert_eq!(ease_in_out_cubic(-2.0), 0.0);
        assert_eq!(ease_in_out_cubic(3.0), 1.0);
    }

    #[test]
    fn progress_rises_monotonically_without_overshoot() {
        let mut p = Progress::default();
        let mut last = p.value();
        for _ in 0..2_000 {
            let v = p.advance(1.0, 1.5, DT);
            assert!(v >= last);
            assert!(v <= 1.0);
            last = v;
        }
        assert!(last > 0.999);
    }

    #[test]
    fn huge_time_step_does_not_overshoot() {
        let mut p = Progress::default();
        p.advance(1.0, 50.0, 10.0);
        assert!(p.value() <= 1.0);
        p.advance(0.0, 50.0, 10.0);
        assert!(p.value() >= 0.0);
    }

    #[test]
    fn heavier_group_trails_lighter_group() {
        let (mut gift, mut bauble) = (Progress::default(), Progress::default());
        for _ in 0..90 {
            gift.advance(1.0, 0.8, DT);
            bauble.advance(1.0, 1.2, DT);
            assert!(gift.value() < bauble.value());
        }
    }

    #[test]
    fn zero_dt_is_identity() {
        assert_eq!(approach(0.3, 1.0, 2.0, 0.0), 0.3);
    }

    #[test]
    fn lagged_speed_bounds() {
        assert_eq!(lagged_speed(1.5, 0.0, 0.15), 1.5);
        assert!((lagged_speed(1.5, 1.0, 0.15) - 1.275).abs() < 1e-6);
        assert_eq!(lagged_speed(1.5, 0.7, 0.0), 1.5);
        // Out-of-range weights clamp.
        assert_eq!(lagged_speed(2.0, 3.0, 0.5), lagged_speed(2.0, 1.0, 0.5));
        assert!(lagged_speed(2.0, 1.0, 5.0) > 0.0);
    }

    #[test]
    fn heavy_entity_trails_in_both_directions() {
        let (heavy_speed, light_speed) = (lagged_speed(1.5, 0.9, 0.2), lagged_speed(1.5, 0.1, 0.2));
        let (mut heavy, mut light) = (Progress::default(), Progress::default());
        for _ in 0..240 {
            heavy.advance(1.0, heavy_speed, DT);
            light.advance(1.0, light_speed, DT);
            assert!(heavy.value() < light.value());
        }
        // Reverse: the heavy entity is still the one further from its target.
        for _ in 0..240 {
            heavy.advance(0.0, heavy_speed, DT);
            light.advance(0.0, light_speed, DT);
            assert!(heavy.value() > light.value());
        }
    }

    #[test]
    fn assembled_ornament_has_no_drift() {
        let o = ornament();
        let a = ornament_transform(&o, 1.0, 3.0, 0.9);
        let b = ornament_transform(&o, 1.0, 47.0, 0.9);
        assert_eq!(a, b);
        assert!((a.position - o.position.tree).length() < 1e-5);
        assert!((a.scale - o.scale).abs() < 1e-6);
    }

    #[test]
    fn scattered_ornament_drifts_and_spins() {
        let o = ornament();
        let a = ornament_transform(&o, 0.0, 1.0, 0.9);
        let b = ornament_transform(&o, 0.0, 2.0, 0.9);
        assert_ne!(a.position, b.position);
        assert!(b.rotation.y > a.rotation.y);
        assert!((a.scale - o.scale * 0.8).abs() < 1e-6);
    }

    #[test]
    fn drift_stops_past_cutoff() {
        let o = ornament();
        let t = 0.95;
        let a = ornament_transform(&o, t, 1.0, 0.9);
        let expect = o.position.scatter.lerp(o.position.tree, t);
        assert!((a.position - expect).length() < 1e-5);
    }

    #[test]
    fn particle_settles_on_tree() {
        let p = Particle {
            position: DualPosition { scatter: Vec3::splat(5.0), tree: Vec3::new(0.0, 2.0, 1.0) },
            seed: 0.25,
        };
        let a = particle_transform(&p, 1.0, 12.0, 0.9);
        assert!((a.position - p.position.tree).length() < 1e-6);
        let b = particle_transform(&p, 0.0, 12.0, 0.9);
        assert!((b.position - p.position.scatter).length() <= 0.35);
    }

    #[test]
    fn zoomed_active_photo_follows_hand() {
        let cfg = PhotoConfig::default();
        let mode = SceneMode { state: MorphState::Scattered, zoomed: true };
        let hand = HandPosition { x: 0.5, y: -0.5 };
        let target = photo_target(&photo(), mode, hand, true, &cfg);
        assert_eq!(target.pose.position, Vec3::new(1.5, 2.5, 16.0));
        assert_eq!(target.pose.scale, 3.5);
        assert_eq!(target.rate, 3.0);

        let input = FrameInput { mode, hand, dt: DT };
        let mut pose = Transform { position: photo().position.scatter, ..Default::default() };
        for _ in 0..600 {
            pose = photo_step(&pose, &photo(), true, &input, 0.0, 0.0, &cfg);
        }
        assert!((pose.position - target.pose.position).length() < 1e-2);
        assert!((pose.scale - 3.5).abs() < 1e-2);
        assert!((pose.rotation.y - (-0.1)).abs() < 1e-2);
    }

    #[test]
    fn zoomed_inactive_photos_shrink_away() {
        let cfg = PhotoConfig::default();
        let mode = SceneMode { state: MorphState::Scattered, zoomed: true };
        let input = FrameInput { mode, hand: HandPosition::CENTER, dt: DT };
        let mut pose = Transform { scale: cfg.rest_scale, ..Default::default() };
        let mut last = pose.scale;
        for _ in 0..300 {
            pose = photo_step(&pose, &photo(), false, &input, 0.0, 0.0, &cfg);
            assert!(pose.scale <= last);
            last = pose.scale;
        }
        assert!(pose.scale < 1e-3);
    }

    #[test]
    fn assembled_photos_hide_in_tree() {
        let cfg = PhotoConfig::default();
        let mode = SceneMode { state: MorphState::TreeShape, zoomed: false };
        let target = photo_target(&photo(), mode, HandPosition::CENTER, true, &cfg);
        assert_eq!(target.pose.scale, 0.0);
        assert_eq!(target.pose.position, photo().position.tree);
        assert!(!target.follows_hand);
    }

    #[test]
    fn wobble_fades_once_assembled() {
        let cfg = PhotoConfig::default();
        let mode = SceneMode { state: MorphState::TreeShape, zoomed: false };
        let input = FrameInput { mode, hand: HandPosition::CENTER, dt: DT };
        let (mut loose, mut tucked) = (Transform::default(), Transform::default());
        for i in 0..600 {
            let time = i as f32 * DT;
            loose = photo_step(&loose, &photo(), false, &input, time, 0.0, &cfg);
            tucked = photo_step(&tucked, &photo(), false, &input, time, 1.0, &cfg);
        }
        assert!((tucked.rotation - photo().rotation).length() < 1e-3);
        assert!((loose.rotation - photo().rotation).length() > 1e-3);
    }

    #[test]
    fn transform_matrix_places_origin() {
        let t = Transform { position: Vec3::new(1.0, 2.0, 3.0), rotation: Vec3::ZERO, scale: 2.0 };
        let p = t.matrix().transform_point3(Vec3::ZERO);
        assert!((p - t.position).length() < 1e-6);
    }

    proptest! {
        #[test]
        fn ease_is_monotone(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(ease_in_out_cubic(lo) <= ease_in_out_cubic(hi) + 1e-6);
        }

        #[test]
        fn approach_stays_between(current in 0.0f32..=1.0, speed in 0.01f32..20.0, dt in 0.0f32..2.0) {
            let up = approach(current, 1.0, speed, dt);
            prop_assert!(up >= current && up <= 1.0 + 1e-6);
            let down = approach(current, 0.0, speed, dt);
            prop_assert!(down <= current && down >= -1e-6);
        }

        #[test]
        fn heavier_is_never_faster(a in 0.0f32..=1.0, b in 0.0f32..=1.0, speed in 0.1f32..10.0, s in 0.0f32..0.9) {
            let (light, heavy) = if a <= b { (a, b) } else { (b, a) };
            let slow = lagged_speed(speed, heavy, s);
            prop_assert!(slow <= lagged_speed(speed, light, s));
            prop_assert!(slow >= speed * (1.0 - s) - 1e-5);
        }
    }
}
