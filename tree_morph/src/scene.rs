//! Entity sets and the per-frame driver.
//!
//! A [`MorphScene`] is generated once from a [`MorphConfig`]: every entity
//! gets its scatter/tree pair and static traits, and the counts never change
//! afterwards.  Each call to [`MorphScene::tick`] advances the progress
//! scalars (one per group, one per entity) and rewrites the output
//! transforms; nothing else mutates.

use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;
use tracing::debug;

use crate::config::{GroupConfig, MorphConfig};
use crate::interp::{
    lagged_speed, ornament_transform, particle_transform, photo_step,
    FrameInput, Progress, Transform,
};
use crate::sampler::DualPosition;

// ════════════════════════════════════════════════════════════════════════════
// Entities
// ════════════════════════════════════════════════════════════════════════════

/// One foliage point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: DualPosition,
    /// Uniform in `[0, 1)`; drives shimmer phase, point size, and lag.
    pub seed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrnamentKind {
    Gift,
    Bauble,
}

impl OrnamentKind {
    /// Upper bound of the random base scale (plus a 0.1 floor).
    fn scale_range(self) -> f32 {
        match self {
            OrnamentKind::Gift => 0.4,
            OrnamentKind::Bauble => 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ornament {
    pub id: usize,
    pub kind: OrnamentKind,
    pub position: DualPosition,
    /// Rest rotation (XYZ Euler, radians).
    pub rotation: Vec3,
    pub scale: f32,
    /// Index into the renderer's palette for this kind (0..3).
    pub palette_slot: u8,
    /// Per-entity lag factor in `[0, 1]`.
    pub weight: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photo {
    pub id: usize,
    pub position: DualPosition,
    pub rotation: Vec3,
}

/// Number of colours the renderer provides per ornament kind.
pub const PALETTE_SLOTS: u8 = 3;

/// How far an entity trails its group, in `[0, 1]`.
pub trait Weighted {
    fn weight(&self) -> f32;
}

impl Weighted for Particle {
    fn weight(&self) -> f32 {
        self.seed
    }
}

impl Weighted for Ornament {
    fn weight(&self) -> f32 {
        self.weight
    }
}

/// Photos move as individual poses and never lag.
impl Weighted for Photo {
    fn weight(&self) -> f32 {
        0.0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Groups
// ════════════════════════════════════════════════════════════════════════════

/// A homogeneous set sharing one speed.  The group scalar moves at that
/// speed; each member moves at its [`lagged_speed`].
#[derive(Debug, Clone)]
pub struct Group<E> {
    entities: Vec<E>,
    transforms: Vec<Transform>,
    progress: Progress,
    members: Vec<Progress>,
    speed: f32,
}

impl<E: Weighted> Group<E> {
    fn new(entities: Vec<E>, speed: f32, rest: impl Fn(&E) -> Transform) -> Self {
        let transforms = entities.iter().map(rest).collect();
        let members = vec![Progress::default(); entities.len()];
        Group { entities, transforms, progress: Progress::default(), members, speed }
    }

    fn advance(&mut self, target: f32, spread: f32, dt: f32) {
        self.progress.advance(target, self.speed, dt);
        for (m, e) in self.members.iter_mut().zip(&self.entities) {
            m.advance(target, lagged_speed(self.speed, e.weight(), spread), dt);
        }
    }
}

impl<E> Group<E> {
    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    /// Output of the most recent tick, index-aligned with `entities()`.
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Per-entity progress, index-aligned with `entities()`.
    pub fn member_progress(&self) -> &[Progress] {
        &self.members
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&E, &Transform)> {
        self.entities.iter().zip(self.transforms.iter())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MorphScene
// ════════════════════════════════════════════════════════════════════════════

pub struct MorphScene {
    config: MorphConfig,
    particles: Group<Particle>,
    gifts: Group<Ornament>,
    baubles: Group<Ornament>,
    photos: Group<Photo>,
    time: f32,
}

impl MorphScene {
    /// Sample every entity once.  The config is assumed validated.
    pub fn generate<R: Rng + ?Sized>(config: &MorphConfig, rng: &mut R) -> Self {
        let pc = &config.particles;
        let particles = (0..pc.count)
            .map(|_| Particle {
                position: DualPosition::sample(rng, &pc.scatter, &pc.tree),
                seed: rng.random(),
            })
            .collect();

        let gifts = generate_ornaments(rng, &config.gifts, OrnamentKind::Gift);
        let baubles = generate_ornaments(rng, &config.baubles, OrnamentKind::Bauble);

        let ph = &config.photos;
        let photos: Vec<Photo> = (0..ph.count)
            .map(|id| Photo {
                id,
                position: DualPosition::sample(rng, &ph.scatter, &ph.tree),
                rotation: Vec3::new(
                    (rng.random::<f32>() * 2.0 - 1.0) * ph.rest_tilt,
                    (rng.random::<f32>() * 2.0 - 1.0) * ph.rest_tilt,
                    0.0,
                ),
            })
            .collect();

        debug!(
            particles = pc.count,
            gifts = config.gifts.count,
            baubles = config.baubles.count,
            photos = ph.count,
            "generated morph scene"
        );

        let noise = config.noise_cutoff;
        let rest_scale = ph.rest_scale;
        MorphScene {
            particles: Group::new(particles, pc.speed, |p| particle_transform(p, 0.0, 0.0, noise)),
            gifts: Group::new(gifts, config.gifts.speed, |o| ornament_transform(o, 0.0, 0.0, noise)),
            baubles: Group::new(baubles, config.baubles.speed, |o| {
                ornament_transform(o, 0.0, 0.0, noise)
            }),
            photos: Group::new(photos, ph.speed, |p| Transform {
                position: p.position.scatter,
                rotation: p.rotation,
                scale: rest_scale,
            }),
            config: config.clone(),
            time: 0.0,
        }
    }

    /// Advance the clock and every group by `input.dt` seconds.
    pub fn tick(&mut self, input: &FrameInput) {
        let dt = input.dt.max(0.0);
        self.time += dt;
        let time = self.time;
        let target = input.mode.state.target();
        let spread = self.config.stagger;
        let cutoff = self.config.noise_cutoff;

        let g = &mut self.particles;
        g.advance(target, spread, dt);
        for ((out, e), m) in g.transforms.iter_mut().zip(&g.entities).zip(&g.members) {
            *out = particle_transform(e, m.eased(), time, cutoff);
        }

        for g in [&mut self.gifts, &mut self.baubles] {
            g.advance(target, spread, dt);
            for ((out, e), m) in g.transforms.iter_mut().zip(&g.entities).zip(&g.members) {
                *out = ornament_transform(e, m.eased(), time, cutoff);
            }
        }

        // Photos keep individual poses; the group scalar damps the idle
        // wobble.
        let ph = &self.config.photos;
        let g = &mut self.photos;
        g.advance(target, spread, dt);
        let assembled = g.progress.eased();
        let step = FrameInput { dt, ..*input };
        for (out, e) in g.transforms.iter_mut().zip(&g.entities) {
            *out = photo_step(out, e, e.id == ph.active_index, &step, time, assembled, ph);
        }
    }

    pub fn particles(&self) -> &Group<Particle> {
        &self.particles
    }

    pub fn gifts(&self) -> &Group<Ornament> {
        &self.gifts
    }

    pub fn baubles(&self) -> &Group<Ornament> {
        &self.baubles
    }

    pub fn photos(&self) -> &Group<Photo> {
        &self.photos
    }

    pub fn active_photo(&self) -> usize {
        self.config.photos.active_index
    }

    pub fn config(&self) -> &MorphConfig {
        &self.config
    }

    /// Seconds of animation time elapsed.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Total entity count across all groups.
    pub fn entity_count(&self) -> usize {
        self.particles.len() + self.gifts.len() + self.baubles.len() + self.photos.len()
    }
}

fn generate_ornaments<R: Rng + ?Sized>(
    rng: &mut R,
    cfg: &GroupConfig,
    kind: OrnamentKind,
) -> Vec<Ornament> {
    (0..cfg.count)
        .map(|id| Ornament {
            id,
            kind,
            position: DualPosition::sample(rng, &cfg.scatter, &cfg.tree),
            rotation: Vec3::new(rng.random::<f32>() * PI, rng.random::<f32>() * PI, 0.0),
            scale: rng.random::<f32>() * kind.scale_range() + 0.1,
            palette_slot: rng.random_range(0..PALETTE_SLOTS),
            weight: rng.random(),
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::HandPosition;
    use crate::morph::{MorphState, SceneMode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 1.0 / 60.0;

    fn small_config() -> MorphConfig {
        let mut c = MorphConfig::default();
        c.particles.count = 400;
        c.gifts.count = 30;
        c.baubles.count = 60;
        c
    }

    fn scene() -> MorphScene {
        MorphScene::generate(&small_config(), &mut StdRng::seed_from_u64(42))
    }

    fn input(state: MorphState, zoomed: bool) -> FrameInput {
        FrameInput {
            mode: SceneMode { state, zoomed },
            hand: HandPosition::CENTER,
            dt: DT,
        }
    }

    #[test]
    fn counts_match_config_and_never_change() {
        let mut s = scene();
        assert_eq!(s.particles().len(), 400);
        assert_eq!(s.gifts().len(), 30);
        assert_eq!(s.baubles().len(), 60);
        assert_eq!(s.photos().len(), 5);
        for _ in 0..30 {
            s.tick(&input(MorphState::TreeShape, false));
        }
        assert_eq!(s.entity_count(), 495);
        assert_eq!(s.particles().transforms().len(), 400);
    }

    #[test]
    fn ornament_traits_in_range() {
        let s = scene();
        for o in s.gifts().entities() {
            assert_eq!(o.kind, OrnamentKind::Gift);
            assert!(o.scale >= 0.1 && o.scale <= 0.5);
            assert!(o.palette_slot < PALETTE_SLOTS);
            assert!((0.0..1.0).contains(&o.weight));
        }
        for o in s.baubles().entities() {
            assert!(o.scale <= 0.35);
        }
    }

    #[test]
    fn samples_are_fixed_for_the_lifetime() {
        let mut s = scene();
        let before: Vec<DualPosition> = s.gifts().entities().iter().map(|o| o.position).collect();
        for _ in 0..120 {
            s.tick(&input(MorphState::TreeShape, false));
        }
        let after: Vec<DualPosition> = s.gifts().entities().iter().map(|o| o.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn gifts_trail_baubles_during_assembly() {
        let mut s = scene();
        for _ in 0..60 {
            s.tick(&input(MorphState::TreeShape, false));
            assert!(s.gifts().progress().value() < s.baubles().progress().value());
        }
    }

    fn heaviest_and_lightest_particle(s: &MorphScene) -> (usize, usize) {
        let seeds: Vec<f32> = s.particles().entities().iter().map(|p| p.seed).collect();
        let mut heavy = 0;
        let mut light = 0;
        for (i, &w) in seeds.iter().enumerate() {
            if w > seeds[heavy] {
                heavy = i;
            }
            if w < seeds[light] {
                light = i;
            }
        }
        (heavy, light)
    }

    #[test]
    fn heavy_particle_leaves_the_tree_last() {
        let mut s = scene();
        let (heavy, light) = heaviest_and_lightest_particle(&s);
        for _ in 0..120 {
            s.tick(&input(MorphState::TreeShape, false));
            let m = s.particles().member_progress();
            assert!(m[heavy].value() <= m[light].value());
        }
        for _ in 0..60 * 15 {
            s.tick(&input(MorphState::TreeShape, false));
        }
        for _ in 0..240 {
            s.tick(&input(MorphState::Scattered, false));
            let m = s.particles().member_progress();
            assert!(m[heavy].value() >= m[light].value());
        }
        let m = s.particles().member_progress();
        assert!(m[heavy].value() > m[light].value());
    }

    #[test]
    fn photo_group_progress_follows_state() {
        let mut s = scene();
        for _ in 0..60 * 10 {
            s.tick(&input(MorphState::TreeShape, false));
        }
        assert!(s.photos().progress().value() > 0.99);
        assert!(s.photos().member_progress().iter().all(|m| *m == s.photos().progress()));
    }

    #[test]
    fn assembly_converges_onto_tree() {
        let mut s = scene();
        for _ in 0..60 * 20 {
            s.tick(&input(MorphState::TreeShape, false));
        }
        for (o, t) in s.baubles().iter() {
            assert!((t.position - o.position.tree).length() < 1e-2);
        }
        for t in s.photos().transforms() {
            assert!(t.scale < 1e-3);
        }
    }

    #[test]
    fn scatter_returns_progress_to_zero() {
        let mut s = scene();
        for _ in 0..600 {
            s.tick(&input(MorphState::TreeShape, false));
        }
        let mut last = s.particles().progress().value();
        for _ in 0..600 {
            s.tick(&input(MorphState::Scattered, false));
            let v = s.particles().progress().value();
            assert!(v <= last);
            last = v;
        }
        assert!(last < 1e-3);
    }

    #[test]
    fn zoom_singles_out_the_active_photo() {
        let mut s = scene();
        for _ in 0..600 {
            s.tick(&input(MorphState::Scattered, true));
        }
        let active = s.active_photo();
        for (i, t) in s.photos().transforms().iter().enumerate() {
            if i == active {
                assert!((t.scale - 3.5).abs() < 1e-2);
                assert!((t.position - Vec3::new(0.0, 4.0, 16.0)).length() < 1e-2);
            } else {
                assert!(t.scale < 1e-3, "photo {} still visible", i);
            }
        }
    }

    #[test]
    fn negative_dt_does_not_rewind() {
        let mut s = scene();
        s.tick(&input(MorphState::TreeShape, false));
        let p = s.gifts().progress().value();
        let time = s.time();
        s.tick(&FrameInput { dt: -1.0, ..input(MorphState::Scattered, false) });
        assert_eq!(s.gifts().progress().value(), p);
        assert_eq!(s.time(), time);
    }
}
