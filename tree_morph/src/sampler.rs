//! Spatial sampling of the two canonical layouts.
//!
//! Every entity gets exactly one scatter sample (solid sphere) and one tree
//! sample (solid cone) when the scene is built.  The samples are kept for the
//! entity's lifetime; nothing here is called per frame.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::Deserialize;

/// Uniform-by-volume sample inside a solid sphere of `radius`.
///
/// Polar angle from `acos(2v - 1)`, azimuth uniform in `[0, 2π)`, and the
/// radial distance from the cube root of a uniform variable so that shells
/// are weighted by their volume.
pub fn sample_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let theta = TAU * rng.random::<f32>();
    let phi = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    let r = rng.random::<f32>().cbrt() * radius;
    let sin_phi = phi.sin();
    Vec3::new(
        r * sin_phi * theta.cos(),
        r * sin_phi * theta.sin(),
        r * phi.cos(),
    )
}

/// Sample inside a solid cone standing on its base, apex up.
///
/// Height is uniform, the cross-section radius shrinks linearly to zero at
/// the apex, and the radial position uses the square-root rule so each
/// cross-section is covered uniformly by area.  The result is centred
/// vertically on `vertical_offset`.
pub fn sample_cone<R: Rng + ?Sized>(
    rng: &mut R,
    height: f32,
    base_radius: f32,
    vertical_offset: f32,
) -> Vec3 {
    let y = rng.random::<f32>() * height;
    let radius_at_y = base_radius * (1.0 - y / height);
    let theta = TAU * rng.random::<f32>();
    let r = radius_at_y * rng.random::<f32>().sqrt();
    Vec3::new(
        r * theta.cos(),
        y - height / 2.0 + vertical_offset,
        r * theta.sin(),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Shape parameters
// ════════════════════════════════════════════════════════════════════════════

/// The scattered layout: a solid sphere.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SphereShape {
    pub radius: f32,
}

impl Default for SphereShape {
    fn default() -> Self {
        SphereShape { radius: 15.0 }
    }
}

impl SphereShape {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        sample_sphere(rng, self.radius)
    }
}

/// The tree layout: a solid cone.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConeShape {
    pub height: f32,
    pub base_radius: f32,
    pub offset: f32,
}

impl Default for ConeShape {
    fn default() -> Self {
        ConeShape { height: 10.0, base_radius: 3.5, offset: 2.0 }
    }
}

impl ConeShape {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        sample_cone(rng, self.height, self.base_radius, self.offset)
    }
}

/// The immutable scatter/tree pair owned by every entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualPosition {
    pub scatter: Vec3,
    pub tree: Vec3,
}

impl DualPosition {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, scatter: &SphereShape, tree: &ConeShape) -> Self {
        DualPosition {
            scatter: scatter.sample(rng),
            tree: tree.sample(rng),
        }
    }

    /// Straight blend; `t = 0` is scattered, `t = 1` is assembled.
    pub fn lerp(&self, t: f32) -> Vec3 {
        self.scatter.lerp(self.tree, t)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const N: usize = 20_000;

    #[test]
    fn sphere_samples_stay_inside_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..N {
            let p = sample_sphere(&mut rng, 15.0);
            assert!(p.length() <= 15.0 + 1e-4, "{:?} escaped the sphere", p);
        }
    }

    #[test]
    fn sphere_is_uniform_by_volume() {
        // (d/R)^3 is uniform on [0,1] for a volume-uniform sample.
        let mut rng = StdRng::seed_from_u64(11);
        let radius = 4.0;
        let mut bins = [0usize; 10];
        for _ in 0..N {
            let u = (sample_sphere(&mut rng, radius).length() / radius).powi(3);
            bins[((u * 10.0) as usize).min(9)] += 1;
        }
        let expected = N as f32 / 10.0;
        for (i, &count) in bins.iter().enumerate() {
            let dev = (count as f32 - expected).abs() / expected;
            assert!(dev < 0.1, "bin {} holds {} samples (expected ~{})", i, count, expected);
        }
    }

    #[test]
    fn sphere_is_not_biased_toward_an_axis() {
        let mut rng = StdRng::seed_from_u64(3);
        let mean = (0..N)
            .map(|_| sample_sphere(&mut rng, 1.0))
            .fold(Vec3::ZERO, |acc, p| acc + p)
            / N as f32;
        assert!(mean.length() < 0.03, "mean drifted to {:?}", mean);
    }

    #[test]
    fn cone_samples_respect_height_band() {
        let mut rng = StdRng::seed_from_u64(5);
        let (h, offset) = (10.0, 2.0);
        for _ in 0..N {
            let p = sample_cone(&mut rng, h, 3.5, offset);
            assert!(p.y >= -h / 2.0 + offset - 1e-4);
            assert!(p.y <= h / 2.0 + offset + 1e-4);
        }
    }

    #[test]
    fn cone_radius_shrinks_toward_apex() {
        let mut rng = StdRng::seed_from_u64(9);
        let (h, base, offset) = (9.0, 3.2, 2.2);
        for _ in 0..N {
            let p = sample_cone(&mut rng, h, base, offset);
            let normalized = (p.y - (offset - h / 2.0)) / h;
            let radial = (p.x * p.x + p.z * p.z).sqrt();
            assert!(
                radial <= base * (1.0 - normalized) + 1e-4,
                "radial {} too wide at height {}",
                radial,
                normalized
            );
        }
    }

    #[test]
    fn cone_heights_are_uniform() {
        let mut rng = StdRng::seed_from_u64(13);
        let below_mid = (0..N)
            .filter(|_| sample_cone(&mut rng, 10.0, 3.5, 0.0).y < 0.0)
            .count();
        let frac = below_mid as f32 / N as f32;
        assert!((frac - 0.5).abs() < 0.02, "lower half holds {}", frac);
    }

    #[test]
    fn dual_position_lerp_endpoints() {
        let mut rng = StdRng::seed_from_u64(1);
        let d = DualPosition::sample(&mut rng, &SphereShape::default(), &ConeShape::default());
        assert_eq!(d.lerp(0.0), d.scatter);
        assert!((d.lerp(1.0) - d.tree).length() < 1e-5);
    }
}
