//! Construction parameters for a morph scene.
//!
//! Everything here is fixed once the scene is built.  All structs derive
//! `Deserialize` with `#[serde(default)]`, so a TOML file only needs the keys
//! it wants to change.  Note that a partially written group table is filled
//! from [`GroupConfig::default`] (the particle defaults), not from the
//! defaults of that particular group.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::gesture::GestureThresholds;
use crate::sampler::{ConeShape, SphereShape};

/// One homogeneous entity group (particle cloud, gifts, baubles).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub count: usize,
    /// Smoothing rate toward the target, per second.  Lower = heavier.
    pub speed: f32,
    pub scatter: SphereShape,
    pub tree: ConeShape,
}

impl Default for GroupConfig {
    fn default() -> Self {
        GroupConfig {
            count: 12_000,
            speed: 1.5,
            scatter: SphereShape { radius: 15.0 },
            tree: ConeShape { height: 10.0, base_radius: 3.5, offset: 2.0 },
        }
    }
}

impl GroupConfig {
    fn ornaments(count: usize, speed: f32) -> Self {
        GroupConfig {
            count,
            speed,
            scatter: SphereShape { radius: 18.0 },
            tree: ConeShape { height: 9.0, base_radius: 3.2, offset: 2.2 },
        }
    }

    fn validate(&self, group: &'static str) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::EmptyGroup { group });
        }
        positive(&format!("{group}.speed"), self.speed)?;
        validate_shapes(group, &self.scatter, &self.tree)
    }
}

/// The photo cards and their zoom behaviour.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub count: usize,
    /// The one card that flies forward when zoomed.
    pub active_index: usize,
    pub scatter: SphereShape,
    /// Cards shrink into the trunk when the tree assembles.
    pub tree: ConeShape,
    pub speed: f32,
    pub zoom_speed: f32,
    pub hide_speed: f32,
    pub rest_scale: f32,
    pub zoom_scale: f32,
    /// Where the zoomed card hovers, before hand parallax.
    pub zoom_anchor: [f32; 3],
    /// Hand offset multiplier for the zoomed card.
    pub parallax: f32,
    /// Hand tilt multiplier for the zoomed card (radians per unit).
    pub tilt: f32,
    /// Idle rotational wobble amplitude (radians).
    pub wobble: f32,
    /// Random rest rotation spread on X/Y (radians, ±).
    pub rest_tilt: f32,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        PhotoConfig {
            count: 5,
            active_index: 2,
            scatter: SphereShape { radius: 12.0 },
            tree: ConeShape { height: 4.0, base_radius: 0.6, offset: 0.0 },
            speed: 2.0,
            zoom_speed: 3.0,
            hide_speed: 4.0,
            rest_scale: 1.2,
            zoom_scale: 3.5,
            zoom_anchor: [0.0, 4.0, 16.0],
            parallax: 3.0,
            tilt: 0.2,
            wobble: 0.05,
            rest_tilt: 0.25,
        }
    }
}

impl PhotoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::EmptyGroup { group: "photos" });
        }
        if self.active_index >= self.count {
            return Err(ConfigError::ActivePhoto {
                index: self.active_index,
                count: self.count,
            });
        }
        positive("photos.speed", self.speed)?;
        positive("photos.zoom_speed", self.zoom_speed)?;
        positive("photos.hide_speed", self.hide_speed)?;
        positive("photos.rest_scale", self.rest_scale)?;
        positive("photos.zoom_scale", self.zoom_scale)?;
        validate_shapes("photos", &self.scatter, &self.tree)?;
        for (axis, value) in ["x", "y", "z"].into_iter().zip(self.zoom_anchor) {
            finite(&format!("photos.zoom_anchor.{axis}"), value)?;
        }
        non_negative("photos.parallax", self.parallax)?;
        non_negative("photos.tilt", self.tilt)?;
        non_negative("photos.wobble", self.wobble)?;
        non_negative("photos.rest_tilt", self.rest_tilt)
    }
}

/// Complete scene configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MorphConfig {
    pub particles: GroupConfig,
    pub gifts: GroupConfig,
    pub baubles: GroupConfig,
    pub photos: PhotoConfig,
    pub gesture: GestureThresholds,
    /// How much slower the heaviest member of a group moves, as a fraction
    /// of the group speed.
    pub stagger: f32,
    /// Idle drift is switched off once eased progress reaches this.
    pub noise_cutoff: f32,
}

impl Default for MorphConfig {
    fn default() -> Self {
        MorphConfig {
            particles: GroupConfig::default(),
            // Gifts are heavier than baubles and trail them.
            gifts: GroupConfig::ornaments(150, 0.8),
            baubles: GroupConfig::ornaments(300, 1.2),
            photos: PhotoConfig::default(),
            gesture: GestureThresholds::default(),
            stagger: 0.15,
            noise_cutoff: 0.9,
        }
    }
}

impl MorphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.particles.validate("particles")?;
        self.gifts.validate("gifts")?;
        self.baubles.validate("baubles")?;
        self.photos.validate()?;
        self.gesture.validate()?;
        unit("stagger", self.stagger)?;
        if self.stagger >= 1.0 {
            return Err(ConfigError::OutOfUnitRange { field: "stagger".into(), value: self.stagger });
        }
        unit("noise_cutoff", self.noise_cutoff)
    }
}

fn validate_shapes(group: &str, scatter: &SphereShape, tree: &ConeShape) -> Result<(), ConfigError> {
    positive(&format!("{group}.scatter.radius"), scatter.radius)?;
    positive(&format!("{group}.tree.height"), tree.height)?;
    positive(&format!("{group}.tree.base_radius"), tree.base_radius)?;
    finite(&format!("{group}.tree.offset"), tree.offset)
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field: field.to_owned(), value })
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field: field.to_owned(), value })
    }
}

fn finite(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field: field.to_owned(), value })
    }
}

fn unit(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field: field.to_owned(), value })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
