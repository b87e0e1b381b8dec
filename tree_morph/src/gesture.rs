//! Gesture classification from one frame of hand landmarks.
//!
//! The input is the 21-point hand model produced by common hand-pose
//! estimators: normalised image coordinates with the origin at the top-left,
//! mirrored horizontally relative to the camera.  Each processed frame yields
//! a [`HandPosition`] unconditionally and, at most, one gesture-change event.

use std::fmt;

use glam::Vec3;
use serde::Deserialize;
use tracing::trace;

use crate::error::{ConfigError, FrameError};

// ════════════════════════════════════════════════════════════════════════════
// Landmarks
// ════════════════════════════════════════════════════════════════════════════

/// The 21 hand landmarks, in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Number of landmarks in one frame.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Tips of the four non-thumb fingers.
    pub fn finger_tips() -> [HandLandmark; 4] {
        [
            HandLandmark::IndexTip,
            HandLandmark::MiddleTip,
            HandLandmark::RingTip,
            HandLandmark::PinkyTip,
        ]
    }

    /// Base-to-tip chains for the five digits (4 landmarks each).
    pub fn digit_chains() -> [[HandLandmark; 4]; 5] {
        use HandLandmark::*;
        [
            [ThumbCmc, ThumbMcp, ThumbIp, ThumbTip],
            [IndexMcp, IndexPip, IndexDip, IndexTip],
            [MiddleMcp, MiddlePip, MiddleDip, MiddleTip],
            [RingMcp, RingPip, RingDip, RingTip],
            [PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
        ]
    }
}

/// One frame of landmarks for a single detected hand.
///
/// Construction rejects non-finite coordinates, so every `HandFrame` in
/// circulation is safe to measure.
#[derive(Debug, Clone, PartialEq)]
pub struct HandFrame {
    landmarks: [Vec3; LANDMARK_COUNT],
}

impl HandFrame {
    pub fn new(landmarks: [Vec3; LANDMARK_COUNT]) -> Result<Self, FrameError> {
        if let Some(index) = landmarks.iter().position(|p| !p.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }
        Ok(HandFrame { landmarks })
    }

    /// Build from raw `[x, y, z]` triples, e.g. a decoded JSON record.
    pub fn from_points(points: &[[f32; 3]]) -> Result<Self, FrameError> {
        if points.len() != LANDMARK_COUNT {
            return Err(FrameError::LandmarkCount {
                expected: LANDMARK_COUNT,
                got: points.len(),
            });
        }
        let mut landmarks = [Vec3::ZERO; LANDMARK_COUNT];
        for (dst, src) in landmarks.iter_mut().zip(points) {
            *dst = Vec3::from_array(*src);
        }
        HandFrame::new(landmarks)
    }

    /// A plausible hand whose average wrist→fingertip distance is `spread`
    /// and whose thumb-tip sits `pinch` away from the index tip.
    ///
    /// Fingers fan upward (toward smaller image `y`) from `wrist`; joints are
    /// spaced evenly along each digit.
    pub fn synthetic(wrist: Vec3, spread: f32, pinch: f32) -> Result<Self, FrameError> {
        use HandLandmark::*;
        const FAN_DEG: [f32; 4] = [-24.0, -8.0, 8.0, 24.0];

        let mut landmarks = [wrist; LANDMARK_COUNT];
        let tips = HandLandmark::finger_tips();
        for (tip, deg) in tips.iter().zip(FAN_DEG) {
            let a = deg.to_radians();
            landmarks[tip.index()] = wrist + Vec3::new(a.sin(), -a.cos(), 0.0) * spread;
        }
        // Thumb approaches the index tip from the thumb side.
        landmarks[ThumbTip.index()] = landmarks[IndexTip.index()] + Vec3::new(-pinch, 0.0, 0.0);

        for chain in HandLandmark::digit_chains() {
            let tip = landmarks[chain[3].index()];
            for (k, joint) in chain[..3].iter().enumerate() {
                let f = (k as f32 + 1.0) / 4.0;
                landmarks[joint.index()] = wrist.lerp(tip, f);
            }
        }
        HandFrame::new(landmarks)
    }

    pub fn get(&self, landmark: HandLandmark) -> Vec3 {
        self.landmarks[landmark.index()]
    }

    pub fn wrist(&self) -> Vec3 {
        self.get(HandLandmark::Wrist)
    }

    pub fn landmarks(&self) -> &[Vec3; LANDMARK_COUNT] {
        &self.landmarks
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand position
// ════════════════════════════════════════════════════════════════════════════

/// Screen-centred, Y-up wrist position, each axis roughly in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandPosition {
    pub x: f32,
    pub y: f32,
}

impl HandPosition {
    pub const CENTER: HandPosition = HandPosition { x: 0.0, y: 0.0 };

    /// Mirror horizontally and flip vertically (landmark origin is top-left).
    pub fn from_wrist(wrist: Vec3) -> Self {
        HandPosition {
            x: (1.0 - wrist.x) * 2.0 - 1.0,
            y: (1.0 - wrist.y) * 2.0 - 1.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture types and thresholds
// ════════════════════════════════════════════════════════════════════════════

/// The discrete gestures the classifier can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureType {
    /// Ambiguous pose, or nothing detected yet.
    #[default]
    None,
    OpenPalm,
    Fist,
    /// Thumb and index tips pinched together.
    Grab,
}

impl GestureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::OpenPalm => "OPEN_PALM",
            Self::Fist => "FIST",
            Self::Grab => "GRAB",
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Empirical classification thresholds, in normalised landmark units.
///
/// These depend on camera field of view and hand size, so they are loaded
/// from configuration rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// Thumb-tip to index-tip distance below which the hand is grabbing.
    pub pinch: f32,
    /// Average wrist-to-fingertip distance below which the hand is a fist.
    pub fist_spread: f32,
    /// Average wrist-to-fingertip distance above which the palm is open.
    pub open_spread: f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        GestureThresholds {
            pinch: 0.05,
            fist_spread: 0.18,
            open_spread: 0.30,
        }
    }
}

impl GestureThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("gesture.pinch", self.pinch),
            ("gesture.fist_spread", self.fist_spread),
            ("gesture.open_spread", self.open_spread),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field: field.to_owned(), value });
            }
        }
        if self.fist_spread >= self.open_spread {
            return Err(ConfigError::SpreadOrder {
                fist: self.fist_spread,
                open: self.open_spread,
            });
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Measurement and classification
// ════════════════════════════════════════════════════════════════════════════

/// Geometry extracted from one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandMetrics {
    /// Mean 3D distance from the wrist to the four non-thumb fingertips.
    pub avg_spread: f32,
    /// 3D distance between thumb tip and index tip.
    pub pinch_dist: f32,
}

impl HandMetrics {
    pub fn measure(frame: &HandFrame) -> Self {
        let wrist = frame.wrist();
        let tips = HandLandmark::finger_tips();
        let avg_spread = tips
            .iter()
            .map(|&tip| frame.get(tip).distance(wrist))
            .sum::<f32>()
            / tips.len() as f32;
        let pinch_dist = frame
            .get(HandLandmark::ThumbTip)
            .distance(frame.get(HandLandmark::IndexTip));
        HandMetrics { avg_spread, pinch_dist }
    }
}

/// Classify by precedence: pinch first, then spread.
///
/// A closed pinch often coincides with a half-closed hand, so `Grab` wins
/// over `Fist` when both thresholds are met.
pub fn classify(metrics: &HandMetrics, thresholds: &GestureThresholds) -> GestureType {
    if metrics.pinch_dist < thresholds.pinch {
        GestureType::Grab
    } else if metrics.avg_spread < thresholds.fist_spread {
        GestureType::Fist
    } else if metrics.avg_spread > thresholds.open_spread {
        GestureType::OpenPalm
    } else {
        GestureType::None
    }
}

/// Edge detector: a detection is an event only if it is a real gesture and
/// differs from the last one emitted.
pub fn gesture_changed(last: GestureType, detected: GestureType) -> bool {
    detected != GestureType::None && detected != last
}

/// Holds the last emitted gesture between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct GestureDebouncer {
    last: GestureType,
}

impl GestureDebouncer {
    pub fn last(&self) -> GestureType {
        self.last
    }

    /// Returns the gesture to emit, if any, and records it.
    pub fn accept(&mut self, detected: GestureType) -> Option<GestureType> {
        if gesture_changed(self.last, detected) {
            self.last = detected;
            Some(detected)
        } else {
            None
        }
    }
}

/// Everything one frame produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub hand: HandPosition,
    pub metrics: HandMetrics,
    /// Raw per-frame detection (level).
    pub detected: GestureType,
    /// Gesture-change event (edge), if this frame produced one.
    pub emitted: Option<GestureType>,
}

/// Stateful classifier: thresholds plus the debouncer.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    thresholds: GestureThresholds,
    debouncer: GestureDebouncer,
}

impl GestureClassifier {
    pub fn new(thresholds: GestureThresholds) -> Self {
        GestureClassifier {
            thresholds,
            debouncer: GestureDebouncer::default(),
        }
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    pub fn last_gesture(&self) -> GestureType {
        self.debouncer.last()
    }

    pub fn process(&mut self, frame: &HandFrame) -> Classification {
        let hand = HandPosition::from_wrist(frame.wrist());
        let metrics = HandMetrics::measure(frame);
        let detected = classify(&metrics, &self.thresholds);
        let emitted = self.debouncer.accept(detected);
        trace!(
            spread = metrics.avg_spread,
            pinch = metrics.pinch_dist,
            %detected,
            "classified hand frame"
        );
        Classification { hand, metrics, detected, emitted }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
