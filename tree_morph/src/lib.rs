//! # tree_morph
//!
//! Core of the gesture-driven holiday tree: a cloud of particles, gifts,
//! baubles and photo cards that morphs between a loose scattered sphere and
//! an assembled cone-shaped tree.
//!
//! ## Pipeline
//!
//! ```text
//! HandFrame ──▶ GestureClassifier ──▶ MorphMachine ──▶ MorphScene::tick ──▶ Transforms
//!   (21 pts)     (position + edge)     (state, zoom)     (eased progress)
//! ```
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Detection | Action |
//! |---|---|---|
//! | `GRAB` | thumb–index tips closer than `pinch` | zoom the active photo (scattered only) |
//! | `FIST` | mean wrist–fingertip spread below `fist_spread` | assemble the tree |
//! | `OPEN_PALM` | mean spread above `open_spread` | scatter |
//! | `NONE` | anything in between | nothing; never emitted |
//!
//! A manual toggle flips between the two layouts and always clears the zoom.
//!
//! Nothing in this crate opens a window, a device or a thread; the front-end
//! owns all of that and calls [`MorphScene::tick`] once per frame.

pub mod config;
pub mod error;
pub mod gesture;
pub mod interp;
pub mod morph;
pub mod sampler;
pub mod scene;

pub use config::{GroupConfig, MorphConfig, PhotoConfig};
pub use error::{ConfigError, FrameError};
pub use gesture::{
    Classification, GestureClassifier, GestureThresholds, GestureType, HandFrame, HandPosition,
};
pub use interp::{FrameInput, Progress, Transform};
pub use morph::{MorphInput, MorphMachine, MorphState, SceneMode};
pub use sampler::DualPosition;
pub use scene::{MorphScene, Ornament, OrnamentKind, Particle, Photo};
