//! # holiday_tree
//!
//! A windowed front end for [`tree_morph`]: hand tracking on a worker
//! thread, a software-rendered scene, a camera rig that follows the hand,
//! and a soundtrack clock with synchronised lyrics.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Fist | Assemble the tree |
//! | Open palm | Scatter, and let go of a held photo |
//! | Grab (thumb–index pinch) | While scattered, pull the active photo toward the camera |
//! | Hand movement | Tilts the scattered cloud and the held photo |
//!
//! The first gesture (or manual toggle) starts the soundtrack.  Holding a
//! photo raises its volume.
//!
//! ## Frame sources
//!
//! * (default): **Simulation mode**: the mouse is the wrist, keys pick a pose.
//! * `--replay FILE`: JSON-lines landmark records, `-` for stdin.
//! * `leap` feature: **Hardware mode**: polls a LeapMotion controller via LeapC.
//!
//! ### Keys
//!
//! | Key | Effect |
//! |---|---|
//! | mouse | Wrist position (simulation) |
//! | `F` / hold | Fist pose (simulation) |
//! | `O` / hold | Open palm pose (simulation) |
//! | `G` / hold | Grab pose (simulation) |
//! | `Space` | Toggle tree / scatter |
//! | `Q`, `Escape` | Quit |

pub mod app;
pub mod camera;
pub mod logging;
pub mod settings;
pub mod soundtrack;
pub mod vision;
pub mod visualizer;
