//! The scattered/tree state machine.
//!
//! | Input | Effect |
//! |---|---|
//! | Manual toggle | `Scattered` ⇄ `TreeShape`, zoom cleared |
//! | `Fist` | `TreeShape`, zoom cleared |
//! | `OpenPalm` | `Scattered`, zoom cleared |
//! | `Grab` | zoom set, only while `Scattered` |
//! | `None` | nothing |
//!
//! The logical state flips instantly; the visible blend trails behind in
//! the interpolation engine.

use std::fmt;

use tracing::debug;

use crate::gesture::GestureType;

/// The two layouts the scene can be heading toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MorphState {
    #[default]
    Scattered,
    TreeShape,
}

impl MorphState {
    pub fn toggled(self) -> Self {
        match self {
            MorphState::Scattered => MorphState::TreeShape,
            MorphState::TreeShape => MorphState::Scattered,
        }
    }

    /// Blend target: 0 = scattered, 1 = assembled.
    pub fn target(self) -> f32 {
        match self {
            MorphState::Scattered => 0.0,
            MorphState::TreeShape => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MorphState::Scattered => "SCATTERED",
            MorphState::TreeShape => "TREE_SHAPE",
        }
    }
}

impl fmt::Display for MorphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can drive the machine.  A toggle is the same event whether
/// it came from a button, a key, or a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphInput {
    Toggle,
    Gesture(GestureType),
}

/// Snapshot handed to the interpolation engine each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneMode {
    pub state: MorphState,
    pub zoomed: bool,
}

/// `MorphState` plus the zoom flag.  Starts scattered and unzoomed; has no
/// terminal state.
#[derive(Debug, Clone, Default)]
pub struct MorphMachine {
    state: MorphState,
    zoomed: bool,
}

impl MorphMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MorphState {
        self.state
    }

    /// Only meaningful while `Scattered`.
    pub fn zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn mode(&self) -> SceneMode {
        SceneMode { state: self.state, zoomed: self.zoomed }
    }

    /// Apply one input.  Returns true if `(state, zoomed)` changed.
    pub fn apply(&mut self, input: MorphInput) -> bool {
        let before = self.mode();
        match input {
            MorphInput::Toggle => {
                self.state = self.state.toggled();
                self.zoomed = false;
            }
            MorphInput::Gesture(GestureType::Fist) => {
                self.state = MorphState::TreeShape;
                self.zoomed = false;
            }
            MorphInput::Gesture(GestureType::OpenPalm) => {
                self.state = MorphState::Scattered;
                self.zoomed = false;
            }
            MorphInput::Gesture(GestureType::Grab) => {
                if self.state == MorphState::Scattered {
                    self.zoomed = true;
                }
            }
            MorphInput::Gesture(GestureType::None) => {}
        }
        let after = self.mode();
        if before != after {
            debug!(
                from = %before.state,
                to = %after.state,
                zoomed = after.zoomed,
                ?input,
                "morph transition"
            );
        }
        before != after
    }

    pub fn toggle(&mut self) -> bool {
        self.apply(MorphInput::Toggle)
    }

    pub fn handle_gesture(&mut self, gesture: GestureType) -> bool {
        self.apply(MorphInput::Gesture(gesture))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
