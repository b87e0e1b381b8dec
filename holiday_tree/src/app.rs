//! Top-level application state and the frame loop.
//!
//! `AppState` owns the morph machine, the scene, the camera rig and the
//! soundtrack clock.  It consumes [`VisionEvent`]s and the manual toggle,
//! and is ticked once per rendered frame.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};
use tree_morph::{FrameInput, GestureType, HandPosition, MorphMachine, MorphScene, SceneMode};

use crate::camera::CameraRig;
use crate::settings::AppSettings;
use crate::soundtrack::Soundtrack;
use crate::vision::{FrameSource, ReplaySource, SimHandSource, VisionEvent, VisionWorker};
use crate::visualizer::{FrameView, Visualizer, WindowError};

/// Longest step the animation takes in one frame.  Stalls (window drags,
/// breakpoints) resume smoothly instead of jumping.
pub const MAX_FRAME_DT: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    machine: MorphMachine,
    scene: MorphScene,
    camera: CameraRig,
    soundtrack: Soundtrack,

    // ── latest tracking results ──────────────────────────────────────────
    hand: HandPosition,
    gesture: GestureType,
    tracking_error: Option<String>,
}

impl AppState {
    pub fn new<R: Rng + ?Sized>(settings: &AppSettings, rng: &mut R) -> Self {
        AppState {
            machine: MorphMachine::new(),
            scene: MorphScene::generate(&settings.scene, rng),
            camera: CameraRig::new(settings.camera.clone()),
            soundtrack: Soundtrack::from_settings(&settings.soundtrack),
            hand: HandPosition::CENTER,
            gesture: GestureType::None,
            tracking_error: None,
        }
    }

    // ── inputs ───────────────────────────────────────────────────────────

    pub fn handle_vision(&mut self, event: VisionEvent) {
        match event {
            VisionEvent::HandMoved(hand) => self.hand = hand,
            VisionEvent::Gesture(gesture) => {
                self.gesture = gesture;
                self.machine.handle_gesture(gesture);
                self.soundtrack.start();
            }
            VisionEvent::Unavailable(reason) => {
                warn!(%reason, "continuing without hand tracking");
                self.tracking_error = Some(reason);
            }
        }
    }

    /// Manual toggle; always available, tracking or not.
    pub fn toggle(&mut self) {
        self.machine.toggle();
        self.soundtrack.start();
    }

    // ── per-frame tick ───────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        let mode = self.machine.mode();
        self.scene.tick(&FrameInput { mode, hand: self.hand, dt });
        self.camera.tick(mode, self.hand, dt);
        self.soundtrack.tick(dt, mode.zoomed);
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn mode(&self) -> SceneMode {
        self.machine.mode()
    }

    pub fn scene(&self) -> &MorphScene {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn soundtrack(&self) -> &Soundtrack {
        &self.soundtrack
    }

    pub fn hand(&self) -> HandPosition {
        self.hand
    }

    pub fn gesture(&self) -> GestureType {
        self.gesture
    }

    pub fn tracking_error(&self) -> Option<&str> {
        self.tracking_error.as_deref()
    }

    pub fn view(&self, simulated: bool) -> FrameView<'_> {
        FrameView {
            scene: &self.scene,
            camera: &self.camera,
            mode: self.mode(),
            gesture: self.gesture,
            lyric: self.soundtrack.current_lyric(),
            playing: self.soundtrack.is_playing(),
            tracking_error: self.tracking_error(),
            simulated,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Where hand landmarks come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Mouse and keyboard in the visualizer window.
    Simulated,
    /// JSON-lines landmark records from a file, or stdin when `None`.
    Replay(Option<PathBuf>),
    #[cfg(feature = "leap")]
    Leap,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Run the application until the window closes or Q / Escape is pressed.
///
/// Hand tracking failures are not errors: the scene stays on manual
/// control and the status bar says why.
pub fn run(settings: &AppSettings, source: SourceKind, seed: Option<u64>) -> Result<(), RunError> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    let mut app = AppState::new(settings, &mut rng);
    info!(entities = app.scene().entity_count(), "scene generated");

    // ── Frame source on the vision thread ────────────────────────────────
    let interval = settings.vision.frame_interval();
    let thresholds = settings.scene.gesture;
    let simulated = source == SourceKind::Simulated;
    let (sim_tx, worker) = match source {
        SourceKind::Simulated => {
            let (tx, rx) = mpsc::channel();
            let worker = VisionWorker::spawn(
                move || Ok(Box::new(SimHandSource::new(rx, interval)) as Box<dyn FrameSource>),
                thresholds,
            );
            (Some(tx), worker)
        }
        SourceKind::Replay(Some(path)) => {
            let worker = VisionWorker::spawn(
                move || Ok(Box::new(ReplaySource::open(&path, interval)?) as Box<dyn FrameSource>),
                thresholds,
            );
            (None, worker)
        }
        SourceKind::Replay(None) => {
            let worker = VisionWorker::spawn(
                move || Ok(Box::new(ReplaySource::stdin(interval)) as Box<dyn FrameSource>),
                thresholds,
            );
            (None, worker)
        }
        #[cfg(feature = "leap")]
        SourceKind::Leap => {
            let worker = VisionWorker::spawn(
                || Ok(Box::new(crate::vision::LeapSource::open()?) as Box<dyn FrameSource>),
                thresholds,
            );
            (None, worker)
        }
    };

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(&settings.window, sim_tx)?;

    // ── Main loop ────────────────────────────────────────────────────────
    let mut last = Instant::now();
    while vis.is_open() {
        // 1. Window input
        let controls = vis.poll_input();
        if controls.quit {
            break;
        }
        if controls.toggle {
            app.toggle();
        }

        // 2. Drain tracking events
        for event in worker.events() {
            app.handle_vision(event);
        }

        // 3. Advance
        let now = Instant::now();
        app.tick(now.duration_since(last).as_secs_f32());
        last = now;

        // 4. Render
        vis.render(&app.view(simulated));
    }

    debug!("frame loop finished");
    drop(worker);
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use tree_morph::MorphState;

    const DT: f32 = 1.0 / 60.0;

    fn make_app() -> AppState {
        let mut settings = AppSettings::default();
        settings.scene.particles.count = 400;
        settings.scene.gifts.count = 20;
        settings.scene.baubles.count = 20;
        AppState::new(&settings, &mut StdRng::seed_from_u64(11))
    }

    #[test]
    fn starts_scattered_and_silent() {
        let app = make_app();
        assert_eq!(app.mode(), SceneMode::default());
        assert_eq!(app.gesture(), GestureType::None);
        assert!(!app.soundtrack().is_playing());
        assert_eq!(app.hand(), HandPosition::CENTER);
    }

    #[test]
    fn fist_assembles_and_starts_music() {
        let mut app = make_app();
        app.handle_vision(VisionEvent::Gesture(GestureType::Fist));
        assert_eq!(app.mode().state, MorphState::TreeShape);
        assert_eq!(app.gesture(), GestureType::Fist);
        assert!(app.soundtrack().is_playing());
    }

    #[test]
    fn toggle_flips_state() {
        let mut app = make_app();
        app.toggle();
        assert_eq!(app.mode().state, MorphState::TreeShape);
        assert!(app.soundtrack().is_playing());
        app.toggle();
        assert_eq!(app.mode().state, MorphState::Scattered);
    }

    #[test]
    fn grab_zooms_and_open_palm_releases() {
        let mut app = make_app();
        app.handle_vision(VisionEvent::Gesture(GestureType::Grab));
        assert!(app.mode().zoomed);
        app.handle_vision(VisionEvent::Gesture(GestureType::OpenPalm));
        assert!(!app.mode().zoomed);
        assert_eq!(app.mode().state, MorphState::Scattered);
    }

    #[test]
    fn hand_moves_without_changing_state() {
        let mut app = make_app();
        let hand = HandPosition { x: 0.5, y: -0.25 };
        app.handle_vision(VisionEvent::HandMoved(hand));
        assert_eq!(app.hand(), hand);
        assert_eq!(app.mode(), SceneMode::default());
    }

    #[test]
    fn unavailable_tracking_keeps_manual_control() {
        let mut app = make_app();
        app.handle_vision(VisionEvent::Unavailable("no camera".into()));
        assert_eq!(app.tracking_error(), Some("no camera"));
        app.toggle();
        assert_eq!(app.mode().state, MorphState::TreeShape);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut a = make_app();
        let mut b = make_app();
        a.toggle();
        b.toggle();
        a.tick(5.0);
        b.tick(MAX_FRAME_DT);
        assert_eq!(a.scene().time(), b.scene().time());
        assert_eq!(a.soundtrack().position(), b.soundtrack().position());

        let before = a.scene().time();
        a.tick(-1.0);
        assert_eq!(a.scene().time(), before);
    }

    #[test]
    fn tree_assembles_over_time() {
        let mut app = make_app();
        app.toggle();
        for _ in 0..60 * 8 {
            app.tick(DT);
        }
        assert!(app.scene().particles().progress().value() > 0.99);
        assert!(app.camera().orbit() > 0.0);
    }

    #[test]
    fn view_reflects_state() {
        let mut app = make_app();
        app.handle_vision(VisionEvent::Gesture(GestureType::Grab));
        let view = app.view(true);
        assert!(view.mode.zoomed);
        assert_eq!(view.gesture, GestureType::Grab);
        assert!(view.playing);
        assert!(view.simulated);
        assert_eq!(view.tracking_error, None);
    }
}
