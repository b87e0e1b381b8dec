//! Hand tracking: frame sources and the worker thread that classifies them.
//!
//! The public interface is [`VisionEvent`] delivered over a `mpsc` channel.
//! The render loop drains it with `try_recv` once per frame and never waits
//! on it; whether landmarks come from hardware, a replay stream or the
//! mouse simulator is invisible downstream.
//!
//! Every frame goes through the real [`GestureClassifier`], including the
//! simulated ones.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryIter};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use tree_morph::{FrameError, GestureClassifier, GestureThresholds, GestureType, HandFrame, HandPosition};

// ════════════════════════════════════════════════════════════════════════════
// Events and errors
// ════════════════════════════════════════════════════════════════════════════

/// What the worker tells the render loop.
#[derive(Clone, Debug, PartialEq)]
pub enum VisionEvent {
    /// Sent for every frame with a detected hand.
    HandMoved(HandPosition),
    /// Gesture-change edge; never `GestureType::None`.
    Gesture(GestureType),
    /// The source failed for good.  The scene keeps running on manual input.
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("hand tracking device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("landmark stream read failed: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: malformed landmark record: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl VisionError {
    /// Fatal errors end the worker; the rest cost one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VisionError::DeviceUnavailable(_) | VisionError::Io(_))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait: unified interface for hw, replay and sim
// ════════════════════════════════════════════════════════════════════════════

/// Result of one poll.
#[derive(Clone, Debug, PartialEq)]
pub enum FramePoll {
    Frame(HandFrame),
    /// A frame arrived but contained no hand.
    NoHand,
    /// The source is exhausted.
    Ended,
}

/// Anything that can deliver landmark frames.  Dropping the source releases
/// the underlying device.
///
/// Sources are built and dropped on the worker thread, so they need not be
/// `Send`.
pub trait FrameSource {
    /// Block until the next frame, for at most a few tens of milliseconds.
    fn next_frame(&mut self) -> Result<FramePoll, VisionError>;
}

// ════════════════════════════════════════════════════════════════════════════
// VisionWorker
// ════════════════════════════════════════════════════════════════════════════

/// Owns the tracking thread.  Dropping it stops frame scheduling, joins the
/// thread, and with it drops the source.
pub struct VisionWorker {
    rx: Receiver<VisionEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl VisionWorker {
    /// Spawn the worker.  `open` runs on the worker thread so a source that
    /// fails to initialise is reported like any other device failure.
    pub fn spawn<F>(open: F, thresholds: GestureThresholds) -> Self
    where
        F: FnOnce() -> Result<Box<dyn FrameSource>, VisionError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("vision".into())
            .spawn(move || {
                let mut source = match open() {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(error = %e, "hand tracking could not start");
                        let _ = tx.send(VisionEvent::Unavailable(e.to_string()));
                        return;
                    }
                };
                info!("hand tracking started");
                let mut classifier = GestureClassifier::new(thresholds);
                pump(source.as_mut(), &mut classifier, &tx, &flag);
                info!("hand tracking stopped");
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                warn!(error = %e, "failed to spawn vision thread");
                None
            }
        };
        VisionWorker { rx, stop, handle }
    }

    /// Non-blocking drain of everything received since the last call.
    pub fn events(&self) -> TryIter<'_, VisionEvent> {
        self.rx.try_iter()
    }
}

/// How long `Drop` waits for the worker before detaching it.  Only a source
/// stuck in a blocking read (stdin replay) ever hits this.
const JOIN_GRACE: Duration = Duration::from_secs(1);

impl Drop for VisionWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else { return };
        let deadline = Instant::now() + JOIN_GRACE;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            warn!("vision thread still blocked, detaching it");
        }
    }
}

/// The worker loop: poll → classify → emit, until the source ends, fails
/// fatally, the receiver goes away, or `stop` is raised.
fn pump(
    source: &mut dyn FrameSource,
    classifier: &mut GestureClassifier,
    tx: &Sender<VisionEvent>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Relaxed) {
        let frame = match source.next_frame() {
            Ok(FramePoll::Frame(f)) => f,
            Ok(FramePoll::NoHand) => continue,
            Ok(FramePoll::Ended) => {
                debug!("frame source ended");
                return;
            }
            Err(e) if e.is_fatal() => {
                warn!(error = %e, "hand tracking lost");
                let _ = tx.send(VisionEvent::Unavailable(e.to_string()));
                return;
            }
            Err(e) => {
                warn!(error = %e, "skipping frame");
                continue;
            }
        };

        let out = classifier.process(&frame);
        if tx.send(VisionEvent::HandMoved(out.hand)).is_err() {
            return;
        }
        if let Some(gesture) = out.emitted {
            debug!(%gesture, "gesture");
            if tx.send(VisionEvent::Gesture(gesture)).is_err() {
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: mouse + keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Pose held on the keyboard while simulating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SimPose {
    /// Half-open hand: classifies as nothing.
    #[default]
    Relaxed,
    Fist,     // F
    OpenPalm, // O
    Grab,     // G
}

impl SimPose {
    /// `(spread, pinch)` fed to [`HandFrame::synthetic`].
    fn shape(self) -> (f32, f32) {
        match self {
            SimPose::Relaxed => (0.24, 0.12),
            SimPose::Fist => (0.12, 0.10),
            SimPose::OpenPalm => (0.40, 0.15),
            SimPose::Grab => (0.22, 0.02),
        }
    }
}

/// Raw input from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer in normalised window coordinates, `None` when outside.
    Pointer(Option<(f32, f32)>),
    Pose(SimPose),
}

/// Frame source driven by [`SimInput`] events from the visualizer's window.
///
/// The pointer stands in for the wrist as seen by a front-facing camera, so
/// the x axis is mirrored before synthesis.
pub struct SimHandSource {
    rx: Receiver<SimInput>,
    interval: Duration,
    pointer: Option<(f32, f32)>,
    pose: SimPose,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>, interval: Duration) -> Self {
        SimHandSource { rx, interval, pointer: None, pose: SimPose::default() }
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Pointer(p) => self.pointer = p,
            SimInput::Pose(p) => self.pose = p,
        }
    }
}

impl FrameSource for SimHandSource {
    fn next_frame(&mut self) -> Result<FramePoll, VisionError> {
        match self.rx.recv_timeout(self.interval) {
            Ok(input) => self.apply(input),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(FramePoll::Ended),
        }
        while let Ok(input) = self.rx.try_recv() {
            self.apply(input);
        }

        let Some((px, py)) = self.pointer else {
            return Ok(FramePoll::NoHand);
        };
        let (spread, pinch) = self.pose.shape();
        let wrist = Vec3::new(1.0 - px, py, 0.0);
        Ok(FramePoll::Frame(HandFrame::synthetic(wrist, spread, pinch)?))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource: JSON-lines landmark stream
// ════════════════════════════════════════════════════════════════════════════

/// One line of a replay stream: `{"landmarks": [[x, y, z], ...]}`.
/// A missing, `null` or empty list means no hand in that frame.
#[derive(Debug, Deserialize)]
struct ReplayRecord {
    #[serde(default)]
    landmarks: Option<Vec<[f32; 3]>>,
}

/// Plays back landmark frames written by an external hand-pose process.
pub struct ReplaySource<R> {
    reader: R,
    interval: Duration,
    line: usize,
    buf: String,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: &Path, interval: Duration) -> Result<Self, VisionError> {
        let file = File::open(path)?;
        info!(path = %path.display(), "replaying landmark file");
        Ok(ReplaySource::new(BufReader::new(file), interval))
    }
}

impl ReplaySource<BufReader<io::Stdin>> {
    pub fn stdin(interval: Duration) -> Self {
        ReplaySource::new(BufReader::new(io::stdin()), interval)
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R, interval: Duration) -> Self {
        ReplaySource { reader, interval, line: 0, buf: String::new() }
    }
}

impl<R: BufRead> FrameSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<FramePoll, VisionError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(FramePoll::Ended);
            }
            self.line += 1;
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }

        let record: ReplayRecord = serde_json::from_str(self.buf.trim())
            .map_err(|source| VisionError::Malformed { line: self.line, source })?;
        match record.landmarks {
            Some(points) if !points.is_empty() => {
                Ok(FramePoll::Frame(HandFrame::from_points(&points)?))
            }
            _ => Ok(FramePoll::NoHand),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Frame source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// Leap reports millimetres above the device; they are mapped into the
/// normalised image frame the classifier expects (origin top-left, x
/// mirrored) by treating a 400 mm box centred 300 mm above the device as
/// the full view.
#[cfg(feature = "leap")]
pub struct LeapSource {
    connection: leaprs::Connection,
}

#[cfg(feature = "leap")]
impl LeapSource {
    const BOX_MM: f32 = 400.0;
    const CENTRE_Y_MM: f32 = 300.0;

    pub fn open() -> Result<Self, VisionError> {
        use leaprs::{Connection, ConnectionConfig};

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| VisionError::DeviceUnavailable(format!("{:?}", e)))?;
        connection
            .open()
            .map_err(|e| VisionError::DeviceUnavailable(format!("{:?}", e)))?;
        Ok(LeapSource { connection })
    }

    fn to_image(x: f32, y: f32, z: f32) -> Vec3 {
        Vec3::new(
            0.5 - x / Self::BOX_MM,
            0.5 - (y - Self::CENTRE_Y_MM) / Self::BOX_MM,
            z / Self::BOX_MM,
        )
    }
}

#[cfg(feature = "leap")]
impl FrameSource for LeapSource {
    fn next_frame(&mut self) -> Result<FramePoll, VisionError> {
        use leaprs::Event;
        use tree_morph::gesture::{HandLandmark, LANDMARK_COUNT};

        let msg = match self.connection.poll(100) {
            Ok(m) => m,
            Err(_) => return Ok(FramePoll::NoHand),
        };
        let Event::Tracking(frame) = msg.event() else {
            return Ok(FramePoll::NoHand);
        };
        let Some(hand) = frame.hands().next() else {
            return Ok(FramePoll::NoHand);
        };
        let digits: Vec<_> = hand.digits().collect();
        if digits.len() < 5 {
            return Ok(FramePoll::NoHand);
        }

        let mut landmarks = [Vec3::ZERO; LANDMARK_COUNT];
        let mut wrist = Vec3::ZERO;
        for (digit, chain) in digits.iter().zip(HandLandmark::digit_chains()) {
            let joints = [
                digit.proximal().prev_joint(),
                digit.intermediate().prev_joint(),
                digit.distal().prev_joint(),
                digit.distal().next_joint(),
            ];
            for (landmark, j) in chain.iter().zip(joints) {
                landmarks[landmark.index()] = Self::to_image(j.x, j.y, j.z);
            }
            let base = digit.metacarpal().prev_joint();
            wrist += Self::to_image(base.x, base.y, base.z);
        }
        // Metacarpal bases cluster around the wrist.
        landmarks[HandLandmark::Wrist.index()] = wrist / 5.0;

        Ok(FramePoll::Frame(HandFrame::new(landmarks)?))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
