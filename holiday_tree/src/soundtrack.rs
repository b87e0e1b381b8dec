//! Soundtrack clock and synchronised lyrics.
//!
//! No audio is decoded here.  The clock stands in for the playback position
//! of an external player: it starts on the first gesture or manual toggle,
//! advances with the frame clock, and loops.  The overlay reads the current
//! lyric and the volume envelope from it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// One timed lyric line.
#[derive(Clone, Debug, PartialEq)]
pub struct LyricLine {
    /// Seconds from the start of the song.
    pub time: f32,
    pub text: String,
}

impl LyricLine {
    fn new(time: f32, text: &str) -> Self {
        LyricLine { time, text: text.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SoundtrackSettings {
    /// `.lrc` file; the fallback lines are shown when unset or unreadable.
    pub lyrics: Option<PathBuf>,
    /// Song length.  Defaults to a few seconds past the last lyric.
    pub loop_secs: Option<f32>,
}

// ════════════════════════════════════════════════════════════════════════════
// LRC parsing
// ════════════════════════════════════════════════════════════════════════════

/// Parse a `[mm:ss]` / `[mm:ss.xx]` / `[mm:ss.xxx]` timestamp at the start
/// of `line`.  Returns seconds and the remainder of the line.
fn parse_timestamp(line: &str) -> Option<(f32, &str)> {
    let rest = line.strip_prefix('[')?;
    let (tag, text) = rest.split_once(']')?;
    let (mm, ss) = tag.split_once(':')?;
    let (ss, frac) = match ss.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (ss, None),
    };
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(mm) || !two_digits(ss) {
        return None;
    }
    let mut secs = mm.parse::<f32>().ok()? * 60.0 + ss.parse::<f32>().ok()?;
    if let Some(f) = frac {
        if !(2..=3).contains(&f.len()) || !f.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Two digits are hundredths, three are thousandths.
        secs += f.parse::<f32>().ok()? / 10f32.powi(f.len() as i32);
    }
    Some((secs, text))
}

/// Timed lines, sorted by time.  Untimed lines, metadata tags such as
/// `[ar:...]`, and lines with no text are dropped.
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut lines: Vec<LyricLine> = text
        .lines()
        .filter_map(|line| parse_timestamp(line.trim()))
        .filter_map(|(time, rest)| {
            let rest = rest.trim();
            (!rest.is_empty()).then(|| LyricLine::new(time, rest))
        })
        .collect();
    lines.sort_by(|a, b| a.time.total_cmp(&b.time));
    lines
}

/// Shown before the first real line of a song with a long intro.
fn intro() -> [LyricLine; 2] {
    [LyricLine::new(0.0, "..."), LyricLine::new(1.0, "(Listening...)")]
}

pub fn fallback_lyrics() -> Vec<LyricLine> {
    let mut lines = intro().to_vec();
    lines.push(LyricLine::new(5.0, "Lyrics not found"));
    lines.push(LyricLine::new(8.0, "Add a .lrc file to the soundtrack settings"));
    lines
}

/// Read and parse `path`, falling back on any failure.
pub fn load_lyrics(path: Option<&Path>) -> Vec<LyricLine> {
    let Some(path) = path else {
        return fallback_lyrics();
    };
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read lyrics, using fallback");
            return fallback_lyrics();
        }
    };
    let mut lines = parse_lrc(&text);
    let Some(first) = lines.first().map(|l| l.time) else {
        warn!(path = %path.display(), "no timed lyrics found, using fallback");
        return fallback_lyrics();
    };
    if first > 2.0 {
        let mut padded = intro().to_vec();
        padded.append(&mut lines);
        lines = padded;
    }
    info!(path = %path.display(), lines = lines.len(), "lyrics loaded");
    lines
}

// ════════════════════════════════════════════════════════════════════════════
// Soundtrack
// ════════════════════════════════════════════════════════════════════════════

const QUIET: f32 = 0.4;
const LOUD: f32 = 1.0;
const RAMP_STEP_SECS: f32 = 0.05;
const RAMP_FRACTION: f32 = 0.05;
const RAMP_SNAP: f32 = 0.02;
const TAIL_SECS: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct Soundtrack {
    lyrics: Vec<LyricLine>,
    length: f32,
    playing: bool,
    position: f32,
    volume: f32,
    ramp_clock: f32,
}

impl Soundtrack {
    pub fn new(lyrics: Vec<LyricLine>, loop_secs: Option<f32>) -> Self {
        let last = lyrics.last().map_or(0.0, |l| l.time);
        let length = loop_secs.filter(|s| *s > 0.0).unwrap_or(last + TAIL_SECS);
        Soundtrack {
            lyrics,
            length,
            playing: false,
            position: 0.0,
            volume: QUIET,
            ramp_clock: 0.0,
        }
    }

    pub fn from_settings(settings: &SoundtrackSettings) -> Self {
        Soundtrack::new(load_lyrics(settings.lyrics.as_deref()), settings.loop_secs)
    }

    /// Start playback.  Returns true only on the call that started it.
    pub fn start(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.playing = true;
        self.volume = QUIET;
        info!("soundtrack started");
        true
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn tick(&mut self, dt: f32, zoomed: bool) {
        if !self.playing || dt <= 0.0 {
            return;
        }
        self.position = (self.position + dt) % self.length;

        let target = if zoomed { LOUD } else { QUIET };
        self.ramp_clock += dt;
        while self.ramp_clock >= RAMP_STEP_SECS {
            self.ramp_clock -= RAMP_STEP_SECS;
            let gap = target - self.volume;
            if gap.abs() < RAMP_SNAP {
                self.volume = target;
                self.ramp_clock = 0.0;
                break;
            }
            self.volume += gap * RAMP_FRACTION;
        }
    }

    /// The latest line whose time has passed, or `"..."` before the first.
    pub fn current_lyric(&self) -> &str {
        self.lyrics
            .iter()
            .rev()
            .find(|l| l.time <= self.position)
            .map_or("...", |l| l.text.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn parses_and_sorts_timed_lines() {
        let lines = parse_lrc(
            "[ar:Someone]\n\
             [00:12.50] second\n\
             [00:03] first\n\
             [01:02.125]third\n\
             [00:20.00]   \n\
             no tag here\n",
        );
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(lines[0].time, 3.0);
        assert!((lines[1].time - 12.5).abs() < 1e-4);
        assert!((lines[2].time - 62.125).abs() < 1e-4);
    }

    #[test]
    fn rejects_odd_timestamps() {
        assert_eq!(parse_timestamp("[0:12] x"), None);
        assert_eq!(parse_timestamp("[00:12.5] x"), None);
        assert_eq!(parse_timestamp("[00:12.5000] x"), None);
        assert_eq!(parse_timestamp("00:12 x"), None);
    }

    #[test]
    fn missing_file_falls_back() {
        let lines = load_lyrics(Some(Path::new("/nonexistent/song.lrc")));
        assert_eq!(lines, fallback_lyrics());
        assert_eq!(load_lyrics(None), fallback_lyrics());
    }

    #[test]
    fn late_first_line_gets_an_intro() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[00:07.00] hello").unwrap();
        writeln!(file, "[00:01.00] early").unwrap();
        let lines = load_lyrics(Some(file.path()));
        assert_eq!(lines[0].text, "early");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[00:07.00] hello").unwrap();
        let lines = load_lyrics(Some(file.path()));
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["...", "(Listening...)", "hello"]);
    }

    #[test]
    fn silent_until_started() {
        let mut s = Soundtrack::new(fallback_lyrics(), None);
        s.tick(3.0, false);
        assert_eq!(s.position(), 0.0);
        assert_eq!(s.current_lyric(), "...");
        assert!(s.start());
        assert!(!s.start());
    }

    #[test]
    fn lyrics_follow_the_clock_and_loop() {
        let mut s = Soundtrack::new(fallback_lyrics(), Some(10.0));
        s.start();
        s.tick(1.5, false);
        assert_eq!(s.current_lyric(), "(Listening...)");
        s.tick(4.0, false);
        assert_eq!(s.current_lyric(), "Lyrics not found");
        s.tick(5.0, false);
        assert!((s.position() - 0.5).abs() < 1e-4);
        assert_eq!(s.current_lyric(), "...");
    }

    #[test]
    fn volume_ramps_up_when_zoomed_and_back() {
        let mut s = Soundtrack::new(fallback_lyrics(), None);
        s.start();
        assert_eq!(s.volume(), QUIET);
        let mut last = s.volume();
        for _ in 0..60 * 10 {
            s.tick(DT, true);
            assert!(s.volume() >= last);
            last = s.volume();
        }
        assert_eq!(s.volume(), LOUD);
        for _ in 0..60 * 10 {
            s.tick(DT, false);
        }
        assert_eq!(s.volume(), QUIET);
    }

    #[test]
    fn one_ramp_step_per_fifty_ms() {
        let mut s = Soundtrack::new(fallback_lyrics(), None);
        s.start();
        s.tick(0.049, true);
        assert_eq!(s.volume(), QUIET);
        s.tick(0.002, true);
        assert!((s.volume() - (QUIET + 0.6 * RAMP_FRACTION)).abs() < 1e-6);
    }
}
