//! Top-level application state.
//!
//! `AppState` owns the `FrameBuffer`, the `NoteMapper`, and the audio sink.
//! Pose frames and control events arrive over channels; once per tick the
//! newest frame runs through the mapping pipeline and any resulting note
//! change is pushed to the sink.

use std::sync::mpsc::TryRecvError;
use std::thread;
use std::time::Duration;

use pose_notes::{midi_to_freq, NoteChange, NoteMapper, NoteTable};
use pose_stream::{FrameBuffer, PartName, PoseFrame, DEFAULT_SCORE_THRESHOLD};

use crate::player::{open_audio_sink, AudioSink, UNMUTE_RAMP_SECS};
use crate::source::{
    spawn_pose_source, spawn_stdin_controls, ControlEvent, SimPoseSource, UdpPoseSource,
};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where pose frames come from.
#[derive(Clone, Debug)]
pub enum SourceKind {
    /// Built-in simulated wrist sweep — no detector needed.
    Sim,
    /// UDP datagrams from an external detector process.
    Udp { addr: String },
}

/// Configuration for the full application, fixed at startup.
pub struct AppConfig {
    pub table:        NoteTable,
    /// The keypoint whose height plays.
    pub part:         PartName,
    pub threshold:    f32,
    pub frame_width:  f32,
    pub frame_height: f32,
    /// Mapping passes per second.
    pub tick_hz:      u64,
    pub source:       SourceKind,
    /// GM program for the MIDI sink.
    pub program:      u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            table:        NoteTable::default(),
            part:         PartName::RightWrist,
            threshold:    DEFAULT_SCORE_THRESHOLD,
            frame_width:  640.0,
            frame_height: 480.0,
            tick_hz:      60,
            source:       SourceKind::Sim,
            program:      80, // Lead 1 (Square)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    buffer:          FrameBuffer,
    mapper:          NoteMapper,
    sink:            Box<dyn AudioSink>,
    pub status:      String,
    changes_emitted: u64,
}

impl AppState {
    pub fn new(cfg: AppConfig, sink: Box<dyn AudioSink>) -> Self {
        let status = format!(
            "Waiting for pose frames — tracking {} over {} notes (muted)",
            cfg.part.as_str(),
            cfg.table.len()
        );
        let mapper = NoteMapper::new(cfg.table, cfg.part, cfg.threshold, cfg.frame_height);
        AppState {
            buffer: FrameBuffer::new(),
            mapper,
            sink,
            status,
            changes_emitted: 0,
        }
    }

    /// Store one arriving frame, replacing any previous one.
    pub fn handle_frame(&mut self, frame: PoseFrame) {
        self.buffer.set_frame(frame);
    }

    /// Run the mapping pipeline against the newest frame.
    ///
    /// On a note change the sink is retuned and the level re-asserted
    /// (forced to zero while muted, so the pitch keeps tracking silently).
    /// Returns the change so callers can report it.
    pub fn tick(&mut self) -> Option<NoteChange> {
        let frame = self.buffer.latest()?;
        let kp = *frame.get(self.mapper.part());
        let change = self.mapper.process(frame)?;

        let hz = midi_to_freq(change.pitch);
        self.sink.set_frequency(hz);
        let level = if self.mapper.is_muted() { 0.0 } else { 1.0 };
        self.sink.set_amplitude(level, UNMUTE_RAMP_SECS);

        self.changes_emitted += 1;
        log::debug!(
            "{} y={:.1} → bin {} → MIDI {} ({:.1} Hz)",
            self.mapper.part().as_str(), kp.y, change.index, change.pitch, hz
        );
        self.status = format!(
            "♪ {} y={:.1} → bin {} → {} ({:.1} Hz){}",
            self.mapper.part().as_str(),
            kp.y,
            change.index,
            note_label(change.pitch),
            hz,
            if self.mapper.is_muted() { "  [muted]" } else { "" },
        );
        Some(change)
    }

    /// Handle a control-surface event.  Returns `false` on quit.
    pub fn handle_control(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::ToggleMute => {
                self.toggle_mute();
                true
            }
            ControlEvent::Quit => false,
        }
    }

    /// Flip the mute toggle and re-assert the sink level.
    /// Returns the new state (`true` = muted).
    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.mapper.toggle_mute();
        if muted {
            self.sink.set_amplitude(0.0, 0.0); // cut immediately
            self.status = "Muted".to_string();
        } else {
            self.sink.set_amplitude(1.0, UNMUTE_RAMP_SECS);
            self.status = match self.mapper.last_index() {
                Some(i) => format!(
                    "Sound on — resuming at bin {} ({})",
                    i,
                    note_label(self.mapper.table().note_for(i))
                ),
                None => "Sound on — raise your wrist to play".to_string(),
            };
        }
        muted
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn is_muted(&self) -> bool { self.mapper.is_muted() }

    /// Frames ever received (counts overwrites).
    pub fn frame_count(&self) -> u64 { self.buffer.frame_count() }

    /// Note changes pushed to the sink so far.
    pub fn changes_emitted(&self) -> u64 { self.changes_emitted }

    pub fn last_index(&self) -> Option<usize> { self.mapper.last_index() }
}

/// "MIDI 62" is opaque; "D4" is not.
fn note_label(note: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NAMES[note as usize % 12], octave)
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Opens the audio sink (MIDI if possible, silent otherwise), spawns the
/// configured pose source and the stdin controls, then drives the pipeline
/// at the configured tick rate.  Frames that arrive between ticks overwrite
/// one another; only the newest is ever mapped.
pub fn run(cfg: AppConfig) -> Result<(), String> {
    let sink = open_audio_sink(cfg.program, 0);

    let frame_rx = match &cfg.source {
        SourceKind::Sim => spawn_pose_source(SimPoseSource {
            width:  cfg.frame_width,
            height: cfg.frame_height,
            part:   cfg.part,
            ..SimPoseSource::default()
        }),
        SourceKind::Udp { addr } => spawn_pose_source(UdpPoseSource { addr: addr.clone() }),
    };
    let control_rx = spawn_stdin_controls();

    let tick = Duration::from_millis(1000 / cfg.tick_hz.max(1));
    let mut app = AppState::new(cfg, sink);
    println!("  {}", app.status);

    loop {
        // 1. Drain pose frames — only the newest survives.
        loop {
            match frame_rx.try_recv() {
                Ok(frame) => app.handle_frame(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err("pose source terminated".to_string());
                }
            }
        }

        // 2. Drain control events.
        loop {
            match control_rx.try_recv() {
                Ok(event) => {
                    if !app.handle_control(event) {
                        println!("  Bye.");
                        return Ok(());
                    }
                    println!("  {}", app.status);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        // 3. Map the newest frame.
        if app.tick().is_some() {
            println!("  {}", app.status);
        }

        thread::sleep(tick);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, PartialEq)]
    enum SinkCall {
        Freq(f32),
        Amp(f32, f32),
    }

    struct Recorder(Arc<Mutex<Vec<SinkCall>>>);

    impl AudioSink for Recorder {
        fn set_frequency(&mut self, hz: f32) {
            self.0.lock().unwrap().push(SinkCall::Freq(hz));
        }
        fn set_amplitude(&mut self, level: f32, ramp: f32) {
            self.0.lock().unwrap().push(SinkCall::Amp(level, ramp));
        }
    }

    fn make_app() -> (AppState, Arc<Mutex<Vec<SinkCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Box::new(Recorder(calls.clone()));
        (AppState::new(AppConfig::default(), sink), calls)
    }

    fn make_frame(wrist_y: f32, wrist_score: f32) -> PoseFrame {
        let mut frame = PoseFrame::at_rest(640.0, 480.0);
        let i = PartName::RightWrist.index();
        frame.keypoints[i].y = wrist_y;
        frame.keypoints[i].score = wrist_score;
        frame
    }

    // ── ticking ──────────────────────────────────────────────────────────
    #[test]
    fn tick_without_frames_is_silent() {
        let (mut app, calls) = make_app();
        assert_eq!(app.tick(), None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn first_change_tunes_then_sets_level() {
        let (mut app, calls) = make_app();
        app.handle_frame(make_frame(0.0, 0.9)); // top of frame → A4
        let change = app.tick().unwrap();
        assert_eq!(change.pitch, 69);
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[SinkCall::Freq(440.0), SinkCall::Amp(0.0, UNMUTE_RAMP_SECS)],
        );
    }

    #[test]
    fn repeat_frames_do_not_retrigger() {
        let (mut app, calls) = make_app();
        app.handle_frame(make_frame(100.0, 0.9));
        assert!(app.tick().is_some());
        app.handle_frame(make_frame(101.0, 0.9)); // same bin
        assert!(app.tick().is_none());
        let n_freq = calls.lock().unwrap().iter()
            .filter(|c| matches!(c, SinkCall::Freq(_)))
            .count();
        assert_eq!(n_freq, 1);
    }

    #[test]
    fn newest_frame_wins() {
        let (mut app, _calls) = make_app();
        app.handle_frame(make_frame(400.0, 0.9));
        app.handle_frame(make_frame(0.0, 0.9));
        assert_eq!(app.tick().map(|c| c.index), Some(5));
        assert_eq!(app.frame_count(), 2);
    }

    #[test]
    fn untrusted_wrist_is_skipped() {
        let (mut app, calls) = make_app();
        app.handle_frame(make_frame(100.0, 0.15));
        assert_eq!(app.tick(), None);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(app.last_index(), None);
    }

    // ── mute toggle ──────────────────────────────────────────────────────
    #[test]
    fn starts_muted_and_double_toggle_restores() {
        let (mut app, _calls) = make_app();
        assert!(app.is_muted());
        assert!(!app.toggle_mute());
        assert!(app.toggle_mute());
        assert!(app.is_muted());
    }

    #[test]
    fn muted_tick_forces_level_to_zero() {
        let (mut app, calls) = make_app();
        app.handle_frame(make_frame(0.0, 0.9));
        app.tick();
        assert_eq!(
            calls.lock().unwrap().last(),
            Some(&SinkCall::Amp(0.0, UNMUTE_RAMP_SECS))
        );
    }

    #[test]
    fn unmute_ramps_up_and_mute_cuts() {
        let (mut app, calls) = make_app();
        app.toggle_mute();
        assert_eq!(
            calls.lock().unwrap().last(),
            Some(&SinkCall::Amp(1.0, UNMUTE_RAMP_SECS))
        );
        app.toggle_mute();
        assert_eq!(calls.lock().unwrap().last(), Some(&SinkCall::Amp(0.0, 0.0)));
    }

    #[test]
    fn unmuted_changes_sound_at_full_level() {
        let (mut app, calls) = make_app();
        app.toggle_mute();
        app.handle_frame(make_frame(0.0, 0.9));
        app.tick();
        assert_eq!(
            calls.lock().unwrap().last(),
            Some(&SinkCall::Amp(1.0, UNMUTE_RAMP_SECS))
        );
    }

    #[test]
    fn pitch_keeps_tracking_while_muted() {
        let (mut app, _calls) = make_app();
        app.handle_frame(make_frame(400.0, 0.9));
        app.tick();
        let tracked = app.last_index();
        app.toggle_mute(); // sound on
        // Unmuting alone re-emits nothing; the tracked bin is unchanged.
        app.handle_frame(make_frame(401.0, 0.9));
        assert_eq!(app.tick(), None);
        assert_eq!(app.last_index(), tracked);
    }

    // ── reporting ────────────────────────────────────────────────────────
    #[test]
    fn status_names_the_note() {
        let (mut app, _calls) = make_app();
        app.handle_frame(make_frame(0.0, 0.9));
        app.tick();
        assert!(app.status.contains("A4"), "status was: {}", app.status);
    }

    #[test]
    fn changes_emitted_counts_distinct_bins() {
        let (mut app, _calls) = make_app();
        for y in [460.0, 300.0, 150.0, 10.0] {
            app.handle_frame(make_frame(y, 0.9));
            app.tick();
        }
        assert_eq!(app.changes_emitted(), 4);
    }

    #[test]
    fn note_labels() {
        assert_eq!(note_label(60), "C4");
        assert_eq!(note_label(69), "A4");
        assert_eq!(note_label(0), "C-1");
        assert_eq!(note_label(61), "C#4");
    }
}
