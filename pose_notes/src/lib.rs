//! # pose_notes
//!
//! Turn a noisy 2D keypoint stream into a debounced note-trigger stream:
//!
//! * **Vertical position** → bin index, via an inverted, clamped range
//!   quantizer (higher on screen = higher note).
//! * **Bin index** → [`NoteChange`] events, via a trigger that suppresses
//!   repeats and carries the session's mute toggle.
//!
//! ## Quick start
//!
//! ```rust
//! use pose_notes::{NoteMapper, NoteTable};
//! use pose_stream::{PartName, PoseFrame};
//!
//! let mut mapper = NoteMapper::new(
//!     NoteTable::default(),        // C4 D4 E4 F4 G4 A4
//!     PartName::RightWrist,
//!     0.2,                         // confidence threshold
//!     480.0,                       // frame height
//! );
//!
//! let frame = PoseFrame::at_rest(640.0, 480.0);
//! let change = mapper.process(&frame).unwrap();
//! assert_eq!(change.pitch, 62);    // wrist at rest sits in the D4 bin
//! assert!(mapper.process(&frame).is_none()); // same bin → suppressed
//! ```

use pose_stream::{PartName, PoseFrame};

// ════════════════════════════════════════════════════════════════════════════
// NoteTable — the pitches a pose can reach
// ════════════════════════════════════════════════════════════════════════════

/// An ordered table of MIDI pitch values, fixed at construction.
///
/// The quantizer's bin index selects directly into this table, so its length
/// is the number of reachable notes.  Always non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteTable {
    notes: Vec<u8>,
}

impl NoteTable {
    /// Major scale, as semitone offsets from the root: W W H W W W H.
    pub const MAJOR_INTERVALS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
    /// Minor pentatonic, as semitone offsets from the root.
    pub const MINOR_PENTATONIC_INTERVALS: [u8; 5] = [0, 3, 5, 7, 10];

    /// Build a table from explicit MIDI pitches.
    pub fn new(notes: Vec<u8>) -> Self {
        assert!(!notes.is_empty(), "note table must hold at least one pitch");
        assert!(notes.iter().all(|&n| n <= 127), "MIDI pitches are 0–127");
        NoteTable { notes }
    }

    /// `count` pitches walked up a scale from `root`, wrapping across
    /// octaves, clamped to MIDI 127.
    pub fn from_scale(root: u8, intervals: &[u8], count: usize) -> Self {
        assert!(!intervals.is_empty(), "scale needs at least one interval");
        assert!(count >= 1, "note table must hold at least one pitch");
        let n = intervals.len();
        let notes = (0..count).map(|i| {
            let octave   = i / n;
            let semitone = intervals[i % n] as usize;
            (root as usize + octave * 12 + semitone).min(127) as u8
        }).collect();
        NoteTable { notes }
    }

    /// `count` pitches up a major scale from `root`.
    pub fn major(root: u8, count: usize) -> Self {
        NoteTable::from_scale(root, &Self::MAJOR_INTERVALS, count)
    }

    /// `count` pitches up a minor pentatonic scale from `root`.
    pub fn minor_pentatonic(root: u8, count: usize) -> Self {
        NoteTable::from_scale(root, &Self::MINOR_PENTATONIC_INTERVALS, count)
    }

    /// Number of pitches.
    pub fn len(&self) -> usize { self.notes.len() }

    pub fn is_empty(&self) -> bool { self.notes.is_empty() }

    /// Pitch at `bin`, or `None` past the end.
    pub fn get(&self, bin: usize) -> Option<u8> {
        self.notes.get(bin).copied()
    }

    /// Pitch at `bin`, clamped into the table.
    pub fn note_for(&self, bin: usize) -> u8 {
        self.notes[bin.min(self.notes.len() - 1)]
    }

    pub fn notes(&self) -> &[u8] { &self.notes }
}

impl Default for NoteTable {
    /// The six-note hexachord C4 D4 E4 F4 G4 A4.
    fn default() -> Self {
        NoteTable::new(vec![60, 62, 64, 65, 67, 69])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// quantize — inverted, clamped range quantizer
// ════════════════════════════════════════════════════════════════════════════

/// Map a continuous `value` in `[in_min, in_max]` onto one of `bin_count`
/// bins, **inverted**: `value = in_min` lands in the highest bin
/// (`bin_count - 1`), `value = in_max` in bin 0.
///
/// The inversion fits the screen-Y-to-pitch use: a wrist higher on screen
/// has a *smaller* y and should reach a *higher* note.
///
/// The fractional bin is truncated toward zero, and the result is clamped
/// into `[0, bin_count - 1]` — values outside the input range extrapolate
/// linearly and then clamp, so the returned index is always safe to use as a
/// table lookup.  Pure function of its four arguments.
///
/// A degenerate span (`in_max <= in_min`) maps everything to bin 0.
///
/// # Example
/// ```rust
/// use pose_notes::quantize;
///
/// assert_eq!(quantize(0.0,   0.0, 480.0, 6), 5); // top of frame → highest
/// assert_eq!(quantize(480.0, 0.0, 480.0, 6), 0); // bottom → lowest
/// assert_eq!(quantize(240.0, 0.0, 480.0, 6), 2); // midpoint truncates down
/// ```
pub fn quantize(value: f32, in_min: f32, in_max: f32, bin_count: usize) -> usize {
    assert!(bin_count >= 1, "quantizer needs at least one bin");
    if in_max <= in_min {
        return 0;
    }
    let top    = (bin_count - 1) as f32;
    let mapped = top * (in_max - value) / (in_max - in_min);
    // `as` truncates toward zero; negative extrapolations clamp to bin 0.
    mapped.clamp(0.0, top) as usize
}

// ════════════════════════════════════════════════════════════════════════════
// NoteTrigger — debounced emission + mute toggle
// ════════════════════════════════════════════════════════════════════════════

/// A debounced note event: the bin that became active and its pitch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteChange {
    /// Index into the [`NoteTable`].
    pub index: usize,
    /// MIDI pitch at that index.
    pub pitch: u8,
}

/// Decides when a bin index becomes a [`NoteChange`] and when it is
/// suppressed as a repeat, and carries the session's mute toggle.
///
/// Starts **muted**: audio output platforms start silent until a
/// user gesture, so the first toggle is "turn the sound on".
///
/// Muting does not pause tracking — [`NoteTrigger::observe`] keeps updating
/// the last-seen bin while muted, so unmuting resumes at the current pitch
/// instead of replaying a stale one.  Callers are expected to force
/// amplitude to zero at the audio sink while muted.
#[derive(Clone, Debug)]
pub struct NoteTrigger {
    table:      NoteTable,
    last_index: Option<usize>,
    muted:      bool,
}

impl NoteTrigger {
    pub fn new(table: NoteTable) -> Self {
        NoteTrigger { table, last_index: None, muted: true }
    }

    /// Observe the quantized bin for one frame.
    ///
    /// Emits a [`NoteChange`] iff `bin` differs from the last emitted index
    /// (or none exists yet); otherwise `None`.  `bin` is clamped into the
    /// table first, so the recorded index is always a valid lookup.
    pub fn observe(&mut self, bin: usize) -> Option<NoteChange> {
        let idx = bin.min(self.table.len() - 1);
        if self.last_index == Some(idx) {
            return None;
        }
        self.last_index = Some(idx);
        Some(NoteChange { index: idx, pitch: self.table.note_for(idx) })
    }

    /// Flip the mute state and return the **new** value.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn is_muted(&self) -> bool { self.muted }

    /// The last emitted bin, if any.
    pub fn last_index(&self) -> Option<usize> { self.last_index }

    pub fn table(&self) -> &NoteTable { &self.table }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteMapper — gate → quantize → trigger, composed
// ════════════════════════════════════════════════════════════════════════════

/// The full per-frame pipeline: pick one tracked part out of a
/// [`PoseFrame`], gate it on confidence, quantize its vertical position,
/// and debounce the result.
///
/// The part is resolved by name; nothing here indexes keypoints by raw
/// schema position.
#[derive(Clone, Debug)]
pub struct NoteMapper {
    trigger:   NoteTrigger,
    part:      PartName,
    threshold: f32,
    span:      f32,
}

impl NoteMapper {
    /// `span` is the frame height in pixels — the `in_max` of the quantizer.
    pub fn new(table: NoteTable, part: PartName, threshold: f32, span: f32) -> Self {
        assert!(span > 0.0, "span must be a positive pixel height");
        NoteMapper { trigger: NoteTrigger::new(table), part, threshold, span }
    }

    /// Map one frame to at most one note change.
    ///
    /// Returns `None` when the tracked keypoint fails the confidence gate
    /// (tracking resumes on the next trusted frame) or when the bin is an
    /// unchanged repeat.
    pub fn process(&mut self, frame: &PoseFrame) -> Option<NoteChange> {
        let kp = frame.get(self.part);
        if !kp.is_trusted(self.threshold) {
            return None;
        }
        let bin = quantize(kp.y, 0.0, self.span, self.trigger.table().len());
        self.trigger.observe(bin)
    }

    /// Flip the mute state and return the new value.
    pub fn toggle_mute(&mut self) -> bool { self.trigger.toggle_mute() }

    pub fn is_muted(&self) -> bool { self.trigger.is_muted() }

    pub fn last_index(&self) -> Option<usize> { self.trigger.last_index() }

    pub fn part(&self) -> PartName { self.part }

    pub fn threshold(&self) -> f32 { self.threshold }

    pub fn table(&self) -> &NoteTable { self.trigger.table() }
}

impl Default for NoteMapper {
    /// Right wrist over a 480-pixel frame, default table and threshold.
    fn default() -> Self {
        NoteMapper::new(
            NoteTable::default(),
            PartName::RightWrist,
            pose_stream::DEFAULT_SCORE_THRESHOLD,
            480.0,
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pitch ↔ frequency (A440, 12-TET)
// ════════════════════════════════════════════════════════════════════════════

pub const A4_FREQ_HZ: f32 = 440.0;
pub const A4_MIDI_NOTE: u8 = 69;
pub const SEMITONES_PER_OCTAVE: u8 = 12;

/// Frequency of a MIDI note in equal temperament: `440 × 2^((n − 69) / 12)`.
pub fn midi_to_freq(note: u8) -> f32 {
    let semis = note as f32 - A4_MIDI_NOTE as f32;
    A4_FREQ_HZ * 2_f32.powf(semis / SEMITONES_PER_OCTAVE as f32)
}

/// Nearest MIDI note for a frequency, clamped to 0–127.
/// Non-positive frequencies map to note 0.
pub fn freq_to_midi(hz: f32) -> u8 {
    if hz <= 0.0 {
        return 0;
    }
    let semis = SEMITONES_PER_OCTAVE as f32 * (hz / A4_FREQ_HZ).log2();
    (A4_MIDI_NOTE as f32 + semis).round().clamp(0.0, 127.0) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(wrist_y: f32, wrist_score: f32) -> PoseFrame {
        let mut frame = PoseFrame::at_rest(640.0, 480.0);
        let i = PartName::RightWrist.index();
        frame.keypoints[i].y = wrist_y;
        frame.keypoints[i].score = wrist_score;
        frame
    }

    // ── quantize ─────────────────────────────────────────────────────────
    #[test]
    fn quantize_top_of_frame_is_highest_bin() {
        assert_eq!(quantize(0.0, 0.0, 480.0, 6), 5);
    }

    #[test]
    fn quantize_bottom_of_frame_is_bin_zero() {
        assert_eq!(quantize(480.0, 0.0, 480.0, 6), 0);
    }

    #[test]
    fn quantize_midpoint_truncates_toward_zero() {
        // 240 maps to exactly 2.5; truncation keeps it in bin 2.
        assert_eq!(quantize(240.0, 0.0, 480.0, 6), 2);
    }

    #[test]
    fn quantize_in_range_never_escapes_the_table() {
        for y in 0..=480 {
            let bin = quantize(y as f32, 0.0, 480.0, 6);
            assert!(bin <= 5, "y={} escaped to bin {}", y, bin);
        }
    }

    #[test]
    fn quantize_clamps_extrapolated_inputs() {
        assert_eq!(quantize(-50.0, 0.0, 480.0, 6), 5);      // above the frame
        assert_eq!(quantize(-1e6, 0.0, 480.0, 6), 5);
        assert_eq!(quantize(530.0, 0.0, 480.0, 6), 0);      // below the frame
        assert_eq!(quantize(1e6, 0.0, 480.0, 6), 0);
    }

    #[test]
    fn quantize_is_monotonically_decreasing_in_y() {
        let mut last = quantize(0.0, 0.0, 480.0, 6);
        for y in 1..=480 {
            let bin = quantize(y as f32, 0.0, 480.0, 6);
            assert!(bin <= last);
            last = bin;
        }
    }

    #[test]
    fn quantize_single_bin_always_zero() {
        assert_eq!(quantize(0.0, 0.0, 480.0, 1), 0);
        assert_eq!(quantize(480.0, 0.0, 480.0, 1), 0);
    }

    #[test]
    fn quantize_degenerate_span_is_bin_zero() {
        assert_eq!(quantize(123.0, 100.0, 100.0, 6), 0);
    }

    // ── NoteTable ────────────────────────────────────────────────────────
    #[test]
    fn default_table_is_the_hexachord() {
        assert_eq!(NoteTable::default().notes(), &[60, 62, 64, 65, 67, 69]);
    }

    #[test]
    fn major_scale_wraps_octaves() {
        let t = NoteTable::major(60, 8);
        assert_eq!(t.notes(), &[60, 62, 64, 65, 67, 69, 71, 72]);
    }

    #[test]
    fn minor_pentatonic_from_a3() {
        let t = NoteTable::minor_pentatonic(57, 6);
        assert_eq!(t.notes(), &[57, 60, 62, 64, 67, 69]);
    }

    #[test]
    fn from_scale_clamps_at_127() {
        let t = NoteTable::major(120, 5);
        assert_eq!(t.notes(), &[120, 122, 124, 125, 127]);
    }

    #[test]
    fn note_for_clamps_into_the_table() {
        let t = NoteTable::default();
        assert_eq!(t.note_for(0), 60);
        assert_eq!(t.note_for(5), 69);
        assert_eq!(t.note_for(99), 69);
        assert_eq!(t.get(99), None);
    }

    #[test]
    #[should_panic(expected = "at least one pitch")]
    fn empty_table_is_rejected() {
        let _ = NoteTable::new(vec![]);
    }

    // ── NoteTrigger ──────────────────────────────────────────────────────
    #[test]
    fn first_observation_emits() {
        let mut tr = NoteTrigger::new(NoteTable::default());
        assert_eq!(tr.observe(3), Some(NoteChange { index: 3, pitch: 65 }));
    }

    #[test]
    fn repeats_are_suppressed_changes_emit() {
        let mut tr = NoteTrigger::new(NoteTable::default());
        assert_eq!(tr.observe(3), Some(NoteChange { index: 3, pitch: 65 }));
        assert_eq!(tr.observe(3), None);
        assert_eq!(tr.observe(4), Some(NoteChange { index: 4, pitch: 67 }));
    }

    #[test]
    fn out_of_table_bins_clamp_before_recording() {
        let mut tr = NoteTrigger::new(NoteTable::default());
        assert_eq!(tr.observe(99), Some(NoteChange { index: 5, pitch: 69 }));
        assert_eq!(tr.last_index(), Some(5));
        // A legitimate 5 afterwards is the same index → suppressed.
        assert_eq!(tr.observe(5), None);
    }

    #[test]
    fn starts_muted_and_toggle_returns_new_state() {
        let mut tr = NoteTrigger::new(NoteTable::default());
        assert!(tr.is_muted());
        assert!(!tr.toggle_mute());
        assert!(!tr.is_muted());
    }

    #[test]
    fn double_toggle_is_involution() {
        let mut tr = NoteTrigger::new(NoteTable::default());
        let before = tr.is_muted();
        tr.toggle_mute();
        tr.toggle_mute();
        assert_eq!(tr.is_muted(), before);
    }

    #[test]
    fn muted_observation_still_tracks_pitch() {
        let mut tr = NoteTrigger::new(NoteTable::default());
        assert!(tr.is_muted());
        assert!(tr.observe(2).is_some());
        assert_eq!(tr.last_index(), Some(2));
        tr.toggle_mute();
        // Unmuting does not replay bin 2 — only a change emits.
        assert_eq!(tr.observe(2), None);
        assert!(tr.observe(3).is_some());
    }

    // ── NoteMapper ───────────────────────────────────────────────────────
    #[test]
    fn mapper_resolves_the_wrist_at_rest() {
        // At rest the right wrist sits at y = 0.64 × 480 = 307.2,
        // which quantizes to bin 1 → D4.
        let mut m = NoteMapper::default();
        let change = m.process(&PoseFrame::at_rest(640.0, 480.0));
        assert_eq!(change, Some(NoteChange { index: 1, pitch: 62 }));
    }

    #[test]
    fn mapper_reaches_the_top_note() {
        let mut m = NoteMapper::default();
        assert_eq!(
            m.process(&make_frame(0.0, 0.9)),
            Some(NoteChange { index: 5, pitch: 69 })
        );
    }

    #[test]
    fn untrusted_wrist_emits_nothing_and_leaves_state_alone() {
        let mut m = NoteMapper::default();
        assert_eq!(m.process(&make_frame(100.0, 0.15)), None);
        assert_eq!(m.last_index(), None);
        // Next trusted frame resumes normally.
        assert!(m.process(&make_frame(100.0, 0.9)).is_some());
    }

    #[test]
    fn unchanged_bin_across_frames_is_suppressed() {
        let mut m = NoteMapper::default();
        assert!(m.process(&make_frame(200.0, 0.9)).is_some());
        assert!(m.process(&make_frame(201.0, 0.9)).is_none()); // same bin
        assert!(m.process(&make_frame(20.0, 0.9)).is_some());  // new bin
    }

    #[test]
    fn mapper_tracks_a_configured_part() {
        let mut m = NoteMapper::new(NoteTable::default(), PartName::LeftWrist, 0.2, 480.0);
        let mut frame = PoseFrame::at_rest(640.0, 480.0);
        frame.keypoints[PartName::LeftWrist.index()].y = 0.0;
        assert_eq!(m.process(&frame).map(|c| c.index), Some(5));
    }

    // ── pitch ↔ frequency ────────────────────────────────────────────────
    #[test]
    fn a4_is_440() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn middle_c_frequency() {
        assert!((midi_to_freq(60) - 261.626).abs() < 0.01);
    }

    #[test]
    fn octave_doubles_frequency() {
        assert!((midi_to_freq(81) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn freq_to_midi_inverts_on_note_frequencies() {
        for note in [0u8, 21, 60, 69, 81, 108, 127] {
            assert_eq!(freq_to_midi(midi_to_freq(note)), note);
        }
    }

    #[test]
    fn freq_to_midi_guards_non_positive() {
        assert_eq!(freq_to_midi(0.0), 0);
        assert_eq!(freq_to_midi(-5.0), 0);
    }
}
