//! Audio output backends.
//!
//! The mapper's whole output surface is two commands — set a frequency, set
//! an amplitude — the contract of a monophonic oscillator.  The real backend
//! drives a MIDI synthesiser through midir; when no port can be opened a
//! null backend accepts the same commands so the rest of the app needs no
//! special case.

use pose_notes::freq_to_midi;

/// Fade time used when the sound is switched on.
pub const UNMUTE_RAMP_SECS: f32 = 0.01;

// ════════════════════════════════════════════════════════════════════════════
// AudioSink — abstraction over midir / null
// ════════════════════════════════════════════════════════════════════════════

/// A monophonic voice accepting frequency and amplitude commands.
pub trait AudioSink: Send {
    /// Retune the voice to `hz`.
    fn set_frequency(&mut self, hz: f32);

    /// Set the output level (0.0–1.0) with a fade of `ramp_secs`.
    /// Backends that cannot ramp apply the level immediately.
    fn set_amplitude(&mut self, level: f32, ramp_secs: f32);
}

// ── midir backend ─────────────────────────────────────────────────────────

/// Plays through a MIDI synthesiser: frequency commands become note on/off
/// pairs on the nearest equal-tempered pitch, amplitude commands become
/// channel volume (CC 7).
pub struct MidiSink {
    conn:         midir::MidiOutputConnection,
    channel:      u8,
    velocity:     u8,
    current_note: Option<u8>,
}

impl AudioSink for MidiSink {
    fn set_frequency(&mut self, hz: f32) {
        let note = freq_to_midi(hz);
        if self.current_note == Some(note) {
            return; // already sounding the nearest pitch
        }
        if let Some(old) = self.current_note.take() {
            let _ = self.conn.send(&[0x80 | (self.channel & 0x0F), old, 0]);
        }
        let _ = self.conn.send(&[0x90 | (self.channel & 0x0F), note, self.velocity]);
        self.current_note = Some(note);
    }

    fn set_amplitude(&mut self, level: f32, _ramp_secs: f32) {
        // MIDI cannot ramp; the level lands immediately on CC 7.
        let vol = level_to_cc(level);
        let _ = self.conn.send(&[0xB0 | (self.channel & 0x0F), 7, vol]);
    }
}

impl Drop for MidiSink {
    fn drop(&mut self) {
        if let Some(note) = self.current_note.take() {
            let _ = self.conn.send(&[0x80 | (self.channel & 0x0F), note, 0]);
        }
    }
}

/// Map a 0.0–1.0 level onto a 0–127 controller value.
fn level_to_cc(level: f32) -> u8 {
    (level.clamp(0.0, 1.0) * 127.0).round() as u8
}

// ── null backend (used when no MIDI port is available) ────────────────────

/// Accepts and discards every command.
pub struct NullSink;

impl AudioSink for NullSink {
    fn set_frequency(&mut self, _hz: f32)                 {}
    fn set_amplitude(&mut self, _level: f32, _ramp: f32)  {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_audio_sink — enumerate MIDI ports and pick the best available
// ════════════════════════════════════════════════════════════════════════════

/// Try to open a MIDI output port and program it.
/// Falls back to [`NullSink`] with a warning if none can be opened.
pub fn open_audio_sink(program: u8, channel: u8) -> Box<dyn AudioSink> {
    let midi_out = match midir::MidiOutput::new("pose_theremin") {
        Ok(m)  => m,
        Err(e) => {
            eprintln!("[audio] MIDI init failed ({}) — running silent", e);
            return Box::new(NullSink);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        eprintln!("[audio] No MIDI output port anywhere — the theremin runs silent.");
        eprintln!("[audio] Start a software synthesiser and relaunch to hear it,");
        eprintln!("        e.g. `fluidsynth -a pulseaudio` or `timidity -iA` on Linux,");
        eprintln!("        or any CoreMIDI destination on macOS.");
        return Box::new(NullSink);
    }

    // Prefer a port that sounds on its own over hardware outs and thru ports.
    let port_idx = ports.iter().enumerate()
        .find(|(_, p)| midi_out.port_name(p).map(|n| is_softsynth(&n)).unwrap_or(false))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());
    eprintln!("[audio] Playing through: {}", name);

    match midi_out.connect(port, "pose-voice") {
        Ok(mut conn) => {
            let channel = channel & 0x0F;
            let _ = conn.send(&[0xC0 | channel, program.min(127)]);
            Box::new(MidiSink { conn, channel, velocity: 100, current_note: None })
        }
        Err(e) => {
            eprintln!("[audio] Could not connect to {} ({}) — running silent", name, e);
            Box::new(NullSink)
        }
    }
}

/// Port names that look like a software synthesiser — something that makes
/// sound on its own, unlike a hardware out or a thru port.
fn is_softsynth(name: &str) -> bool {
    let n = name.to_lowercase();
    n.contains("fluid") || n.contains("timidity") ||
    n.contains("wavetable") || n.contains("synth")
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_cc_endpoints() {
        assert_eq!(level_to_cc(0.0), 0);
        assert_eq!(level_to_cc(1.0), 127);
    }

    #[test]
    fn level_to_cc_midpoint_rounds() {
        assert_eq!(level_to_cc(0.5), 64);
    }

    #[test]
    fn level_to_cc_clamps_out_of_range() {
        assert_eq!(level_to_cc(-3.0), 0);
        assert_eq!(level_to_cc(2.0), 127);
    }

    #[test]
    fn null_sink_swallows_commands() {
        let mut sink = NullSink;
        sink.set_frequency(440.0);
        sink.set_amplitude(1.0, UNMUTE_RAMP_SECS);
    }

    #[test]
    fn softsynth_ports_are_preferred() {
        assert!(is_softsynth("FLUID Synth (qsynth)"));
        assert!(is_softsynth("TiMidity port 0"));
        assert!(is_softsynth("Microsoft GS Wavetable Synth"));
        assert!(!is_softsynth("USB MIDI Interface"));
        assert!(!is_softsynth("Midi Through Port-0"));
    }
}
