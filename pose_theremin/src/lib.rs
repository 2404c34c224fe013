//! # pose_theremin
//!
//! A theremin played with the body: the height of one tracked wrist selects
//! a note from a configurable table, played over real-time MIDI.
//!
//! ## Height → Note mapping
//!
//! | Stage | In | Out |
//! |---|---|---|
//! | Confidence gate | wrist keypoint | drops frames with `score <= threshold` |
//! | Quantizer | wrist `y` (pixels, 0 = top) | bin index — top of frame is the highest bin |
//! | Trigger | bin index | `NoteChange` iff the bin differs from the last one |
//! | Sink | MIDI note | retune + level on the synth channel |
//!
//! The mapping is inverted on purpose: raising the wrist raises the pitch,
//! even though pixel `y` grows downward.
//!
//! ## Pose sources
//!
//! * (default) — **Simulation mode**: a synthetic wrist sweeps the frame
//!   height on a sine, with occasional low-confidence dropouts.
//! * `--listen <addr>` — **Detector mode**: newline-separated
//!   `partName x y score` datagrams over UDP from an external detector.
//!
//! ## Terminal controls
//!
//! | Key | Action |
//! |---|---|
//! | `Enter` / `m` | Toggle sound on/off (starts muted) |
//! | `q` | Quit |

pub mod source;
pub mod player;
pub mod app;
