//! Pose frame sources — a built-in simulator and a UDP listener — plus the
//! stdin control surface.
//!
//! The public interface is [`PoseFrame`]s delivered over an `mpsc` channel.
//! Consumers don't need to know whether frames came from a live detector or
//! the simulator.

use std::io::{self, BufRead};
use std::net::UdpSocket;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use rand::Rng;

use pose_stream::{Keypoint, PartName, PoseFrame, PART_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// ControlEvent — the user control surface
// ════════════════════════════════════════════════════════════════════════════

/// A user action from the control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// Flip the mute toggle (sound starts off).
    ToggleMute,
    /// Quit the application.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// PoseSource trait — unified interface for live and simulated frames
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`PoseFrame`]s over a channel.
pub trait PoseSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>);
}

/// Spawn a pose source on its own thread and return the receiving end.
pub fn spawn_pose_source<S: PoseSource>(source: S) -> Receiver<PoseFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimPoseSource — synthesized wrist sweep (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Pose source that synthesizes detections: a standing figure whose tracked
/// wrist sweeps the full frame height on a slow sine, with per-keypoint
/// jitter and occasional low-confidence dropouts.
///
/// Lets the whole pipeline run with no detector attached.
pub struct SimPoseSource {
    pub width:      f32,
    pub height:     f32,
    /// Frames delivered per second.
    pub fps:        u32,
    /// Seconds for one full up-and-down sweep of the wrist.
    pub sweep_secs: f32,
    /// Probability that a frame's wrist detection comes back untrusted.
    pub dropout:    f32,
    /// Which part performs the sweep.
    pub part:       PartName,
}

impl Default for SimPoseSource {
    fn default() -> Self {
        SimPoseSource {
            width:      640.0,
            height:     480.0,
            fps:        30,
            sweep_secs: 8.0,
            dropout:    0.05,
            part:       PartName::RightWrist,
        }
    }
}

impl PoseSource for SimPoseSource {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>) {
        let mut rng = rand::thread_rng();
        let fps  = self.fps.max(1);
        let tick = Duration::from_millis(1000 / fps as u64);
        let dt   = 1.0 / fps as f32;
        let mut t = 0.0_f32;

        loop {
            let frame = synth_frame(&self, t, &mut rng);
            if tx.send(frame).is_err() {
                return; // consumer gone
            }
            t += dt;
            thread::sleep(tick);
        }
    }
}

/// One simulated detection at time `t`.
fn synth_frame<R: Rng>(src: &SimPoseSource, t: f32, rng: &mut R) -> PoseFrame {
    let mut frame = PoseFrame::at_rest(src.width, src.height);

    // Small positional and confidence noise on every keypoint.
    for kp in frame.keypoints.iter_mut() {
        kp.x = (kp.x + rng.gen_range(-2.0..2.0)).clamp(0.0, src.width);
        kp.y = (kp.y + rng.gen_range(-2.0..2.0)).clamp(0.0, src.height);
        kp.score = (kp.score + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0);
    }

    // The tracked wrist sweeps the frame height: centre at t = 0, then an
    // almost-full-range sine.
    let phase = (t / src.sweep_secs.max(0.1)) * std::f32::consts::TAU;
    let y     = src.height * (0.5 - 0.45 * phase.sin());

    let wrist = &mut frame.keypoints[src.part.index()];
    wrist.y = (y + rng.gen_range(-4.0..4.0)).clamp(0.0, src.height);
    wrist.score = if rng.gen::<f32>() < src.dropout {
        rng.gen_range(0.0..0.15) // detector lost the hand for a moment
    } else {
        rng.gen_range(0.75..0.99)
    };

    frame
}

// ════════════════════════════════════════════════════════════════════════════
// UdpPoseSource — datagram feed from an external detector process
// ════════════════════════════════════════════════════════════════════════════

/// Pose source fed by UDP datagrams, one frame per datagram.
///
/// # Wire format
///
/// One keypoint per line, whitespace-separated:
///
/// ```text
/// rightWrist 312.5 140.2 0.87
/// leftWrist  280.0 300.9 0.91
/// nose       330.1  90.4 0.99
/// ```
///
/// Unknown part names are ignored; parts missing from the datagram keep
/// score 0 (and therefore never pass the confidence gate).  A datagram with
/// no parseable line is discarded with a warning.
pub struct UdpPoseSource {
    /// Bind address, e.g. `0.0.0.0:9900`.
    pub addr: String,
}

impl PoseSource for UdpPoseSource {
    fn run(self: Box<Self>, tx: Sender<PoseFrame>) {
        let socket = match UdpSocket::bind(&self.addr) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("cannot bind pose socket {}: {}", self.addr, e);
                return;
            }
        };
        log::info!("listening for pose datagrams on {}", self.addr);

        let mut buf = [0u8; 2048];
        loop {
            let n = match socket.recv(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("pose socket receive error: {}", e);
                    continue;
                }
            };
            let text = match std::str::from_utf8(&buf[..n]) {
                Ok(t) => t,
                Err(_) => {
                    log::warn!("discarding non-UTF-8 pose datagram ({} bytes)", n);
                    continue;
                }
            };
            match parse_frame(text) {
                Some(frame) => {
                    if tx.send(frame).is_err() {
                        return;
                    }
                }
                None => log::warn!("discarding malformed pose datagram"),
            }
        }
    }
}

/// Parse one datagram's text into a frame.  Returns `None` if no line
/// yields a keypoint.
pub fn parse_frame(text: &str) -> Option<PoseFrame> {
    let mut keypoints = PartName::ALL.map(|p| Keypoint::new(p, 0.0, 0.0, 0.0));
    let mut seen = 0usize;

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            continue;
        }
        let part = match PartName::from_name(fields[0]) {
            Some(p) => p,
            None => continue,
        };
        let x: f32 = match fields[1].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let y: f32 = match fields[2].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        let score: f32 = match fields[3].parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        keypoints[part.index()] = Keypoint::new(part, x, y, score.clamp(0.0, 1.0));
        seen += 1;
    }

    if seen == 0 {
        return None;
    }
    // Overall pose confidence: mean keypoint score, unreported parts included.
    let score = keypoints.iter().map(|k| k.score).sum::<f32>() / PART_COUNT as f32;
    Some(PoseFrame::new(keypoints, score))
}

// ════════════════════════════════════════════════════════════════════════════
// Stdin control surface
// ════════════════════════════════════════════════════════════════════════════

/// Spawn the stdin reader: a bare Enter or `m` toggles mute, `q` quits.
/// End-of-input also quits.
pub fn spawn_stdin_controls() -> Receiver<ControlEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            match line.trim() {
                "" | "m" | "M" => {
                    if tx.send(ControlEvent::ToggleMute).is_err() {
                        return;
                    }
                }
                "q" | "Q" => {
                    let _ = tx.send(ControlEvent::Quit);
                    return;
                }
                other => {
                    println!("  ⚠  '{}' — Enter/m toggles sound, q quits.", other);
                }
            }
        }
        let _ = tx.send(ControlEvent::Quit);
    });
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
