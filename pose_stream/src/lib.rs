//! # pose_stream
//!
//! Data model for 2D human-pose detections: body-part names, keypoints with
//! confidence scores, whole-body frames with a derived bone skeleton, and a
//! latest-frame buffer.
//!
//! A pose detector (an external process, or a simulator) produces one
//! [`PoseFrame`] per detection.  Frames are replaced wholesale — the
//! [`FrameBuffer`] keeps only the newest — and every downstream decision is
//! gated on per-keypoint confidence.
//!
//! ## Quick start
//!
//! ```rust
//! use pose_stream::{FrameBuffer, PartName, PoseFrame};
//!
//! let mut buf = FrameBuffer::new();
//! assert!(buf.latest().is_none());
//!
//! buf.set_frame(PoseFrame::at_rest(640.0, 480.0));
//! let wrist = buf.latest().unwrap().get(PartName::RightWrist);
//! assert!(wrist.is_trusted(0.2));
//! ```

// ════════════════════════════════════════════════════════════════════════════
// PartName — the 17 tracked body parts
// ════════════════════════════════════════════════════════════════════════════

/// Number of body parts in one detection.
pub const PART_COUNT: usize = 17;

/// The body parts reported by the pose detector, in its fixed schema order
/// (nose = 0 … right ankle = 16).
///
/// Use [`PartName::as_str`] for the detector's camelCase wire name and
/// [`PartName::from_name`] to parse it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PartName {
    Nose          = 0,
    LeftEye       = 1,
    RightEye      = 2,
    LeftEar       = 3,
    RightEar      = 4,
    LeftShoulder  = 5,
    RightShoulder = 6,
    LeftElbow     = 7,
    RightElbow    = 8,
    LeftWrist     = 9,
    RightWrist    = 10,
    LeftHip       = 11,
    RightHip      = 12,
    LeftKnee      = 13,
    RightKnee     = 14,
    LeftAnkle     = 15,
    RightAnkle    = 16,
}

impl PartName {
    /// All parts in schema order.
    pub const ALL: [PartName; PART_COUNT] = [
        PartName::Nose,
        PartName::LeftEye,
        PartName::RightEye,
        PartName::LeftEar,
        PartName::RightEar,
        PartName::LeftShoulder,
        PartName::RightShoulder,
        PartName::LeftElbow,
        PartName::RightElbow,
        PartName::LeftWrist,
        PartName::RightWrist,
        PartName::LeftHip,
        PartName::RightHip,
        PartName::LeftKnee,
        PartName::RightKnee,
        PartName::LeftAnkle,
        PartName::RightAnkle,
    ];

    /// Position of this part in the schema order (0–16).
    pub fn index(self) -> usize { self as usize }

    /// Part at schema position `i`, or `None` past the end.
    pub fn from_index(i: usize) -> Option<PartName> {
        PartName::ALL.get(i).copied()
    }

    /// The detector's camelCase name for this part.
    pub fn as_str(self) -> &'static str {
        match self {
            PartName::Nose          => "nose",
            PartName::LeftEye       => "leftEye",
            PartName::RightEye      => "rightEye",
            PartName::LeftEar       => "leftEar",
            PartName::RightEar      => "rightEar",
            PartName::LeftShoulder  => "leftShoulder",
            PartName::RightShoulder => "rightShoulder",
            PartName::LeftElbow     => "leftElbow",
            PartName::RightElbow    => "rightElbow",
            PartName::LeftWrist     => "leftWrist",
            PartName::RightWrist    => "rightWrist",
            PartName::LeftHip       => "leftHip",
            PartName::RightHip      => "rightHip",
            PartName::LeftKnee      => "leftKnee",
            PartName::RightKnee     => "rightKnee",
            PartName::LeftAnkle     => "leftAnkle",
            PartName::RightAnkle    => "rightAnkle",
        }
    }

    /// Parse a camelCase part name.
    pub fn from_name(name: &str) -> Option<PartName> {
        PartName::ALL.iter().copied().find(|p| p.as_str() == name)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Keypoint — one detected body-part location
// ════════════════════════════════════════════════════════════════════════════

/// Confidence threshold used when a caller has no reason to pick another.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.2;

/// One detected body-part location in frame pixel space (origin top-left,
/// y grows downward), with the detector's confidence score in `[0, 1]`.
///
/// Immutable once produced by the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub part:  PartName,
    pub x:     f32,
    pub y:     f32,
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: PartName, x: f32, y: f32, score: f32) -> Self {
        Keypoint { part, x, y, score }
    }

    /// Confidence gate: is this detection trustworthy enough to act on?
    ///
    /// Strictly greater-than — a score exactly at the threshold does not
    /// pass.  Lower thresholds react to noisier detections; higher
    /// thresholds react only to confident ones.
    pub fn is_trusted(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Skeleton — adjacent-part bone connections
// ════════════════════════════════════════════════════════════════════════════

/// The bone connections the detector reports between adjacent parts.
/// A bone is only considered *detected* when both endpoints pass the
/// confidence gate — see [`PoseFrame::bones`].
pub const SKELETON_EDGES: [(PartName, PartName); 12] = [
    (PartName::LeftShoulder,  PartName::RightShoulder),
    (PartName::LeftShoulder,  PartName::LeftElbow),
    (PartName::LeftElbow,     PartName::LeftWrist),
    (PartName::RightShoulder, PartName::RightElbow),
    (PartName::RightElbow,    PartName::RightWrist),
    (PartName::LeftShoulder,  PartName::LeftHip),
    (PartName::RightShoulder, PartName::RightHip),
    (PartName::LeftHip,       PartName::RightHip),
    (PartName::LeftHip,       PartName::LeftKnee),
    (PartName::LeftKnee,      PartName::LeftAnkle),
    (PartName::RightHip,      PartName::RightKnee),
    (PartName::RightKnee,     PartName::RightAnkle),
];

// ════════════════════════════════════════════════════════════════════════════
// PoseFrame — one full detection result
// ════════════════════════════════════════════════════════════════════════════

/// One full detection result: all [`PART_COUNT`] keypoints in schema order,
/// plus the detector's overall confidence for the pose.
///
/// A frame is replaced wholesale on each new detection — no partial updates,
/// no history.
#[derive(Clone, Debug)]
pub struct PoseFrame {
    pub keypoints: [Keypoint; PART_COUNT],
    /// Overall pose confidence in `[0, 1]`.
    pub score:     f32,
}

impl PoseFrame {
    /// Build a frame from keypoints already in schema order.
    pub fn new(keypoints: [Keypoint; PART_COUNT], score: f32) -> Self {
        assert!(
            keypoints.iter().zip(PartName::ALL).all(|(k, p)| k.part == p),
            "keypoints must be in schema order"
        );
        PoseFrame { keypoints, score }
    }

    /// A neutral standing figure filling a `width` × `height` frame, every
    /// keypoint at score 0.9.  Useful as a simulation baseline.
    pub fn at_rest(width: f32, height: f32) -> Self {
        let keypoints = PartName::ALL.map(|part| {
            let (fx, fy) = rest_position(part);
            Keypoint::new(part, fx * width, fy * height, 0.9)
        });
        PoseFrame { keypoints, score: 0.9 }
    }

    /// Keypoint for `part`.  Parts are resolved by name, never by a caller-
    /// supplied numeric position.
    pub fn get(&self, part: PartName) -> &Keypoint {
        &self.keypoints[part.index()]
    }

    /// Keypoints that pass the confidence gate at `threshold`.
    pub fn trusted_keypoints(&self, threshold: f32) -> impl Iterator<Item = &Keypoint> + '_ {
        self.keypoints.iter().filter(move |k| k.is_trusted(threshold))
    }

    /// The detected skeleton: every edge of [`SKELETON_EDGES`] whose *both*
    /// endpoints pass the confidence gate at `threshold`.
    pub fn bones(&self, threshold: f32) -> Vec<(&Keypoint, &Keypoint)> {
        SKELETON_EDGES.iter()
            .map(|&(a, b)| (self.get(a), self.get(b)))
            .filter(|(a, b)| a.is_trusted(threshold) && b.is_trusted(threshold))
            .collect()
    }
}

/// Fractional (x, y) of each part for the at-rest figure.
fn rest_position(part: PartName) -> (f32, f32) {
    match part {
        PartName::Nose          => (0.50, 0.25),
        PartName::LeftEye       => (0.47, 0.23),
        PartName::RightEye      => (0.53, 0.23),
        PartName::LeftEar       => (0.44, 0.24),
        PartName::RightEar      => (0.56, 0.24),
        PartName::LeftShoulder  => (0.38, 0.38),
        PartName::RightShoulder => (0.62, 0.38),
        PartName::LeftElbow     => (0.34, 0.52),
        PartName::RightElbow    => (0.66, 0.52),
        PartName::LeftWrist     => (0.32, 0.64),
        PartName::RightWrist    => (0.68, 0.64),
        PartName::LeftHip       => (0.42, 0.62),
        PartName::RightHip      => (0.58, 0.62),
        PartName::LeftKnee      => (0.41, 0.78),
        PartName::RightKnee     => (0.59, 0.78),
        PartName::LeftAnkle     => (0.40, 0.93),
        PartName::RightAnkle    => (0.60, 0.93),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameBuffer — latest-frame store
// ════════════════════════════════════════════════════════════════════════════

/// Holds the most recent [`PoseFrame`].
///
/// `set_frame` replaces the stored frame unconditionally (last-writer-wins,
/// no merging); `latest` returns it, or `None` if no frame has ever arrived.
/// If the source drops frames, the buffer simply reflects whatever arrived
/// last — no staleness detection at this layer.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frame:    Option<PoseFrame>,
    arrivals: u64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer { frame: None, arrivals: 0 }
    }

    /// Replace the stored frame.  The previous frame is discarded.
    pub fn set_frame(&mut self, frame: PoseFrame) {
        self.frame = Some(frame);
        self.arrivals += 1;
    }

    /// The most recent frame, or `None` before the first arrival.
    pub fn latest(&self) -> Option<&PoseFrame> {
        self.frame.as_ref()
    }

    /// Total frames ever stored (monotonic; counts overwrites).
    pub fn frame_count(&self) -> u64 {
        self.arrivals
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
