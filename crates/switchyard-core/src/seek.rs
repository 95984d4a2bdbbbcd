//! Seek requests.

use serde::{Deserialize, Serialize};

/// Unit of seek positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeekFormat {
    /// Nanoseconds
    #[default]
    Time,
    Bytes,
    /// Video frames / audio samples
    Buffers,
    Percent,
}

/// How a seek boundary is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekType {
    /// Leave the boundary unchanged
    None,
    /// Absolute position
    Set,
    /// Relative to the end of the stream
    End,
}

/// Seek behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct SeekFlags {
    /// Drop queued data so the new position plays immediately
    pub flush: bool,
    /// Seek to the exact position rather than the nearest keyframe
    pub accurate: bool,
    /// Snap to the nearest keyframe
    pub key_unit: bool,
    /// Post a segment-done event instead of end-of-stream
    pub segment: bool,
}

impl SeekFlags {
    /// Only the flush flag set.
    #[must_use]
    pub fn flush() -> Self {
        Self { flush: true, ..Self::default() }
    }
}

/// Parameters of a seek on a graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekRequest {
    pub rate: f64,
    pub format: SeekFormat,
    pub flags: SeekFlags,
    pub start_type: SeekType,
    pub start: i64,
    pub stop_type: SeekType,
    pub stop: i64,
}

impl SeekRequest {
    /// Flushing seek to `position` at normal rate, leaving the stop boundary alone.
    #[must_use]
    pub fn flush_to(position: i64, format: SeekFormat) -> Self {
        Self {
            rate: 1.0,
            format,
            flags: SeekFlags::flush(),
            start_type: SeekType::Set,
            start: position,
            stop_type: SeekType::None,
            stop: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_to() {
        let seek = SeekRequest::flush_to(5_000_000_000, SeekFormat::Time);
        assert!((seek.rate - 1.0).abs() < f64::EPSILON);
        assert!(seek.flags.flush);
        assert!(!seek.flags.accurate);
        assert_eq!(seek.start_type, SeekType::Set);
        assert_eq!(seek.start, 5_000_000_000);
        assert_eq!(seek.stop_type, SeekType::None);
        assert_eq!(seek.stop, -1);
    }
}
