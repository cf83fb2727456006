//! In-memory sample store feeding the waveform rendering
//!
//! The buffer grows for the duration of a session (bounded by the session
//! duration cap) and is cleared on "new recording". Min and max are
//! maintained incrementally on push so rendering does not rescan the whole
//! buffer per frame; the resulting mapping is identical to a full scan.

/// Unbounded, append-only sequence of samples with running min/max
#[derive(Debug, Clone, Default)]
pub struct SignalBuffer {
    samples: Vec<u16>,
    min: Option<u16>,
    max: Option<u16>,
}

impl SignalBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one sample in arrival order
    pub fn push(&mut self, value: u16) {
        self.samples.push(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Drop all samples; the only way to bound memory between sessions
    pub fn clear(&mut self) {
        self.samples.clear();
        self.min = None;
        self.max = None;
    }

    /// Samples in arrival order
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Owned copy of the samples in arrival order
    pub fn snapshot(&self) -> Vec<u16> {
        self.samples.clone()
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Smallest sample seen, 0 for an empty buffer
    pub fn min(&self) -> u16 {
        self.min.unwrap_or(0)
    }

    /// Largest sample seen, 1 for an empty buffer
    pub fn max(&self) -> u16 {
        self.max.unwrap_or(1)
    }

    /// Map a sample value to a y-coordinate within `height` pixels
    ///
    /// Normalizes over the buffer-wide min/max, leaving a 5 px margin at the
    /// top and bottom: `(1 - (v - min)/range) * (height - 10) + 5`.
    pub fn map_to_y(&self, value: u16, height: f32) -> f32 {
        let min = self.min() as f32;
        let range = (self.max() as f32 - min).max(1.0);
        let norm = (value as f32 - min) / range;
        (1.0 - norm) * (height - 10.0) + 5.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut buffer = SignalBuffer::new();
        for v in [10, 20, 30] {
            buffer.push(v);
        }
        assert_eq!(buffer.snapshot(), vec![10, 20, 30]);
        assert_eq!(buffer.samples(), &[10, 20, 30]);
    }

    #[test]
    fn test_running_min_max() {
        let mut buffer = SignalBuffer::new();
        buffer.push(500);
        buffer.push(100);
        buffer.push(900);
        assert_eq!(buffer.min(), 100);
        assert_eq!(buffer.max(), 900);

        // Matches a full scan over the buffer
        assert_eq!(buffer.min(), *buffer.samples().iter().min().unwrap());
        assert_eq!(buffer.max(), *buffer.samples().iter().max().unwrap());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut buffer = SignalBuffer::new();
        buffer.push(42);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.min(), 0);
        assert_eq!(buffer.max(), 1);
    }

    #[test]
    fn test_y_mapping_extremes() {
        let mut buffer = SignalBuffer::new();
        buffer.push(0);
        buffer.push(1023);

        // Max maps to the top margin, min to the bottom margin
        assert_eq!(buffer.map_to_y(1023, 300.0), 5.0);
        assert_eq!(buffer.map_to_y(0, 300.0), 295.0);
    }

    #[test]
    fn test_y_mapping_constant_signal() {
        let mut buffer = SignalBuffer::new();
        buffer.push(512);
        buffer.push(512);

        // Degenerate range clamps to 1 instead of dividing by zero
        let y = buffer.map_to_y(512, 300.0);
        assert!(y.is_finite());
        assert_eq!(y, 295.0);
    }
}
