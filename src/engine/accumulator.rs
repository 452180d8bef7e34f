/// Assembles arbitrarily sized sample blocks into analysis windows that
/// overlap by half.
///
/// The window buffer is filled in place. When it is full it is handed to the
/// caller, then its second half is moved to the front and filling resumes at
/// the midpoint, so every sample is analyzed twice and a new window is ready
/// every `window_size / 2` samples.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    buffer: Vec<f32>,
    cursor: usize,
    consumed: u64,
}

impl FrameAccumulator {
    pub fn new(window_size: usize) -> Self {
        assert!(
            window_size >= 2 && window_size % 2 == 0,
            "window size must be even and at least 2"
        );
        FrameAccumulator {
            buffer: vec![0.0; window_size],
            cursor: 0,
            consumed: 0,
        }
    }

    pub fn window_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn hop_size(&self) -> usize {
        self.buffer.len() / 2
    }

    /// Samples waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.cursor
    }

    /// Samples pushed since construction or the last [`reset`](Self::reset).
    pub fn samples_consumed(&self) -> u64 {
        self.consumed
    }

    /// Append `samples`. `on_ready` is called with every window completed on
    /// the way, in order, together with the stream index one past its last
    /// sample.
    ///
    /// NaN and infinite samples are stored as 0.0; every level and spectrum
    /// downstream is a running sum that one of them would poison.
    pub fn push<I, F>(&mut self, samples: I, mut on_ready: F)
    where
        I: IntoIterator<Item = f32>,
        F: FnMut(&[f32], u64),
    {
        let size = self.buffer.len();
        let half = size / 2;

        for sample in samples {
            self.buffer[self.cursor] = if sample.is_finite() { sample } else { 0.0 };
            self.cursor += 1;
            self.consumed += 1;

            if self.cursor == size {
                on_ready(&self.buffer, self.consumed);
                self.buffer.copy_within(half.., 0);
                self.cursor = half;
            }
        }
    }

    /// Switch to a new window size. Buffered samples are dropped; the stream
    /// position is kept.
    pub fn resize(&mut self, window_size: usize) {
        assert!(
            window_size >= 2 && window_size % 2 == 0,
            "window size must be even and at least 2"
        );
        self.buffer = vec![0.0; window_size];
        self.cursor = 0;
    }

    /// Drop buffered samples and restart the stream position at zero.
    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.cursor = 0;
        self.consumed = 0;
    }
}
