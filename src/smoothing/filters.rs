//! The three filters the smoother is built from. Each owns a fixed amount of
//! state allocated at construction.

/// Running median over the last `length` raw frequencies.
///
/// Unvoiced cycles are stored as gaps. The median is taken over the voiced
/// entries only and is reported only when the newest entry is voiced, so a
/// single frame an octave off is outvoted by its neighbours while note ends are
/// not smeared into the following silence.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    history: Vec<Option<f32>>,
    scratch: Vec<f32>,
    head: usize,
    gap_run: usize,
}

impl MedianFilter {
    pub fn new(length: usize) -> Self {
        assert!(length > 0, "median length must be at least one");
        MedianFilter {
            history: vec![None; length],
            scratch: Vec::with_capacity(length),
            head: 0,
            gap_run: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.history.len()
    }

    /// Number of consecutive gaps pushed most recently.
    pub fn gap_run(&self) -> usize {
        self.gap_run
    }

    pub fn push(&mut self, value: Option<f32>) -> Option<f32> {
        self.history[self.head] = value;
        self.head = (self.head + 1) % self.history.len();

        if value.is_none() {
            self.gap_run = self.gap_run.saturating_add(1);
            return None;
        }
        self.gap_run = 0;

        self.scratch.clear();
        self.scratch.extend(self.history.iter().flatten());
        self.scratch.sort_unstable_by(|a, b| a.total_cmp(b));
        // Lower median for an even count: averaging two candidates an octave
        // apart would produce a pitch that was never sung.
        Some(self.scratch[(self.scratch.len() - 1) / 2])
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|v| *v = None);
        self.head = 0;
        self.gap_run = 0;
    }
}

/// One dimensional Kalman filter with a constant position model.
///
/// Used on fractional MIDI pitch, where `process_noise` and `measurement_noise`
/// are variances in semitones squared. A measurement further than `jump` from
/// the estimate re-seeds the filter instead of being blended in.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    process_noise: f32,
    measurement_noise: f32,
    jump: f32,
    estimate: f32,
    variance: f32,
    seeded: bool,
}

impl KalmanFilter {
    pub fn new(process_noise: f32, measurement_noise: f32, jump: f32) -> Self {
        KalmanFilter {
            process_noise,
            measurement_noise,
            jump,
            estimate: 0.0,
            variance: measurement_noise,
            seeded: false,
        }
    }

    pub fn update(&mut self, measurement: f32) -> f32 {
        if !self.seeded || (measurement - self.estimate).abs() > self.jump {
            self.estimate = measurement;
            self.variance = self.measurement_noise;
            self.seeded = true;
            return self.estimate;
        }

        // predict
        self.variance += self.process_noise;
        // correct
        let gain = self.variance / (self.variance + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.variance *= 1.0 - gain;
        self.estimate
    }

    pub fn estimate(&self) -> Option<f32> {
        if self.seeded {
            Some(self.estimate)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.seeded = false;
        self.estimate = 0.0;
        self.variance = self.measurement_noise;
    }
}

/// Exponential moving average, `y += alpha * (x - y)`. The first sample seeds it.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f32,
    value: Option<f32>,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Ema { alpha, value: None }
    }

    pub fn update(&mut self, x: f32) -> f32 {
        let y = match self.value {
            Some(y) => y + self.alpha * (x - y),
            None => x,
        };
        self.value = Some(y);
        y
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
