//! Running an [`Analyzer`] on its own thread.
//!
//! The audio callback writes samples into a lock-free SPSC ring buffer through
//! a [`SampleSender`]; the analysis thread drains it, runs the analyzer and
//! publishes every frame into a second ring read by a [`FrameReceiver`]. The
//! two sides share no mutable state. When the frame ring is full, new frames
//! are dropped and counted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use crate::engine::{Analyzer, PitchFrame};

/// Samples drained from the ring per analyzer call.
const DRAIN_SIZE: usize = 1024;

/// Sleep when the sample ring is empty.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Minimum number of frames the frame ring can hold.
const MIN_FRAME_CAPACITY: usize = 16;

/// Writing end of the sample ring, for the audio callback.
pub struct SampleSender {
    producer: HeapProd<f32>,
}

impl SampleSender {
    /// Queue as many samples as fit and return how many were accepted. Never
    /// blocks.
    pub fn send(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Samples queued but not yet analyzed.
    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }
}

/// Reading end of the frame ring.
pub struct FrameReceiver {
    consumer: HeapCons<PitchFrame>,
}

impl FrameReceiver {
    pub fn try_recv(&mut self) -> Option<PitchFrame> {
        self.consumer.try_pop()
    }

    /// Discard everything but the most recent frame.
    pub fn latest(&mut self) -> Option<PitchFrame> {
        let mut latest = None;
        while let Some(frame) = self.consumer.try_pop() {
            latest = Some(frame);
        }
        latest
    }
}

/// Handle to the analysis thread.
pub struct LiveAnalyzer {
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread: Option<JoinHandle<Analyzer>>,
}

impl LiveAnalyzer {
    /// Start `analyzer` on a new thread with room for `sample_capacity`
    /// queued samples. The frame ring holds as many frames as that many
    /// samples produce.
    pub fn spawn(
        analyzer: Analyzer,
        sample_capacity: usize,
    ) -> std::io::Result<(LiveAnalyzer, SampleSender, FrameReceiver)> {
        let frame_capacity = sample_capacity
            .div_ceil(analyzer.hop_size())
            .max(MIN_FRAME_CAPACITY);
        Self::spawn_with_capacity(analyzer, sample_capacity, frame_capacity)
    }

    pub fn spawn_with_capacity(
        analyzer: Analyzer,
        sample_capacity: usize,
        frame_capacity: usize,
    ) -> std::io::Result<(LiveAnalyzer, SampleSender, FrameReceiver)> {
        let (sample_producer, sample_consumer) = HeapRb::<f32>::new(sample_capacity).split();
        let (frame_producer, frame_consumer) = HeapRb::<PitchFrame>::new(frame_capacity).split();

        let running = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));

        let thread = {
            let running = running.clone();
            let dropped = dropped.clone();
            thread::Builder::new()
                .name("pitch-analysis".to_string())
                .spawn(move || {
                    run_analysis_thread(analyzer, sample_consumer, frame_producer, running, dropped)
                })?
        };
        debug!(
            "analysis thread started ({} samples, {} frames)",
            sample_capacity, frame_capacity
        );

        Ok((
            LiveAnalyzer {
                running,
                dropped,
                thread: Some(thread),
            },
            SampleSender {
                producer: sample_producer,
            },
            FrameReceiver {
                consumer: frame_consumer,
            },
        ))
    }

    /// Frames lost because the frame ring was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the thread and hand the analyzer back. `None` if the thread
    /// panicked.
    pub fn stop(mut self) -> Option<Analyzer> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<Analyzer> {
        self.running.store(false, Ordering::Release);
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(analyzer) => Some(analyzer),
            Err(_) => {
                warn!("analysis thread panicked");
                None
            }
        }
    }
}

impl Drop for LiveAnalyzer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_analysis_thread(
    mut analyzer: Analyzer,
    mut samples: HeapCons<f32>,
    mut frames: HeapProd<PitchFrame>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) -> Analyzer {
    let mut drain = [0.0f32; DRAIN_SIZE];

    while running.load(Ordering::Acquire) {
        let read = samples.pop_slice(&mut drain);
        if read == 0 {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        analyzer.process(&drain[..read], |frame| {
            if frames.try_push(frame).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    debug!("analysis thread stopped");
    analyzer
}
