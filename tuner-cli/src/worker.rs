//! # Analysis Worker
//!
//! Owns a [`SampleSource`] on a dedicated thread, runs every block through the
//! tuner core and publishes each [`TuningResult`] into a single-slot channel.
//!
//! ## Architecture
//! - **Worker thread**: reads a block, analyses it, publishes the result
//! - **Results**: [`LatestSender`], so a slow reader only sees the newest result
//! - **Shutdown**: a crossbeam channel; the thread also ends when the source
//!   runs dry or the reader goes away

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use banjo_tuner_core::catalogue::Tuning;
use banjo_tuner_core::{
    Classifier, PitchEstimator, TunerConfig, TuningResult, analyze_block,
};
use crossbeam_channel::{RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::latest::LatestSender;
use crate::source::SampleSource;

/// What each block is compared against.
#[derive(Debug, Clone)]
pub enum Target {
    /// A single string, by frequency in Hz.
    Fixed(f32),
    /// Whichever string of the tuning is closest to the detected pitch.
    Nearest(Tuning),
}

/// Per-block analysis shared by the worker thread.
struct Analyzer {
    estimator: PitchEstimator,
    classifier: Classifier,
    target: Target,
}

impl Analyzer {
    fn analyze(&self, block: &[f32]) -> TuningResult {
        match &self.target {
            Target::Fixed(target_hz) => {
                analyze_block(block, *target_hz, &self.estimator, &self.classifier)
            }
            Target::Nearest(tuning) => {
                let nearest = self
                    .estimator
                    .estimate(block)
                    .and_then(|hz| tuning.nearest_note(hz).map(|note| (hz, note)));
                match nearest {
                    Some((detected_hz, note)) => {
                        debug!("Nearest string is {} ({} Hz)", note.name, note.frequency);
                        TuningResult::from_detection(detected_hz, note.frequency, &self.classifier)
                    }
                    None => TuningResult::no_signal(0.0),
                }
            }
        }
    }
}

/// Handle to the running analysis thread.
#[derive(Debug)]
pub struct AnalysisWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<usize>>,
}

impl AnalysisWorker {
    /// Starts analysing `source` on a new thread.
    ///
    /// With `realtime` set, the worker waits one block duration between
    /// blocks, the way a live capture would deliver them.
    pub fn spawn(
        mut source: Box<dyn SampleSource>,
        config: &TunerConfig,
        target: Target,
        realtime: bool,
        results: LatestSender<TuningResult>,
    ) -> Result<Self> {
        let sample_rate = source.sample_rate();
        if sample_rate != config.sample_rate {
            warn!(
                "Source runs at {} Hz, configured for {} Hz; using the source rate",
                sample_rate, config.sample_rate
            );
        }

        let block_size = config.block_size;
        let analyzer = Analyzer {
            estimator: PitchEstimator {
                sample_rate,
                ..config.estimator()
            },
            classifier: config.classifier(),
            target,
        };
        let block_duration = Duration::from_secs_f64(block_size as f64 / sample_rate as f64);

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread_handle = thread::Builder::new()
            .name("analysis".into())
            .spawn(move || {
                info!("Analysis thread started ({} samples per block)", block_size);
                let mut blocks = 0;

                loop {
                    let shutdown = if realtime && blocks > 0 {
                        match shutdown_rx.recv_timeout(block_duration) {
                            Err(RecvTimeoutError::Timeout) => false,
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                        }
                    } else {
                        !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
                    };
                    if shutdown {
                        info!("Received shutdown signal");
                        break;
                    }

                    let Some(block) = source.next_block(block_size) else {
                        info!("Sample source exhausted");
                        break;
                    };

                    let result = analyzer.analyze(&block);
                    blocks += 1;
                    if !results.publish(result) {
                        warn!("Result reader dropped, stopping analysis");
                        break;
                    }
                }

                info!("Analysis thread finished after {} blocks", blocks);
                blocks
            })
            .context("failed to spawn analysis thread")?;

        Ok(Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Signals the worker to stop and waits for it. Returns the number of
    /// blocks it analysed.
    pub fn stop(mut self) -> Result<usize> {
        let _ = self.shutdown_tx.try_send(());
        self.join()
    }

    /// Waits for the worker to finish on its own.
    pub fn join(&mut self) -> Result<usize> {
        match self.thread_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow::anyhow!("analysis thread panicked")),
            None => Ok(0),
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            let _ = self.shutdown_tx.try_send(());
            let _ = self.join();
        }
    }
}
