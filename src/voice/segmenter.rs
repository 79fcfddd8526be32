//! Utterance segmentation
//!
//! Finds the start and end of a spoken phrase in a live sample stream using
//! RMS energy. The threshold is calibrated against ambient noise first.

use std::time::Duration;

use super::SAMPLE_RATE;

/// Lowest energy ever treated as speech
const ENERGY_FLOOR: f32 = 0.03;

/// Speech must be this much louder than the ambient level
const AMBIENT_FACTOR: f32 = 1.5;

/// Ambient calibration window (0.5 seconds at 16kHz)
const CALIBRATION_SAMPLES: usize = 8000;

/// Minimum duration of speech to count as a phrase (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Pause that ends a phrase (1 second)
const PAUSE_SAMPLES: usize = 16000;

/// State of the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Measuring ambient noise
    Calibrating,
    /// Waiting for speech to start
    Waiting,
    /// Inside a phrase
    Speaking,
    /// Phrase ended by a pause or the phrase limit
    Complete,
}

/// Splits a sample stream into a single utterance
pub struct SpeechSegmenter {
    state: SegmenterState,
    threshold: f32,
    calibration_energy: f32,
    calibration_len: usize,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    phrase_limit: usize,
}

impl SpeechSegmenter {
    /// Create a segmenter that calibrates before listening
    #[must_use]
    pub fn new(phrase_limit: Duration) -> Self {
        Self {
            state: SegmenterState::Calibrating,
            threshold: ENERGY_FLOOR,
            calibration_energy: 0.0,
            calibration_len: 0,
            speech_buffer: Vec::new(),
            silence_counter: 0,
            phrase_limit: duration_to_samples(phrase_limit),
        }
    }

    /// Create a segmenter that skips calibration and uses the energy floor
    #[must_use]
    pub fn uncalibrated(phrase_limit: Duration) -> Self {
        Self {
            state: SegmenterState::Waiting,
            ..Self::new(phrase_limit)
        }
    }

    /// Feed samples and return the resulting state
    pub fn process(&mut self, samples: &[f32]) -> SegmenterState {
        let energy = calculate_energy(samples);

        match self.state {
            SegmenterState::Calibrating => {
                self.calibrate(samples);
            }
            SegmenterState::Waiting => {
                if energy > self.threshold {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, threshold = self.threshold, "speech started");
                }
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if energy > self.threshold {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.speech_buffer.len() >= self.phrase_limit {
                    tracing::debug!(samples = self.speech_buffer.len(), "phrase limit reached");
                    self.state = SegmenterState::Complete;
                } else if self.silence_counter > PAUSE_SAMPLES {
                    if self.speech_buffer.len().saturating_sub(self.silence_counter) > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.speech_buffer.len(), "phrase complete");
                        self.state = SegmenterState::Complete;
                    } else {
                        // Too short to be a phrase
                        tracing::trace!("noise burst discarded");
                        self.speech_buffer.clear();
                        self.silence_counter = 0;
                        self.state = SegmenterState::Waiting;
                    }
                }
            }
            SegmenterState::Complete => {}
        }

        self.state
    }

    fn calibrate(&mut self, samples: &[f32]) {
        self.calibration_energy += samples.iter().map(|s| s * s).sum::<f32>();
        self.calibration_len += samples.len();

        if self.calibration_len >= CALIBRATION_SAMPLES {
            #[allow(clippy::cast_precision_loss)]
            let ambient = (self.calibration_energy / self.calibration_len as f32).sqrt();
            self.threshold = (ambient * AMBIENT_FACTOR).max(ENERGY_FLOOR);
            self.state = SegmenterState::Waiting;
            tracing::debug!(ambient, threshold = self.threshold, "ambient noise calibrated");
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Energy above which samples count as speech
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Take the speech buffer, clearing it
    pub fn take_speech_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.speech_buffer)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn duration_to_samples(duration: Duration) -> usize {
    (duration.as_secs_f32() * SAMPLE_RATE as f32) as usize
}

/// Calculate RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
