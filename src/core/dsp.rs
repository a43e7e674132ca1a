use std::sync::Arc;

use ndarray::{Array3, ArrayView3};
use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};

use crate::error::{Result, SeparatorError};
use crate::types::Spectrogram;

/// Periodic Hann window of `win_length`, centered and zero-padded to `n_fft`.
pub fn hann_window(n_fft: usize, win_length: usize) -> Vec<f32> {
    let win_length = win_length.min(n_fft);
    let mut window = vec![0.0f32; n_fft];
    if win_length <= 1 {
        window[n_fft / 2] = 1.0;
        return window;
    }
    let offset = (n_fft - win_length) / 2;
    let denom = win_length as f32;
    for i in 0..win_length {
        window[offset + i] = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * (i as f32) / denom).cos();
    }
    window
}

/// Split interleaved samples into one buffer per channel.
pub fn to_planar(interleaved: &[f32], channels: u16) -> Vec<Vec<f32>> {
    let c = channels.max(1) as usize;
    let frames = interleaved.len() / c;
    let mut out = vec![Vec::with_capacity(frames); c];
    for frame in interleaved.chunks_exact(c) {
        for (ch, &s) in frame.iter().enumerate() {
            out[ch].push(s);
        }
    }
    out
}

pub fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for ch in planar {
            out.push(ch[i]);
        }
    }
    out
}

/// Convert a planar signal to `target` channels.
///
/// Mono is duplicated to every output channel; anything else going to mono is
/// averaged. Other layouts keep the first `target` channels, repeating the last
/// one if the source has fewer.
pub fn match_channels(planar: Vec<Vec<f32>>, target: usize) -> Vec<Vec<f32>> {
    let have = planar.len();
    if have == target || have == 0 {
        return planar;
    }
    if target == 1 {
        let frames = planar[0].len();
        let scale = 1.0 / have as f32;
        let mono = (0..frames)
            .map(|i| planar.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect();
        return vec![mono];
    }
    (0..target)
        .map(|ch| planar[ch.min(have - 1)].clone())
        .collect()
}

/// Centered STFT with a fixed FFT plan and window.
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize, win_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft, win_length),
            fft_forward: planner.plan_fft_forward(n_fft),
            fft_inverse: planner.plan_fft_inverse(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn freq_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frame count for a signal of `samples` length, with `n_fft / 2` padding on both ends.
    pub fn frames_for(&self, samples: usize) -> usize {
        1 + samples / self.hop
    }

    /// Magnitude and phase of every channel, shaped `(channel, frequency, time)`.
    pub fn forward(&self, planar: &[Vec<f32>]) -> Spectrogram {
        let channels = planar.len();
        let samples = planar.iter().map(Vec::len).min().unwrap_or(0);
        let frames = self.frames_for(samples);
        let bins = self.freq_bins();
        let pad = self.n_fft / 2;

        let mut magnitude = Array3::<f32>::zeros((channels, bins, frames));
        let mut phase = Array3::<f32>::zeros((channels, bins, frames));

        // one extra tail sample when `n_fft` is odd
        let mut padded = vec![0.0f32; samples + self.n_fft];
        let mut buf = vec![Complex32::zero(); self.n_fft];

        for (ch, signal) in planar.iter().enumerate() {
            padded.fill(0.0);
            padded[pad..pad + samples].copy_from_slice(&signal[..samples]);

            for fr in 0..frames {
                let start = fr * self.hop;
                let frame = &padded[start..start + self.n_fft];
                for (i, (x, w)) in frame.iter().zip(&self.window).enumerate() {
                    buf[i] = Complex32::new(x * w, 0.0);
                }

                self.fft_forward.process(&mut buf);

                for (k, c) in buf.iter().take(bins).enumerate() {
                    magnitude[[ch, k, fr]] = c.norm();
                    phase[[ch, k, fr]] = c.arg();
                }
            }
        }

        Spectrogram { magnitude, phase }
    }

    /// Inverse STFT by weighted overlap-add. Returns `frames * hop` samples per channel.
    pub fn inverse(
        &self,
        magnitude: ArrayView3<f32>,
        phase: ArrayView3<f32>,
    ) -> Result<Vec<Vec<f32>>> {
        if magnitude.shape() != phase.shape() {
            return Err(SeparatorError::Inference(format!(
                "magnitude {:?} and phase {:?} shapes differ",
                magnitude.shape(),
                phase.shape()
            )));
        }
        let (channels, bins, frames) = magnitude.dim();
        if bins != self.freq_bins() {
            return Err(SeparatorError::Inference(format!(
                "spectrogram has {bins} frequency bins, STFT expects {}",
                self.freq_bins()
            )));
        }

        let n_fft = self.n_fft;
        let pad = n_fft / 2;
        let target_length = frames * self.hop;
        let padded_length = target_length + 2 * pad;
        let scale = 1.0 / n_fft as f32;

        let mut window_sum = vec![0.0f32; padded_length];
        for fr in 0..frames {
            let start = fr * self.hop;
            for (i, w) in self.window.iter().enumerate() {
                window_sum[start + i] += w * w;
            }
        }

        let mut buf = vec![Complex32::zero(); n_fft];
        let mut out = Vec::with_capacity(channels);

        for ch in 0..channels {
            let mut acc = vec![0.0f32; padded_length];

            for fr in 0..frames {
                buf.fill(Complex32::zero());
                for k in 0..bins {
                    buf[k] = Complex32::from_polar(magnitude[[ch, k, fr]], phase[[ch, k, fr]]);
                }
                // Hermitian mirror so the inverse is real.
                for k in 1..(n_fft + 1) / 2 {
                    buf[n_fft - k] = buf[k].conj();
                }
                buf[0].im = 0.0;
                if n_fft % 2 == 0 {
                    buf[n_fft / 2].im = 0.0;
                }

                self.fft_inverse.process(&mut buf);

                let start = fr * self.hop;
                for (i, w) in self.window.iter().enumerate() {
                    acc[start + i] += buf[i].re * w * scale;
                }
            }

            for (s, sum) in acc.iter_mut().zip(&window_sum) {
                if *sum > 1e-10 {
                    *s /= sum;
                }
            }

            out.push(acc[pad..pad + target_length].to_vec());
        }

        Ok(out)
    }
}
