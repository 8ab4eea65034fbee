//! Frame-level acoustic features: YIN fundamental frequency and RMS energy.

use crate::configs::PitchConfig;

/// Frames quieter than this are treated as unvoiced.
const SILENCE_RMS: f32 = 1e-3;

/// Fundamental frequency of every voiced frame, in Hz. Unvoiced frames are dropped.
pub fn pitch_contour(samples: &[f32], sample_rate: u32, config: &PitchConfig) -> Vec<f32> {
    let frame = config.frame_length.max(2);
    let hop = config.hop_length.max(1);
    if samples.len() < frame {
        return Vec::new();
    }

    // also rejects NaN bounds
    if !(config.fmin > 0.0 && config.fmax > config.fmin) {
        return Vec::new();
    }

    let sr = sample_rate as f32;
    let tau_min = ((sr / config.fmax).floor() as usize).max(2);
    let tau_max = (sr / config.fmin).ceil() as usize;
    if tau_max.saturating_add(2) > frame || tau_min >= tau_max {
        return Vec::new();
    }

    let mut diff = vec![0.0f32; tau_max + 1];
    let mut contour = Vec::new();

    let mut start = 0;
    while start + frame <= samples.len() {
        let window = &samples[start..start + frame];
        if let Some(f0) = yin(window, sr, tau_min, tau_max, config.threshold, &mut diff) {
            if (config.fmin..=config.fmax).contains(&f0) {
                contour.push(f0);
            }
        }
        start += hop;
    }

    contour
}

fn yin(
    window: &[f32],
    sr: f32,
    tau_min: usize,
    tau_max: usize,
    threshold: f32,
    diff: &mut [f32],
) -> Option<f32> {
    if frame_rms(window) < SILENCE_RMS {
        return None;
    }

    // Difference function over a fixed integration window.
    let w = window.len() - tau_max;
    diff[0] = 0.0;
    for tau in 1..=tau_max {
        let mut sum = 0.0f32;
        for j in 0..w {
            let d = window[j] - window[j + tau];
            sum += d * d;
        }
        diff[tau] = sum;
    }

    // Cumulative mean normalized difference, in place.
    let mut running = 0.0f32;
    diff[0] = 1.0;
    for tau in 1..=tau_max {
        running += diff[tau];
        diff[tau] = if running > 0.0 {
            diff[tau] * tau as f32 / running
        } else {
            1.0
        };
    }

    let mut tau = tau_min;
    let mut found = None;
    while tau < tau_max {
        if diff[tau] < threshold {
            while tau + 1 < tau_max && diff[tau + 1] < diff[tau] {
                tau += 1;
            }
            found = Some(tau);
            break;
        }
        tau += 1;
    }
    let tau = found?;

    // Parabolic interpolation around the minimum.
    let refined = if tau > 0 && tau < tau_max {
        let (s0, s1, s2) = (diff[tau - 1], diff[tau], diff[tau + 1]);
        let denom = s0 + s2 - 2.0 * s1;
        if denom.abs() > f32::EPSILON {
            tau as f32 + (s0 - s2) / (2.0 * denom)
        } else {
            tau as f32
        }
    } else {
        tau as f32
    };

    (refined > 0.0).then(|| sr / refined)
}

/// RMS energy per frame.
pub fn rms_envelope(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    let frame = frame_length.max(1);
    let hop = hop_length.max(1);
    if samples.len() < frame {
        return Vec::new();
    }

    (0..=(samples.len() - frame) / hop)
        .map(|i| frame_rms(&samples[i * hop..i * hop + frame]))
        .collect()
}

fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let energy: f32 = frame.iter().map(|s| s * s).sum();
    (energy / frame.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    fn sine(freq: f32, secs: f32, sr: u32) -> Vec<f32> {
        (0..(secs * sr as f32) as usize)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn test_yin_tracks_a_sine() {
        let config = PitchConfig::default();
        let contour = pitch_contour(&sine(220.0, 1.0, 22_050), 22_050, &config);

        assert!(contour.len() >= 10, "only {} voiced frames", contour.len());
        for f0 in &contour {
            assert!((f0 - 220.0).abs() < 3.0, "estimated {}", f0);
        }
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let config = PitchConfig::default();
        assert!(pitch_contour(&vec![0.0; 22_050], 22_050, &config).is_empty());
        assert!(pitch_contour(&[0.1; 100], 22_050, &config).is_empty());
    }

    #[test]
    fn test_degenerate_pitch_bounds_give_empty_contour() {
        let samples = sine(220.0, 1.0, 22_050);
        for (fmin, fmax) in [(0.0, 1_000.0), (-50.0, 1_000.0), (400.0, 200.0), (f32::NAN, 1_000.0)] {
            let config = PitchConfig {
                fmin,
                fmax,
                ..PitchConfig::default()
            };
            assert!(pitch_contour(&samples, 22_050, &config).is_empty());
        }
    }

    #[test]
    fn test_rms_envelope_frames() {
        let samples = vec![0.5f32; 4_096];
        let env = rms_envelope(&samples, 2_048, 512);
        assert_eq!(env.len(), 5);
        assert!(env.iter().all(|e| (e - 0.5).abs() < 1e-6));

        assert!(rms_envelope(&samples[..100], 2_048, 512).is_empty());
    }
}
