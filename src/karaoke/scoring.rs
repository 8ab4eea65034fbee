use serde::Serialize;

use crate::common::errors::{Analysis, AnalysisError};

/// Every sub-score starts here and only successful analysis raises it.
pub const BASELINE: f64 = 50.0;

/// Frames a pitch contour needs before its statistics mean anything.
pub const MIN_PITCH_FRAMES: usize = 10;

/// Energy envelopes need strictly more than this many common frames.
pub const MIN_ENERGY_FRAMES: usize = 10;

pub const RECOGNITION_FAILED: &str = "recognition failed (baseline applied)";

/// Sub-score weights in percent: stability, pitch match, energy match, pronunciation, length.
pub const WEIGHTS_PERCENT: [u32; 5] = [25, 25, 20, 15, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    #[serde(rename = "S")]
    S,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
}

impl Grade {
    pub fn from_total(total: f64) -> Self {
        match total {
            t if t >= 90.0 => Self::S,
            t if t >= 85.0 => Self::APlus,
            t if t >= 80.0 => Self::A,
            t if t >= 75.0 => Self::BPlus,
            t if t >= 70.0 => Self::B,
            t if t >= 65.0 => Self::CPlus,
            t if t >= 60.0 => Self::C,
            t if t >= 55.0 => Self::DPlus,
            _ => Self::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::DPlus => "D+",
            Self::D => "D",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub pitch_stability: f64,
    pub pitch_match: f64,
    pub energy_match: f64,
    pub pronunciation: f64,
    pub length: f64,
}

impl Default for SubScores {
    fn default() -> Self {
        Self {
            pitch_stability: BASELINE,
            pitch_match: BASELINE,
            energy_match: BASELINE,
            pronunciation: BASELINE,
            length: BASELINE,
        }
    }
}

impl SubScores {
    fn as_array(&self) -> [f64; 5] {
        [
            self.pitch_stability,
            self.pitch_match,
            self.energy_match,
            self.pronunciation,
            self.length,
        ]
    }

    /// Weighted total, rounded to one decimal.
    pub fn total(&self) -> f64 {
        let weighted: f64 = self
            .as_array()
            .iter()
            .zip(WEIGHTS_PERCENT)
            .map(|(score, weight)| score * f64::from(weight))
            .sum();
        round1(weighted / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub pitch_stability: f64,
    pub pitch_match: f64,
    pub energy_match: f64,
    pub pronunciation: f64,
    pub length: f64,
    pub total_score: f64,
    pub grade: Grade,
    pub recognized_text: String,
}

impl ScoreResult {
    pub fn new(scores: SubScores, recognized_text: Option<String>) -> Self {
        let total_score = scores.total();
        Self {
            pitch_stability: round1(scores.pitch_stability),
            pitch_match: round1(scores.pitch_match),
            energy_match: round1(scores.energy_match),
            pronunciation: round1(scores.pronunciation),
            length: round1(scores.length),
            total_score,
            grade: Grade::from_total(total_score),
            recognized_text: recognized_text
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| RECOGNITION_FAILED.to_string()),
        }
    }

    pub fn recognition_failed(&self) -> bool {
        self.recognized_text == RECOGNITION_FAILED
    }
}

/// Pronunciation and length sub-scores from the number of recognized words.
pub fn speech_scores(word_count: usize) -> (f64, f64) {
    let words = word_count as f64;
    ((BASELINE + words * 5.0).min(100.0), (BASELINE + words * 3.0).min(100.0))
}

/// Low relative spread of the singer's pitch scores high.
pub fn pitch_stability(contour: &[f32]) -> Analysis<f64> {
    if contour.len() < MIN_PITCH_FRAMES {
        return Err(AnalysisError::Insufficient {
            got: contour.len(),
            needed: MIN_PITCH_FRAMES,
        });
    }

    let (mean, std) = mean_std(contour);
    if mean <= 0.0 {
        return Err(AnalysisError::Failed("non-positive mean pitch".into()));
    }

    Ok((100.0 - (std / mean) * 100.0).clamp(BASELINE, 100.0))
}

/// Closeness of mean pitch. A 100 Hz difference reaches the baseline.
pub fn pitch_match(original: &[f32], user: &[f32]) -> Analysis<f64> {
    let shortest = original.len().min(user.len());
    if shortest < MIN_PITCH_FRAMES {
        return Err(AnalysisError::Insufficient {
            got: shortest,
            needed: MIN_PITCH_FRAMES,
        });
    }

    let (mean_original, _) = mean_std(original);
    let (mean_user, _) = mean_std(user);
    let diff = (mean_original - mean_user).abs();

    Ok((100.0 - diff / 2.0).clamp(BASELINE, 100.0))
}

/// Correlation of loudness over time, truncated to the common length.
pub fn energy_match(original: &[f32], user: &[f32]) -> Analysis<f64> {
    let frames = original.len().min(user.len());
    if frames <= MIN_ENERGY_FRAMES {
        return Err(AnalysisError::Insufficient {
            got: frames,
            needed: MIN_ENERGY_FRAMES + 1,
        });
    }

    let r = pearson(&original[..frames], &user[..frames])
        .ok_or_else(|| AnalysisError::Failed("energy correlation is undefined".into()))?;

    Ok((BASELINE + 50.0 * r).clamp(BASELINE, 100.0))
}

/// Pearson correlation. `None` when either side is constant.
pub fn pearson(a: &[f32], b: &[f32]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }

    let (mean_a, _) = mean_std(&a[..n]);
    let (mean_b, _) = mean_std(&b[..n]);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = f64::from(*x) - mean_a;
        let dy = f64::from(*y) - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    let r = cov / denom;
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

/// Population mean and standard deviation.
fn mean_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|v| (f64::from(*v) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        assert_eq!(WEIGHTS_PERCENT.iter().sum::<u32>(), 100);
        let as_fraction: f64 = WEIGHTS_PERCENT.iter().map(|w| f64::from(*w)).sum::<f64>() / 100.0;
        assert_eq!(as_fraction, 1.0);
    }

    #[test]
    fn test_baseline_and_perfect_totals() {
        let baseline = SubScores::default();
        assert_eq!(baseline.total(), 50.0);
        assert_eq!(Grade::from_total(50.0), Grade::D);

        let perfect = SubScores {
            pitch_stability: 100.0,
            pitch_match: 100.0,
            energy_match: 100.0,
            pronunciation: 100.0,
            length: 100.0,
        };
        assert_eq!(perfect.total(), 100.0);
        assert_eq!(Grade::from_total(100.0), Grade::S);
    }

    #[test]
    fn test_weighted_total_rounds_to_one_decimal() {
        let scores = SubScores {
            pitch_stability: 91.23,
            pitch_match: 64.0,
            energy_match: 77.7,
            pronunciation: 85.0,
            length: 71.0,
        };
        // 22.8075 + 16.0 + 15.54 + 12.75 + 10.65 = 77.7475
        assert_eq!(scores.total(), 77.7);
        assert_eq!(Grade::from_total(scores.total()), Grade::BPlus);
    }

    #[test]
    fn test_grade_boundaries() {
        let cases = [
            (90.0, "S"),
            (89.9, "A+"),
            (85.0, "A+"),
            (80.0, "A"),
            (75.0, "B+"),
            (70.0, "B"),
            (65.0, "C+"),
            (60.0, "C"),
            (55.0, "D+"),
            (54.9, "D"),
            (0.0, "D"),
        ];
        for (total, grade) in cases {
            assert_eq!(Grade::from_total(total).as_str(), grade, "total {}", total);
        }
    }

    #[test]
    fn test_speech_scores_cap_at_100() {
        assert_eq!(speech_scores(0), (50.0, 50.0));
        assert_eq!(speech_scores(4), (70.0, 62.0));
        assert_eq!(speech_scores(10), (100.0, 80.0));
        assert_eq!(speech_scores(40), (100.0, 100.0));
    }

    #[test]
    fn test_pitch_match_endpoints() {
        let a = vec![220.0f32; 12];
        assert_eq!(pitch_match(&a, &a).unwrap(), 100.0);

        let b = vec![320.0f32; 12];
        assert_eq!(pitch_match(&a, &b).unwrap(), 50.0);

        let c = vec![260.0f32; 12];
        assert_eq!(pitch_match(&a, &c).unwrap(), 80.0);

        assert!(matches!(
            pitch_match(&a, &a[..9]),
            Err(AnalysisError::Insufficient { got: 9, needed: 10 })
        ));
    }

    #[test]
    fn test_pitch_stability() {
        let steady = vec![200.0f32; 10];
        assert_eq!(pitch_stability(&steady).unwrap(), 100.0);

        // mean 200, population std 20 -> 10% variability
        let wobbly: Vec<f32> = (0..10).map(|i| if i % 2 == 0 { 180.0 } else { 220.0 }).collect();
        assert!((pitch_stability(&wobbly).unwrap() - 90.0).abs() < 1e-9);

        let wild: Vec<f32> = (0..10).map(|i| if i % 2 == 0 { 50.0 } else { 950.0 }).collect();
        assert_eq!(pitch_stability(&wild).unwrap(), 50.0);

        assert!(pitch_stability(&steady[..9]).is_err());
    }

    #[test]
    fn test_energy_match() {
        let rising: Vec<f32> = (0..20).map(|i| i as f32).collect();
        assert_eq!(energy_match(&rising, &rising).unwrap(), 100.0);

        let falling: Vec<f32> = rising.iter().rev().copied().collect();
        assert_eq!(energy_match(&rising, &falling).unwrap(), 50.0);

        let flat = vec![0.3f32; 20];
        assert!(matches!(energy_match(&rising, &flat), Err(AnalysisError::Failed(_))));

        assert!(energy_match(&rising[..10], &rising[..10]).is_err());
        assert!(energy_match(&rising[..11], &rising).is_ok());
    }

    #[test]
    fn test_result_uses_sentinel_without_text() {
        let result = ScoreResult::new(SubScores::default(), Some("   ".into()));
        assert!(result.recognition_failed());
        assert_eq!(result.total_score, 50.0);
        assert_eq!(result.grade, Grade::D);

        let result = ScoreResult::new(SubScores::default(), Some("hello world".into()));
        assert_eq!(result.recognized_text, "hello world");
    }
}
