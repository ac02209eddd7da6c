//! Frequency bank: pools transform bins into display buckets.
//!
//! Two layouts are supported. The linear bank averages a fixed number of
//! consecutive bins per bucket; the equal-temperament bank centers one
//! bucket on the nearest bin to each semitone and sizes it from the spacing
//! of its neighbours, so buckets grow wider toward high frequencies.

use crate::config::BankConfig;
use crate::error::{Result, WfallError};

/// Bucket layout over a contiguous range of transform bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Bank {
    min_bin: usize,
    max_bin: usize,
    /// First bin of each bucket
    starts: Vec<usize>,
    widths: Vec<usize>,
    bin_hz: f32,
}

impl Bank {
    /// Builds the bank described by `config` for the given transform.
    pub fn from_config(config: &BankConfig, sample_rate: u32, transform_size: usize) -> Result<Self> {
        match *config {
            BankConfig::Linear {
                min_hz,
                max_hz,
                divisor,
            } => Self::linear(sample_rate, transform_size, min_hz, max_hz, divisor),
            BankConfig::EqualTemperament { start_hz, steps } => {
                Self::equal_temperament(sample_rate, transform_size, start_hz, steps)
            }
        }
    }

    /// Fixed-width buckets of `divisor` bins between `min_hz` and `max_hz`.
    ///
    /// # Errors
    /// Returns `WfallError::InvalidConfig` if the range holds fewer than `divisor` bins.
    pub fn linear(
        sample_rate: u32,
        transform_size: usize,
        min_hz: f32,
        max_hz: f32,
        divisor: usize,
    ) -> Result<Self> {
        let bin_hz = bin_width_hz(sample_rate, transform_size);
        let nyquist_bin = transform_size / 2;
        let min_bin = ((min_hz / bin_hz).round() as usize).min(nyquist_bin);
        let max_bin = ((max_hz / bin_hz).round() as usize).min(nyquist_bin);

        let buckets = max_bin.saturating_sub(min_bin) / divisor.max(1);
        if divisor == 0 || buckets == 0 {
            return Err(WfallError::InvalidConfig(format!(
                "linear bank {min_hz}-{max_hz}Hz /{divisor} covers no buckets at {bin_hz:.2}Hz per bin"
            )));
        }

        Ok(Self {
            min_bin,
            max_bin,
            starts: (0..buckets).map(|k| min_bin + k * divisor).collect(),
            widths: vec![divisor; buckets],
            bin_hz,
        })
    }

    /// One bucket per semitone, starting at `start_hz`.
    ///
    /// Step `n` is centered on the bin nearest `start_hz * 2^(n/12)` and
    /// pools `round(half_span / bin_hz)` bins (at least one), where
    /// `half_span` is half the distance between its neighbours. Low steps
    /// narrower than a bin share bins with their neighbours.
    ///
    /// # Errors
    /// Returns `WfallError::InvalidConfig` if there are no steps or the start lies above Nyquist.
    pub fn equal_temperament(
        sample_rate: u32,
        transform_size: usize,
        start_hz: f32,
        steps: usize,
    ) -> Result<Self> {
        let bin_hz = bin_width_hz(sample_rate, transform_size);
        let nyquist_bin = transform_size / 2;
        let center = |n: i64| f64::from(start_hz) * 2f64.powf(n as f64 / 12.0);
        let bin_hz64 = f64::from(bin_hz);

        let (starts, widths): (Vec<usize>, Vec<usize>) = (0..steps as i64)
            .map(|n| {
                let half_span = (center(n + 1) - center(n - 1)) / 2.0;
                let width = ((half_span / bin_hz64).round() as usize).max(1);
                let first = center(n) / bin_hz64 - (width - 1) as f64 / 2.0;
                (first.round().max(0.0) as usize, width)
            })
            .unzip();

        let lower_edge = (center(-1) + center(0)) / 2.0;
        let upper_edge = (center(steps as i64 - 1) + center(steps as i64)) / 2.0;
        let min_bin = (lower_edge / bin_hz64).floor() as usize;
        let max_bin = ((upper_edge / bin_hz64).ceil() as usize).min(nyquist_bin);

        if widths.is_empty() || min_bin >= max_bin {
            return Err(WfallError::InvalidConfig(format!(
                "equal-temperament bank {start_hz}Hz x{steps} covers no bins below Nyquist"
            )));
        }

        Ok(Self {
            min_bin,
            max_bin,
            starts,
            widths,
            bin_hz,
        })
    }

    /// Pools one spectral row into a display row of `output_width()` values.
    ///
    /// Each bucket is the sum of its bins divided by the bucket width; bins
    /// beyond the row or above `max_bin` count as missing.
    pub fn apply(&self, row: &[f32]) -> Vec<f32> {
        let end = self.max_bin.min(row.len());
        self.starts
            .iter()
            .zip(&self.widths)
            .map(|(&start, &width)| {
                let stop = (start + width).min(end);
                let bins = row.get(start.min(stop)..stop).unwrap_or(&[]);
                bins.iter().sum::<f32>() / width as f32
            })
            .collect()
    }

    /// Number of buckets in each display row.
    pub fn output_width(&self) -> usize {
        self.widths.len()
    }

    pub fn min_bin(&self) -> usize {
        self.min_bin
    }

    pub fn max_bin(&self) -> usize {
        self.max_bin
    }

    /// Bins pooled by each bucket, in output order.
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Approximate center frequency of a bucket, in Hz.
    pub fn bucket_center_hz(&self, bucket: usize) -> Option<f32> {
        let width = *self.widths.get(bucket)?;
        let start = self.starts[bucket];
        Some((start as f32 + (width as f32 - 1.0) / 2.0) * self.bin_hz)
    }
}

/// Frequency spacing between adjacent transform bins.
pub fn bin_width_hz(sample_rate: u32, transform_size: usize) -> f32 {
    sample_rate as f32 / transform_size as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::note_name;

    #[test]
    fn test_linear_output_width() {
        let bank = Bank::linear(44100, 4096, 0.0, 2000.0, 2).unwrap();
        // 2000Hz is bin 186 at ~10.77Hz per bin.
        assert_eq!(bank.min_bin(), 0);
        assert_eq!(bank.max_bin(), 186);
        assert_eq!(bank.output_width(), (bank.max_bin() - bank.min_bin()) / 2);
    }

    #[test]
    fn test_linear_buckets_are_means() {
        let bank = Bank::linear(1000, 100, 100.0, 400.0, 3).unwrap();
        assert_eq!((bank.min_bin(), bank.max_bin()), (10, 40));
        let row: Vec<f32> = (0..50).map(|i| (i * 7 % 11) as f32).collect();
        let out = bank.apply(&row);
        assert_eq!(out.len(), 10);
        for (k, value) in out.iter().enumerate() {
            let start = 10 + 3 * k;
            let mean = row[start..start + 3].iter().sum::<f32>() / 3.0;
            assert!((value - mean).abs() < 1e-5, "bucket {k}: {value} != {mean}");
        }
    }

    #[test]
    fn test_linear_rejects_range_narrower_than_divisor() {
        assert!(Bank::linear(44100, 4096, 0.0, 10.0, 4).is_err());
    }

    #[test]
    fn test_linear_clamps_to_nyquist() {
        let bank = Bank::linear(8000, 64, 0.0, 10_000.0, 4).unwrap();
        assert_eq!(bank.max_bin(), 32);
        assert_eq!(bank.output_width(), 8);
    }

    #[test]
    fn test_short_row_drops_missing_bins() {
        let bank = Bank::linear(1000, 100, 0.0, 400.0, 4).unwrap();
        let out = bank.apply(&[4.0; 6]);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0], 4.0);
        assert_eq!(out[1], 2.0);
        assert!(out[2..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_equal_temperament_widths_non_decreasing() {
        for start_hz in [27.5, 49.0, 110.0, 440.0] {
            let bank = Bank::equal_temperament(44100, 4096, start_hz, 72).unwrap();
            assert_eq!(bank.output_width(), 72);
            assert!(
                bank.widths().windows(2).all(|pair| pair[0] <= pair[1]),
                "widths decrease for start {start_hz}: {:?}",
                bank.widths()
            );
            assert!(bank.widths().last() > bank.widths().first());
        }
    }

    #[test]
    fn test_equal_temperament_range_brackets_steps() {
        let bank = Bank::equal_temperament(44100, 44100, 49.0, 12).unwrap();
        // One-hertz bins: the range runs from just below G1 to just above F#2.
        assert_eq!(bank.min_bin(), 47);
        assert_eq!(bank.max_bin(), 96);
    }

    #[test]
    fn test_equal_temperament_a4_spike_lands_on_its_step() {
        let bank = Bank::equal_temperament(44100, 4096, 49.0, 72).unwrap();
        let bin_hz = bin_width_hz(44100, 4096);
        let mut row = vec![0.0; 2048];
        row[(440.0 / bin_hz).round() as usize] = 1.0;

        let out = bank.apply(&row);
        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 38);
    }

    #[test]
    fn test_equal_temperament_centers_follow_semitones() {
        let bank = Bank::equal_temperament(44100, 4096, 49.0, 72).unwrap();
        let bin_hz = bin_width_hz(44100, 4096);
        for step in 0..72 {
            let nominal = 49.0 * 2f32.powf(step as f32 / 12.0);
            let center = bank.bucket_center_hz(step).unwrap();
            assert!(
                (center - nominal).abs() <= bin_hz,
                "step {step}: nominal {nominal}Hz, bucket center {center}Hz"
            );
        }
        assert_eq!(note_name(bank.bucket_center_hz(38).unwrap()).as_deref(), Some("A4"));
    }

    #[test]
    fn test_equal_temperament_feeds_every_bucket() {
        let bank = Bank::equal_temperament(44100, 4096, 49.0, 72).unwrap();
        let out = bank.apply(&vec![1.0; 2048]);
        assert!(out.iter().all(|&v| (v - 1.0).abs() < 1e-6), "{out:?}");
    }

    #[test]
    fn test_from_config_selects_variant() {
        let bank = Bank::from_config(
            &BankConfig::EqualTemperament {
                start_hz: 55.0,
                steps: 24,
            },
            44100,
            4096,
        )
        .unwrap();
        assert_eq!(bank.output_width(), 24);

        let bank = Bank::from_config(&BankConfig::default(), 44100, 4096).unwrap();
        assert_eq!(bank.output_width(), 93);
    }

    #[test]
    fn test_bucket_center_hz() {
        let bank = Bank::linear(1000, 1000, 100.0, 200.0, 10).unwrap();
        assert_eq!(bank.bucket_center_hz(0), Some(104.5));
        assert_eq!(bank.bucket_center_hz(9), Some(194.5));
        assert_eq!(bank.bucket_center_hz(10), None);
    }
}
