//! Coulometric ppm estimate built from windows of averaged current samples.

use crate::config::SamplingCfg;

/// Empirical factor relating mA·min per litre to ppm for the reference cell.
pub const PPM_CELL_FACTOR: f32 = 15.0;

/// Summary of one completed sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    pub average_ma: f32,
    pub window_minutes: f32,
    /// Raw ppm of this window; negative when the corrected current was.
    pub window_ppm: f32,
    pub elapsed_ppm: f32,
    pub elapsed_minutes: f32,
}

/// ppm produced by `average_ma` flowing for `window_minutes` into `volume_ml`.
#[inline]
pub fn window_ppm(window_minutes: f32, average_ma: f32, volume_ml: u16) -> f32 {
    (window_minutes * average_ma) / (PPM_CELL_FACTOR * (f32::from(volume_ml) / 1000.0))
}

#[derive(Debug, Clone)]
pub struct DoseAccumulator {
    samples_per_window: u32,
    window_minutes: f32,
    samples_in_window: u32,
    current_sum_ma: f32,
    elapsed_ppm: f32,
    elapsed_minutes: f32,
    windows: u32,
}

impl DoseAccumulator {
    pub fn new(sampling: &SamplingCfg) -> Self {
        Self {
            samples_per_window: sampling.samples_per_window.max(1),
            window_minutes: sampling.window_minutes(),
            samples_in_window: 0,
            current_sum_ma: 0.0,
            elapsed_ppm: 0.0,
            elapsed_minutes: 0.0,
            windows: 0,
        }
    }

    /// Clear the partial window and the running totals.
    pub fn reset(&mut self) {
        self.samples_in_window = 0;
        self.current_sum_ma = 0.0;
        self.elapsed_ppm = 0.0;
        self.elapsed_minutes = 0.0;
        self.windows = 0;
    }

    /// Add one corrected sample. Returns a report when it completes a window.
    ///
    /// `volume_ml` must be non-zero.
    pub fn push(&mut self, current_ma: f32, volume_ml: u16) -> Option<WindowReport> {
        self.current_sum_ma += current_ma;
        self.samples_in_window += 1;
        if self.samples_in_window < self.samples_per_window {
            return None;
        }
        debug_assert_eq!(self.samples_in_window, self.samples_per_window);
        debug_assert!(volume_ml > 0);

        let average_ma = self.current_sum_ma / self.samples_per_window as f32;
        let ppm = window_ppm(self.window_minutes, average_ma, volume_ml);
        // A negative window slows nothing down retroactively; the total only grows.
        self.elapsed_ppm += ppm.max(0.0);
        self.elapsed_minutes += self.window_minutes;
        self.windows += 1;
        self.samples_in_window = 0;
        self.current_sum_ma = 0.0;

        if ppm < 0.0 {
            tracing::warn!(average_ma, window_ppm = ppm, "negative window current");
        }
        Some(WindowReport {
            average_ma,
            window_minutes: self.window_minutes,
            window_ppm: ppm,
            elapsed_ppm: self.elapsed_ppm,
            elapsed_minutes: self.elapsed_minutes,
        })
    }

    pub const fn elapsed_ppm(&self) -> f32 {
        self.elapsed_ppm
    }

    pub const fn elapsed_minutes(&self) -> f32 {
        self.elapsed_minutes
    }

    pub const fn samples_in_window(&self) -> u32 {
        self.samples_in_window
    }

    pub const fn windows_completed(&self) -> u32 {
        self.windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_minute_windows() -> DoseAccumulator {
        DoseAccumulator::new(&SamplingCfg::default())
    }

    #[test]
    fn completes_every_sixth_sample() {
        let mut acc = one_minute_windows();
        for i in 1..=18 {
            let report = acc.push(10.0, 100);
            assert_eq!(report.is_some(), i % 6 == 0, "sample {i}");
        }
        assert_eq!(acc.windows_completed(), 3);
        assert_eq!(acc.samples_in_window(), 0);
    }

    #[test]
    fn window_formula_matches_cell_factor() {
        // 1 min at 15 mA into 1 L is exactly 1 ppm
        assert!((window_ppm(1.0, 15.0, 1000) - 1.0).abs() < 1e-6);
        let mut acc = one_minute_windows();
        let report = (0..6).find_map(|_| acc.push(15.0, 1000)).unwrap();
        assert!((report.average_ma - 15.0).abs() < 1e-5);
        assert!((report.elapsed_ppm - 1.0).abs() < 1e-5);
        assert!((report.elapsed_minutes - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negative_window_is_reported_but_not_subtracted() {
        let mut acc = one_minute_windows();
        let first = (0..6).find_map(|_| acc.push(15.0, 1000)).unwrap();
        let second = (0..6).find_map(|_| acc.push(-30.0, 1000)).unwrap();
        assert!(second.window_ppm < 0.0);
        assert!((second.elapsed_ppm - first.elapsed_ppm).abs() < f32::EPSILON);
        assert!((second.elapsed_minutes - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_everything() {
        let mut acc = one_minute_windows();
        for _ in 0..8 {
            acc.push(5.0, 50);
        }
        acc.reset();
        assert_eq!(acc.samples_in_window(), 0);
        assert_eq!(acc.windows_completed(), 0);
        assert!(acc.elapsed_ppm().abs() < f32::EPSILON);
    }
}
