//! Session state owned by the mode state machine.

use crate::config::TargetLimits;

/// Operating modes in the only order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    SettingPpm,
    SettingVolume,
    AskingStart,
    Running,
    Finished,
}

impl Mode {
    /// The mode an advance press leads to, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::SettingPpm => Some(Self::SettingVolume),
            Self::SettingVolume => Some(Self::AskingStart),
            Self::AskingStart => Some(Self::Running),
            Self::Running | Self::Finished => None,
        }
    }

    /// Targets can no longer change.
    pub const fn targets_frozen(self) -> bool {
        !matches!(self, Self::SettingPpm | Self::SettingVolume)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SettingPpm => "setting_ppm",
            Self::SettingVolume => "setting_volume",
            Self::AskingStart => "asking_start",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `current + step`, or `min` once that would pass `max`.
#[inline]
pub fn wrap_step(current: u16, step: u16, min: u16, max: u16) -> u16 {
    let next = u32::from(current) + u32::from(step);
    if next > u32::from(max) {
        min
    } else {
        // next <= max, so it fits
        next as u16
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    ppm_target: u16,
    volume_target_ml: u16,
    output_active: bool,
    calibration_offset_ma: f32,
}

impl Session {
    /// Power-on session: lowest targets, `SettingPpm`, output off.
    pub fn new(limits: &TargetLimits) -> Self {
        Self {
            mode: Mode::SettingPpm,
            ppm_target: limits.min_ppm,
            volume_target_ml: limits.min_volume_ml,
            output_active: false,
            calibration_offset_ma: 0.0,
        }
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn ppm_target(&self) -> u16 {
        self.ppm_target
    }

    pub const fn volume_target_ml(&self) -> u16 {
        self.volume_target_ml
    }

    pub const fn output_active(&self) -> bool {
        self.output_active
    }

    pub const fn calibration_offset_ma(&self) -> f32 {
        self.calibration_offset_ma
    }

    pub(crate) fn set_calibration_offset(&mut self, ma: f32) {
        self.calibration_offset_ma = ma;
    }

    pub(crate) fn set_output_active(&mut self, active: bool) {
        self.output_active = active;
    }

    /// Step whichever target the current mode edits. Returns false when the
    /// targets are frozen.
    pub(crate) fn bump_target(&mut self, limits: &TargetLimits) -> bool {
        match self.mode {
            Mode::SettingPpm => {
                self.ppm_target = wrap_step(
                    self.ppm_target,
                    limits.step_ppm,
                    limits.min_ppm,
                    limits.max_ppm,
                );
                true
            }
            Mode::SettingVolume => {
                self.volume_target_ml = wrap_step(
                    self.volume_target_ml,
                    limits.step_volume_ml,
                    limits.min_volume_ml,
                    limits.max_volume_ml,
                );
                true
            }
            _ => false,
        }
    }

    /// Move one mode forward. Returns the new mode, or `None` once locked.
    pub(crate) fn advance(&mut self) -> Option<Mode> {
        let next = self.mode.next()?;
        self.mode = next;
        Some(next)
    }

    pub(crate) fn finish(&mut self) {
        debug_assert_eq!(self.mode, Mode::Running);
        self.mode = Mode::Finished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_step_resets_past_max() {
        assert_eq!(wrap_step(45, 5, 5, 50), 50);
        assert_eq!(wrap_step(50, 5, 5, 50), 5);
        assert_eq!(wrap_step(u16::MAX - 1, 10, 1, u16::MAX), 1);
    }

    #[test]
    fn advance_stops_at_running() {
        let mut s = Session::new(&TargetLimits::default());
        assert_eq!(s.advance(), Some(Mode::SettingVolume));
        assert_eq!(s.advance(), Some(Mode::AskingStart));
        assert_eq!(s.advance(), Some(Mode::Running));
        assert_eq!(s.advance(), None);
        assert_eq!(s.mode(), Mode::Running);
    }

    #[test]
    fn bump_edits_the_target_of_the_current_mode() {
        let limits = TargetLimits::default();
        let mut s = Session::new(&limits);
        assert!(s.bump_target(&limits));
        assert_eq!(s.ppm_target(), 10);
        s.advance();
        assert!(s.bump_target(&limits));
        assert_eq!(s.volume_target_ml(), 100);
        s.advance();
        assert!(!s.bump_target(&limits));
        assert_eq!((s.ppm_target(), s.volume_target_ml()), (10, 100));
    }
}
