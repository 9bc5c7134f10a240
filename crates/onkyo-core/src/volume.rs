//! Conversion between receiver-scale volume and a normalized fraction.
//!
//! Receivers count volume in integer steps. How many steps span the
//! device's native 0-100 range depends on the model (its *resolution*),
//! and the operator may cap the usable range at a percentage of that. The
//! usable ceiling is
//!
//! ```text
//! usable_ceiling = volume_resolution * max_volume_percent / 100
//! ```
//!
//! and the control layer works with `level / usable_ceiling` in `[0, 1]`.
//!
//! # Rounding
//!
//! [`VolumeScale::to_receiver`] rounds half away from zero. Inputs are
//! never negative, so this is round-half-up: `0.499 * 80 = 39.92` becomes
//! `40`, and an exact half step such as `0.25 * 2 = 0.5` becomes `1`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default receiver-scale ceiling.
pub const DEFAULT_RECEIVER_MAX_VOLUME: u32 = 100;
/// Default cap as a percentage of the device maximum.
pub const DEFAULT_MAX_VOLUME_PERCENT: u8 = 100;

/// Number of discrete steps a receiver exposes across its native range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum VolumeResolution {
    R50,
    #[default]
    R80,
    R100,
    R200,
}

impl VolumeResolution {
    pub fn steps(&self) -> u16 {
        match self {
            VolumeResolution::R50 => 50,
            VolumeResolution::R80 => 80,
            VolumeResolution::R100 => 100,
            VolumeResolution::R200 => 200,
        }
    }
}

impl fmt::Display for VolumeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steps())
    }
}

/// Error returned for a resolution outside `{50, 80, 100, 200}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidResolution(pub u16);

impl fmt::Display for InvalidResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "volume resolution must be one of 50, 80, 100, 200 (got {})",
            self.0
        )
    }
}

impl std::error::Error for InvalidResolution {}

impl TryFrom<u16> for VolumeResolution {
    type Error = InvalidResolution;

    fn try_from(steps: u16) -> std::result::Result<Self, Self::Error> {
        match steps {
            50 => Ok(VolumeResolution::R50),
            80 => Ok(VolumeResolution::R80),
            100 => Ok(VolumeResolution::R100),
            200 => Ok(VolumeResolution::R200),
            other => Err(InvalidResolution(other)),
        }
    }
}

impl From<VolumeResolution> for u16 {
    fn from(resolution: VolumeResolution) -> u16 {
        resolution.steps()
    }
}

/// The volume scaling law for one receiver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeScale {
    receiver_max_volume: u32,
    resolution: VolumeResolution,
    max_volume_percent: u8,
}

impl VolumeScale {
    /// Build a scale.
    ///
    /// `receiver_max_volume` is carried for display and configuration only.
    /// The conversions depend on the resolution and the percentage cap
    /// alone, so both directions always agree.
    pub fn new(
        receiver_max_volume: u32,
        resolution: VolumeResolution,
        max_volume_percent: u8,
    ) -> Self {
        VolumeScale {
            receiver_max_volume,
            resolution,
            max_volume_percent,
        }
    }

    pub fn resolution(&self) -> VolumeResolution {
        self.resolution
    }

    pub fn max_volume_percent(&self) -> u8 {
        self.max_volume_percent
    }

    pub fn receiver_max_volume(&self) -> u32 {
        self.receiver_max_volume
    }

    /// Effective maximum receiver-scale level.
    pub fn usable_ceiling(&self) -> f64 {
        f64::from(self.resolution.steps()) * f64::from(self.max_volume_percent) / 100.0
    }

    /// Convert a receiver-scale level to a fraction in `[0, 1]`.
    ///
    /// A degenerate ceiling of zero maps every level to `0.0`.
    ///
    /// ```
    /// use onkyo_core::volume::{VolumeResolution, VolumeScale};
    ///
    /// let scale = VolumeScale::new(100, VolumeResolution::R80, 50);
    /// assert_eq!(scale.to_fraction(20), 0.5);
    /// ```
    pub fn to_fraction(&self, level: u32) -> f64 {
        let ceiling = self.usable_ceiling();
        if ceiling <= 0.0 {
            return 0.0;
        }
        (f64::from(level) / ceiling).clamp(0.0, 1.0)
    }

    /// Convert a fraction to a receiver-scale level, rounding half-up.
    ///
    /// Fractions outside `[0, 1]` are clamped first; NaN is treated as 0.
    ///
    /// ```
    /// use onkyo_core::volume::{VolumeResolution, VolumeScale};
    ///
    /// let scale = VolumeScale::new(100, VolumeResolution::R80, 100);
    /// assert_eq!(scale.to_receiver(0.5), 40);
    /// assert_eq!(scale.to_receiver(0.499), 40);
    /// ```
    pub fn to_receiver(&self, fraction: f64) -> u32 {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        (fraction * self.usable_ceiling()).round() as u32
    }
}

impl Default for VolumeScale {
    fn default() -> Self {
        VolumeScale::new(
            DEFAULT_RECEIVER_MAX_VOLUME,
            VolumeResolution::default(),
            DEFAULT_MAX_VOLUME_PERCENT,
        )
    }
}
