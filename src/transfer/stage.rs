//! Transfer stages and overall progress scaling.
//!
//! ```text
//!   Idle ──request_write──▶ Serializing ──buffer full──▶ Uploading ──done/failed/cancelled──▶ Idle
//!                                │                                          ▲
//!                                └───────────job error / cancelled──────────┘
//! ```
//!
//! Serialization covers the first half of the overall progress bar, the
//! upload the second half.

/// Phase of the transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// No transfer in flight.
    #[default]
    Idle,
    /// Copying job lines into the transfer buffer.
    Serializing,
    /// HTTP upload in flight.
    Uploading,
}

impl Stage {
    /// Map a stage-local fraction onto overall progress.
    ///
    /// Serializing maps to [0, 0.5], Uploading to [0.5, 1.0]. Out-of-range
    /// and NaN fractions are clamped first.
    ///
    /// ```
    /// use wireless_print::transfer::Stage;
    ///
    /// assert_eq!(Stage::Serializing.scale_progress(1.0), 0.5);
    /// assert_eq!(Stage::Uploading.scale_progress(0.5), 0.75);
    /// ```
    pub fn scale_progress(self, fraction: f32) -> f32 {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        match self {
            Stage::Idle => 0.0,
            Stage::Serializing => fraction * 0.5,
            Stage::Uploading => 0.5 + fraction * 0.5,
        }
    }

    pub fn is_active(self) -> bool {
        self != Stage::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializing_first_half() {
        assert_eq!(Stage::Serializing.scale_progress(0.0), 0.0);
        assert_eq!(Stage::Serializing.scale_progress(0.5), 0.25);
        assert_eq!(Stage::Serializing.scale_progress(1.0), 0.5);
    }

    #[test]
    fn test_uploading_second_half() {
        assert_eq!(Stage::Uploading.scale_progress(0.0), 0.5);
        assert_eq!(Stage::Uploading.scale_progress(1.0), 1.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(Stage::Serializing.scale_progress(3.0), 0.5);
        assert_eq!(Stage::Uploading.scale_progress(-1.0), 0.5);
        assert_eq!(Stage::Uploading.scale_progress(f32::NAN), 0.5);
    }

    #[test]
    fn test_idle_is_default_and_inactive() {
        assert_eq!(Stage::default(), Stage::Idle);
        assert!(!Stage::Idle.is_active());
        assert!(Stage::Uploading.is_active());
    }
}
