//! Calibration mapping from sensor space to control space.
//!
//! The camera image is mirrored relative to the display, so x is flipped.
//! Output is intentionally not clamped.

use peekaboo_common::config::CalibrationConfig;
use peekaboo_pose_model::landmark::{ControlCoordinate, Landmark};

/// Map a smoothed primary landmark into a control coordinate.
///
/// ```text
/// dx = (1 - x - center_x/100) * multiplier_x
/// dy = (y - center_y/100) * multiplier_y
/// out = (50 + dx*100, 50 + dy*100)
/// ```
pub fn map(primary: &Landmark, calibration: &CalibrationConfig) -> ControlCoordinate {
    let dx = (1.0 - primary.x - calibration.center_x / 100.0) * calibration.multiplier_x;
    let dy = (primary.y - calibration.center_y / 100.0) * calibration.multiplier_y;
    ControlCoordinate {
        x: 50.0 + dx * 100.0,
        y: 50.0 + dy * 100.0,
    }
}

/// Holds the active calibration and maps landmarks with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationMapper {
    calibration: CalibrationConfig,
}

impl CalibrationMapper {
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self { calibration }
    }

    pub fn map(&self, primary: &Landmark) -> ControlCoordinate {
        map(primary, &self.calibration)
    }

    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    /// Swap in new calibration values (from the calibration panel).
    pub fn set_calibration(&mut self, calibration: CalibrationConfig) {
        self.calibration = calibration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration(cx: f64, cy: f64, mx: f64, my: f64) -> CalibrationConfig {
        CalibrationConfig {
            center_x: cx,
            center_y: cy,
            multiplier_x: mx,
            multiplier_y: my,
        }
    }

    fn assert_close(actual: ControlCoordinate, x: f64, y: f64) {
        assert!((actual.x - x).abs() < 1e-9, "x={} expected {x}", actual.x);
        assert!((actual.y - y).abs() < 1e-9, "y={} expected {y}", actual.y);
    }

    #[test]
    fn test_identity_at_center() {
        let out = map(&Landmark::new(0.5, 0.5, -0.2), &CalibrationConfig::default());
        assert_close(out, 50.0, 50.0);
    }

    #[test]
    fn test_x_is_mirrored() {
        // Viewer on the left of the image is on the right of the display.
        let out = map(&Landmark::new(0.2, 0.5, 0.0), &CalibrationConfig::default());
        assert_close(out, 80.0, 50.0);
    }

    #[test]
    fn test_center_offset_shifts_neutral_point() {
        let cal = calibration(40.0, 60.0, 1.0, 1.0);
        // 1 - 0.6 - 0.4 = 0 and 0.6 - 0.6 = 0
        let out = map(&Landmark::new(0.6, 0.6, 0.0), &cal);
        assert_close(out, 50.0, 50.0);
    }

    #[test]
    fn test_multiplier_scales_and_is_not_clamped() {
        let cal = calibration(50.0, 50.0, 2.5, 2.0);
        let out = map(&Landmark::new(0.0, 1.0, 0.0), &cal);
        assert_close(out, 175.0, 150.0);
        assert!(!out.is_within_nominal_range());
    }

    #[test]
    fn test_mapper_uses_updated_calibration() {
        let mut mapper = CalibrationMapper::default();
        let point = Landmark::new(0.3, 0.7, 0.0);
        assert_close(mapper.map(&point), 70.0, 70.0);

        mapper.set_calibration(calibration(50.0, 50.0, 0.5, 0.5));
        assert_close(mapper.map(&point), 60.0, 60.0);
    }
}
