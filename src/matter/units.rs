//! Position unit conversion.
//!
//! Matter WindowCovering positions are percent100ths (0-10000, 0 = fully open).
//! The vent servo runs from 90° (closed) to 180° (open).

/// Full scale of a percent100ths value.
pub const PERCENT100THS_MAX: u16 = 10_000;

/// Scale factor between a percentage and percent100ths.
pub const PERCENT100THS_PER_PERCENT: u16 = 100;

/// Servo angle of a fully closed vent.
pub const ANGLE_CLOSED: u8 = 90;

/// Servo angle of a fully open vent.
pub const ANGLE_OPEN: u8 = 180;

/// Convert percent100ths to a whole percentage, truncating. Values above 10000 clamp.
pub fn percent100ths_to_percent(value: u16) -> u8 {
    (value.min(PERCENT100THS_MAX) / PERCENT100THS_PER_PERCENT) as u8
}

/// Clamp a raw percent100ths value into range.
pub fn clamp_percent100ths(value: u16) -> u16 {
    value.min(PERCENT100THS_MAX)
}

/// Clamp a servo angle into [ANGLE_CLOSED, ANGLE_OPEN].
pub fn clamp_angle(angle: u8) -> u8 {
    angle.clamp(ANGLE_CLOSED, ANGLE_OPEN)
}

/// Convert servo angle (90-180) to percent100ths. 180° is open (0), 90° closed (10000).
pub fn angle_to_percent100ths(angle: u8) -> u16 {
    let clamped = clamp_angle(angle);
    let range = (ANGLE_OPEN - ANGLE_CLOSED) as u32;
    let from_open = (ANGLE_OPEN - clamped) as u32;
    ((from_open * PERCENT100THS_MAX as u32) / range) as u16
}

/// Convert percent100ths (0-10000) to servo angle (90-180).
pub fn percent100ths_to_angle(value: u16) -> u8 {
    let clamped = clamp_percent100ths(value) as u32;
    let range = (ANGLE_OPEN - ANGLE_CLOSED) as u32;
    let from_open = (clamped * range) / PERCENT100THS_MAX as u32;
    ANGLE_OPEN - from_open as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent100ths_truncates() {
        assert_eq!(percent100ths_to_percent(0), 0);
        assert_eq!(percent100ths_to_percent(4299), 42);
        assert_eq!(percent100ths_to_percent(10_000), 100);
        assert_eq!(percent100ths_to_percent(u16::MAX), 100);
    }

    #[test]
    fn test_whole_percents_convert_exactly() {
        for percent in 0..=100u8 {
            let value = percent as u16 * PERCENT100THS_PER_PERCENT;
            assert_eq!(percent100ths_to_percent(value), percent);
        }
    }

    #[test]
    fn test_angle_endpoints() {
        assert_eq!(angle_to_percent100ths(ANGLE_OPEN), 0);
        assert_eq!(angle_to_percent100ths(ANGLE_CLOSED), 10_000);
        assert_eq!(angle_to_percent100ths(135), 5000);
        assert_eq!(percent100ths_to_angle(0), ANGLE_OPEN);
        assert_eq!(percent100ths_to_angle(10_000), ANGLE_CLOSED);
        assert_eq!(percent100ths_to_angle(5000), 135);
    }

    #[test]
    fn test_angle_clamps() {
        assert_eq!(angle_to_percent100ths(0), 10_000);
        assert_eq!(angle_to_percent100ths(255), 0);
        assert_eq!(percent100ths_to_angle(20_000), ANGLE_CLOSED);
    }

    #[test]
    fn test_angle_round_trip_within_one_degree() {
        for angle in ANGLE_CLOSED..=ANGLE_OPEN {
            let back = percent100ths_to_angle(angle_to_percent100ths(angle));
            assert!(
                (back as i16 - angle as i16).abs() <= 1,
                "angle {} -> back {}",
                angle,
                back
            );
        }
    }
}
