//! Internal timestamp helpers.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Rescale a PTS value from a stream time base to seconds.
pub fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}

/// Rescale a PTS value to a [`Duration`], clamping negative values to zero.
pub fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    Duration::from_secs_f64(pts_to_seconds(pts, time_base).max(0.0))
}

/// Seconds at which a stream's timeline starts.
///
/// `start_time` is in `time_base` units. An unset start
/// (`AV_NOPTS_VALUE`) counts as zero.
pub fn stream_start_seconds(start_time: i64, time_base: Rational) -> f64 {
    if start_time == ffmpeg_sys_next::AV_NOPTS_VALUE {
        return 0.0;
    }
    pts_to_seconds(start_time, time_base)
}

/// Express a frame rate as a rational suitable for an encoder.
///
/// Common NTSC rates map to their exact `n/1001` form; anything else is
/// approximated with millisecond precision. Falls back to 25 fps when the
/// rate is unknown.
pub fn frame_rate_rational(frames_per_second: f64) -> Rational {
    if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
        return Rational::new(25, 1);
    }
    for ntsc in [24_000, 30_000, 60_000] {
        let exact = ntsc as f64 / 1001.0;
        if (frames_per_second - exact).abs() < 0.001 {
            return Rational::new(ntsc, 1001);
        }
    }
    if frames_per_second.fract().abs() < 1e-6 {
        return Rational::new(frames_per_second as i32, 1);
    }
    Rational::new((frames_per_second * 1000.0).round() as i32, 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_rates_are_exact() {
        assert_eq!(frame_rate_rational(29.97), Rational::new(30_000, 1001));
        assert_eq!(frame_rate_rational(23.976), Rational::new(24_000, 1001));
    }

    #[test]
    fn integral_and_unknown_rates() {
        assert_eq!(frame_rate_rational(30.0), Rational::new(30, 1));
        assert_eq!(frame_rate_rational(0.0), Rational::new(25, 1));
        assert_eq!(frame_rate_rational(f64::NAN), Rational::new(25, 1));
    }

    #[test]
    fn pts_rescaling() {
        let time_base = Rational::new(1, 90_000);
        assert_eq!(pts_to_seconds(180_000, time_base), 2.0);
        assert_eq!(pts_to_duration(-10, time_base), Duration::ZERO);
    }

    #[test]
    fn stream_start_offsets() {
        let time_base = Rational::new(1, 90_000);
        assert!((stream_start_seconds(126_000, time_base) - 1.4).abs() < 1e-9);
        assert_eq!(stream_start_seconds(0, time_base), 0.0);
        assert_eq!(
            stream_start_seconds(ffmpeg_sys_next::AV_NOPTS_VALUE, time_base),
            0.0
        );
    }
}
