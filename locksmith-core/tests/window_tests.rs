//! Reboot window parsing and scheduling.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use locksmith_core::{ConfigError, RebootWindow};
use rstest::rstest;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid timestamp")
}

fn window(start: &str, length: &str) -> RebootWindow {
    RebootWindow::parse(start, length).expect("valid window")
}

const fn mins(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

// ---------------------------------------------------------------------------
// 1. Scheduling
// ---------------------------------------------------------------------------

#[rstest]
#[case::before_window("02:00", "1h", at(1, 0), mins(60))]
#[case::at_window_start("02:00", "1h", at(2, 0), Duration::ZERO)]
#[case::inside_window("02:00", "1h", at(2, 30), Duration::ZERO)]
#[case::at_window_end("02:00", "1h", at(3, 0), mins(23 * 60))]
#[case::after_window("02:00", "1h", at(22, 15), mins(3 * 60 + 45))]
#[case::spans_midnight_after("23:30", "2h", at(0, 30), Duration::ZERO)]
#[case::spans_midnight_before("23:30", "2h", at(23, 45), Duration::ZERO)]
#[case::spans_midnight_outside("23:30", "2h", at(1, 30), mins(22 * 60))]
#[case::full_day("04:00", "24h", at(3, 59), Duration::ZERO)]
fn duration_to_start(
    #[case] start: &str,
    #[case] length: &str,
    #[case] now: NaiveDateTime,
    #[case] expected: Duration,
) {
    assert_eq!(window(start, length).duration_to_start(now), expected);
}

#[test]
fn scheduling_is_deterministic_for_a_fixed_clock() {
    let w = window("05:15", "30m");
    let now = at(4, 0);
    assert_eq!(w.duration_to_start(now), w.duration_to_start(now));
    assert_eq!(w.duration_to_start(now), mins(75));
}

// ---------------------------------------------------------------------------
// 2. Settings resolution
// ---------------------------------------------------------------------------

#[test]
fn neither_setting_means_no_window() {
    assert_eq!(RebootWindow::from_settings(None, None).expect("ok"), None);
    assert_eq!(RebootWindow::from_settings(Some(""), Some(" ")).expect("ok"), None);
}

#[rstest]
#[case(Some("02:00"), None)]
#[case(None, Some("1h"))]
#[case(Some("02:00"), Some(""))]
fn partial_settings_are_rejected(#[case] start: Option<&str>, #[case] length: Option<&str>) {
    let err = RebootWindow::from_settings(start, length).unwrap_err();
    assert!(matches!(err, ConfigError::PartialWindow), "got: {err}");
}

#[test]
fn both_settings_produce_a_window() {
    let w = RebootWindow::from_settings(Some("03:30:15"), Some("45m"))
        .expect("ok")
        .expect("window");
    assert_eq!(w.start(), NaiveTime::from_hms_opt(3, 30, 15).expect("time"));
    assert_eq!(w.length(), mins(45));
    assert_eq!(w.to_string(), "03:30:15 for 45m");
}

#[rstest]
#[case("25:00")]
#[case("noon")]
#[case("Thu")]
fn malformed_start_is_rejected(#[case] start: &str) {
    let err = RebootWindow::parse(start, "1h").unwrap_err();
    assert!(matches!(err, ConfigError::WindowStart { .. }), "got: {err}");
    assert!(err.to_string().contains(start));
}

#[rstest]
#[case("forever")]
#[case("0s")]
#[case("25h")]
fn malformed_length_is_rejected(#[case] length: &str) {
    let err = RebootWindow::parse("02:00", length).unwrap_err();
    assert!(matches!(err, ConfigError::WindowLength { .. }), "got: {err}");
}
