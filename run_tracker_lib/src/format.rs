/// Renders a pace in minutes per kilometer as M'SS", truncated to whole
/// seconds.
pub fn format_pace(pace_min_per_km: f64) -> String {
    let total_seconds = (pace_min_per_km * 60.0) as i64;
    format!("{}'{:02}\"", total_seconds / 60, total_seconds % 60)
}

/// Renders a duration as HH:MM:SS, or MM:SS when under an hour.
pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[test]
fn pace_rendering_truncates_to_whole_seconds() {
    assert_eq!(format_pace(6.5), "6'30\"");
    assert_eq!(format_pace(5.999), "5'59\"");
    assert_eq!(format_pace(0.0), "0'00\"");
    assert_eq!(format_pace(10.0), "10'00\"");
}

#[test]
fn duration_rendering_switches_layout_at_one_hour() {
    assert_eq!(format_duration(185), "03:05");
    assert_eq!(format_duration(3599), "59:59");
    assert_eq!(format_duration(3600), "01:00:00");
    assert_eq!(format_duration(3725), "01:02:05");
    assert_eq!(format_duration(0), "00:00");
}
