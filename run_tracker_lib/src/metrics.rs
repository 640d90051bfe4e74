use geo_types::Point;

use super::split::Split;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Flat estimate for an average person. Ignores pace on purpose, the
/// displayed numbers depend on it staying constant.
pub const CALORIES_PER_KM: f64 = 60.0;

/// Great-circle distance between two positions in kilometers, haversine
/// form. Points are (longitude, latitude) in degrees.
pub fn haversine_km(from: Point, to: Point) -> f64 {
    let d_lat = (to.y() - from.y()).to_radians();
    let d_lon = (to.x() - from.x()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.y().to_radians().cos() * to.y().to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn calculate_calories(distance_km: f64) -> i32 {
    (distance_km * CALORIES_PER_KM) as i32
}

/// Pace in minutes per kilometer for a positive speed.
pub fn speed_to_pace(speed_kmph: f64) -> Option<f64> {
    if speed_kmph > 0.0 {
        Some(60.0 / speed_kmph)
    } else {
        None
    }
}

/// Average pace in minutes per kilometer. Undefined until both distance and
/// duration are positive.
pub fn average_pace(distance_km: f64, duration_seconds: i64) -> Option<f64> {
    if distance_km > 0.0 && duration_seconds > 0 {
        Some(duration_seconds as f64 / distance_km / 60.0)
    } else {
        None
    }
}

/// Divides a finished run into equal-length splits. Each split gets its
/// proportional share of the overall average pace rather than the actual
/// timing of that segment.
pub fn generate_splits(distance_km: f64, duration_seconds: i64, split_unit: f64) -> Vec<Split> {
    if distance_km <= 0.0 || duration_seconds <= 0 || split_unit <= 0.0 {
        return Vec::new();
    }

    let count = (distance_km / split_unit) as u32;
    let km_per_second = distance_km / duration_seconds as f64;

    (1..=count)
        .map(|number| {
            let split_duration = (split_unit / km_per_second) as i64;
            Split {
                number,
                distance_km: split_unit,
                duration_seconds: split_duration,
                pace_min_per_km: split_duration as f64 / split_unit / 60.0,
                calories: (CALORIES_PER_KM * split_unit) as i32,
            }
        })
        .collect()
}

#[test]
fn one_degree_of_longitude_at_the_equator() {
    let distance = haversine_km(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
    assert!((distance - 111.19).abs() < 0.01, "got {distance}");
}

#[test]
fn haversine_is_symmetric_and_zero_on_identical_points() {
    let aarhus = Point::new(10.203921, 56.162939);
    let copenhagen = Point::new(12.568337, 55.676098);

    assert_eq!(haversine_km(aarhus, aarhus), 0.0);
    assert!((haversine_km(aarhus, copenhagen) - haversine_km(copenhagen, aarhus)).abs() < 1e-9);
}

#[test]
fn five_km_in_thirty_minutes_gives_five_even_splits() {
    let splits = generate_splits(5.0, 1800, 1.0);

    assert_eq!(splits.len(), 5);
    for (index, split) in splits.iter().enumerate() {
        assert_eq!(split.number, index as u32 + 1);
        assert_eq!(split.distance_km, 1.0);
        assert_eq!(split.duration_seconds, 360);
        assert!((split.pace_min_per_km - 6.0).abs() < 1e-9);
        assert_eq!(split.calories, 60);
    }
}

#[test]
fn partial_last_kilometer_is_dropped_from_splits() {
    assert_eq!(generate_splits(5.9, 1800, 1.0).len(), 5);
    assert_eq!(generate_splits(0.9, 600, 1.0).len(), 0);
}

#[test]
fn no_splits_without_distance_or_duration() {
    assert!(generate_splits(0.0, 1800, 1.0).is_empty());
    assert!(generate_splits(5.0, 0, 1.0).is_empty());
}

#[test]
fn calories_are_a_flat_sixty_per_kilometer() {
    assert_eq!(calculate_calories(10.5), 630);
    assert_eq!(calculate_calories(0.0), 0);
}

#[test]
fn pace_from_speed() {
    assert_eq!(speed_to_pace(12.0), Some(5.0));
    assert_eq!(speed_to_pace(0.0), None);
    assert_eq!(speed_to_pace(-3.0), None);
}

#[test]
fn average_pace_needs_both_distance_and_duration() {
    assert_eq!(average_pace(0.0, 600), None);
    assert_eq!(average_pace(2.0, 0), None);
    assert_eq!(average_pace(2.0, 600), Some(5.0));
}
