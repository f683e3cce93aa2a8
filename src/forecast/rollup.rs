//! Aggregation of hourly forecast points

use chrono::{NaiveDate, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::domain::{DailyEnergy, ForecastPoint};

/// Daily energy per local calendar day, ascending by date
///
/// Each point is an hourly mean power, so its MW value counts as MWh.
pub fn daily_rollup(points: &[ForecastPoint], timezone: Tz) -> Vec<DailyEnergy> {
    let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in points {
        let date = point.timestamp.with_timezone(&timezone).date_naive();
        *days.entry(date).or_insert(0.0) += point.predicted_power_mw;
    }

    days.into_iter()
        .map(|(date, energy_mwh)| DailyEnergy { date, energy_mwh })
        .collect()
}

/// Mean power by local hour of day; hours without points are zero
pub fn hourly_profile(points: &[ForecastPoint], timezone: Tz) -> [f64; 24] {
    let mut sums = [0.0; 24];
    let mut counts = [0usize; 24];
    for point in points {
        let hour = point.timestamp.with_timezone(&timezone).hour() as usize;
        sums[hour] += point.predicted_power_mw;
        counts[hour] += 1;
    }

    let mut profile = [0.0; 24];
    for hour in 0..24 {
        if counts[hour] > 0 {
            profile[hour] = sums[hour] / counts[hour] as f64;
        }
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn hourly(start: DateTime<Utc>, values: &[f64]) -> Vec<ForecastPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, mw)| ForecastPoint {
                timestamp: start + Duration::hours(i as i64),
                predicted_power_mw: *mw,
            })
            .collect()
    }

    #[test]
    fn test_full_day_at_capacity_share() {
        let capacity = 100.0;
        let start = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let points = hourly(start, &[capacity / 24.0; 24]);

        let daily = daily_rollup(&points, Tz::UTC);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        assert!((daily[0].energy_mwh - capacity).abs() < 1e-9);
    }

    #[test]
    fn test_days_follow_local_timezone() {
        // 00:00-05:00 UTC is still the previous evening in New York
        let start = Utc.with_ymd_and_hms(2024, 6, 22, 0, 0, 0).unwrap();
        let points = hourly(start, &[1.0; 6]);

        let daily = daily_rollup(&points, chrono_tz::America::New_York);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        assert_eq!(daily[0].energy_mwh, 4.0);
        assert_eq!(daily[1].date, NaiveDate::from_ymd_opt(2024, 6, 22).unwrap());
        assert_eq!(daily[1].energy_mwh, 2.0);
    }

    #[test]
    fn test_unordered_points_roll_up_ascending() {
        let day2 = Utc.with_ymd_and_hms(2024, 6, 22, 12, 0, 0).unwrap();
        let day1 = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let mut points = hourly(day2, &[3.0]);
        points.extend(hourly(day1, &[5.0]));

        let daily = daily_rollup(&points, Tz::UTC);
        assert!(daily[0].date < daily[1].date);
        assert_eq!(daily[0].energy_mwh, 5.0);
    }

    #[test]
    fn test_empty_rollup() {
        assert!(daily_rollup(&[], Tz::UTC).is_empty());
        assert_eq!(hourly_profile(&[], Tz::UTC), [0.0; 24]);
    }

    #[test]
    fn test_hourly_profile_averages_across_days() {
        let start = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let mut values = vec![0.0; 48];
        values[12] = 10.0;
        values[36] = 30.0;
        let profile = hourly_profile(&hourly(start, &values), Tz::UTC);

        assert_eq!(profile[12], 20.0);
        assert_eq!(profile[0], 0.0);
    }

    proptest! {
        #[test]
        fn prop_rollup_conserves_energy(values in prop::collection::vec(0.0f64..50.0, 0..200)) {
            let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
            let points = hourly(start, &values);
            let daily = daily_rollup(&points, chrono_tz::Europe::Stockholm);

            let total: f64 = daily.iter().map(|d| d.energy_mwh).sum();
            let expected: f64 = values.iter().sum();
            prop_assert!((total - expected).abs() < 1e-6);
            prop_assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
        }
    }
}
