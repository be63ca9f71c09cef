// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pure weather normalization helpers.
//!
//! No I/O here. [`bucket_forecast`] turns the provider's 3-hour samples into
//! at most [`MAX_FORECAST_DAYS`] local calendar days.

use crate::models::{ForecastDay, Units};
use crate::services::openweather::OwmForecastItem;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeMap;

pub const MAX_FORECAST_DAYS: usize = 5;

/// Local hours (inclusive) from which a day's representative sample is taken.
const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 10..=14;

const HPA_TO_INHG: f64 = 0.02953;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass direction for a bearing in degrees.
pub fn wind_direction(degrees: f64) -> &'static str {
    let index = (degrees / 22.5).round() as i64;
    COMPASS_POINTS[index.rem_euclid(16) as usize]
}

/// Hectopascals to inches of mercury, rounded to 2 decimals.
pub fn hpa_to_inhg(hpa: f64) -> f64 {
    (hpa * HPA_TO_INHG * 100.0).round() / 100.0
}

/// Pressure in the unit system's customary unit.
pub fn normalize_pressure(hpa: f64, units: Units) -> f64 {
    match units {
        Units::Imperial => hpa_to_inhg(hpa),
        Units::Metric => hpa.round(),
    }
}

/// Local wall-clock time of a sample given the location's UTC offset.
fn local_time(unix_secs: i64, utc_offset_secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(unix_secs + utc_offset_secs, 0).map(|dt| dt.naive_utc())
}

/// Group forecast samples by local date and summarize each day.
///
/// Dates before `today` (local) are dropped. High and low span all samples of
/// the day; every other field comes from one representative sample, the
/// first one around midday or else the middle sample.
pub fn bucket_forecast(
    samples: &[OwmForecastItem],
    utc_offset_secs: i64,
    today: NaiveDate,
    units: Units,
) -> Vec<ForecastDay> {
    let mut days: BTreeMap<NaiveDate, Vec<(NaiveDateTime, &OwmForecastItem)>> = BTreeMap::new();
    for sample in samples {
        let Some(local) = local_time(sample.dt, utc_offset_secs) else {
            continue;
        };
        if local.date() < today {
            continue;
        }
        days.entry(local.date()).or_default().push((local, sample));
    }

    days.into_iter()
        .take(MAX_FORECAST_DAYS)
        .map(|(date, group)| summarize_day(date, &group, units))
        .collect()
}

fn summarize_day(
    date: NaiveDate,
    group: &[(NaiveDateTime, &OwmForecastItem)],
    units: Units,
) -> ForecastDay {
    let high_temp = group
        .iter()
        .map(|(_, s)| s.main.temp)
        .fold(f64::NEG_INFINITY, f64::max);
    let low_temp = group
        .iter()
        .map(|(_, s)| s.main.temp)
        .fold(f64::INFINITY, f64::min);

    let (_, rep) = group
        .iter()
        .find(|(local, _)| MIDDAY_HOURS.contains(&local.hour()))
        .unwrap_or(&group[group.len() / 2]);

    let condition = rep.weather.first();
    ForecastDay {
        date: date.format("%Y-%m-%d").to_string(),
        day_name: date.format("%A").to_string(),
        high_temp,
        low_temp,
        condition: condition.map(|c| c.description.clone()).unwrap_or_default(),
        icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
        humidity: rep.main.humidity,
        wind_speed: rep.wind.speed,
        wind_direction: wind_direction(rep.wind.deg).to_string(),
        pressure: normalize_pressure(rep.main.pressure, units),
        precipitation: (rep.pop * 100.0).round().clamp(0.0, 100.0) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::openweather::{OwmCondition, OwmMain, OwmWind};

    fn sample(dt: i64, temp: f64, pop: f64, description: &str) -> OwmForecastItem {
        OwmForecastItem {
            dt,
            main: OwmMain {
                temp,
                feels_like: temp,
                humidity: 50,
                pressure: 1013.0,
            },
            weather: vec![OwmCondition {
                main: "Clouds".to_string(),
                description: description.to_string(),
                icon: "04d".to_string(),
            }],
            wind: OwmWind {
                speed: 3.0,
                deg: 200.0,
            },
            pop,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Unix timestamp of a UTC wall-clock time.
    fn ts(d: NaiveDate, hour: u32) -> i64 {
        d.and_hms_opt(hour, 0, 0).unwrap().and_utc().timestamp()
    }

    #[test]
    fn test_wind_direction() {
        assert_eq!(wind_direction(0.0), "N");
        assert_eq!(wind_direction(350.0), "N");
        assert_eq!(wind_direction(360.0), "N");
        assert_eq!(wind_direction(200.0), "SSW");
        assert_eq!(wind_direction(202.5), "SSW");
        assert_eq!(wind_direction(191.25), "SSW");
        assert_eq!(wind_direction(90.0), "E");
        assert_eq!(wind_direction(281.25), "WNW");
    }

    #[test]
    fn test_pressure_conversion() {
        assert_eq!(hpa_to_inhg(1013.0), 29.91);
        assert_eq!(normalize_pressure(1013.4, Units::Metric), 1013.0);
        assert_eq!(normalize_pressure(1013.0, Units::Imperial), 29.91);
    }

    #[test]
    fn test_days_grouped_by_local_date() {
        let d1 = date(2026, 7, 1);
        // 23:00 UTC on day 1 is 01:00 on day 2 at UTC+2.
        let samples = vec![
            sample(ts(d1, 9), 20.0, 0.0, "a"),
            sample(ts(d1, 23), 15.0, 0.0, "b"),
        ];

        let days = bucket_forecast(&samples, 2 * 3600, d1, Units::Metric);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2026-07-01");
        assert_eq!(days[0].day_name, "Wednesday");
        assert_eq!(days[1].date, "2026-07-02");
        assert_eq!(days[1].high_temp, 15.0);
    }

    #[test]
    fn test_past_days_dropped_and_capped_at_five() {
        let start = date(2026, 7, 1);
        let today = date(2026, 7, 2);
        let samples: Vec<_> = (0..7)
            .map(|i| sample(ts(start + chrono::Days::new(i), 12), 20.0, 0.0, "x"))
            .collect();

        let days = bucket_forecast(&samples, 0, today, Units::Metric);
        assert_eq!(days.len(), MAX_FORECAST_DAYS);
        assert_eq!(days[0].date, "2026-07-02");
        assert!(days
            .iter()
            .all(|d| NaiveDate::parse_from_str(&d.date, "%Y-%m-%d").unwrap() >= today));
    }

    #[test]
    fn test_representative_sample_prefers_midday() {
        let d = date(2026, 7, 1);
        let samples = vec![
            sample(ts(d, 0), 10.0, 0.1, "night"),
            sample(ts(d, 6), 12.0, 0.2, "morning"),
            sample(ts(d, 12), 25.0, 0.456, "noon"),
            sample(ts(d, 18), 18.0, 0.0, "evening"),
        ];

        let days = bucket_forecast(&samples, 0, d, Units::Imperial);
        let day = &days[0];
        assert_eq!(day.condition, "noon");
        assert_eq!(day.precipitation, 46);
        assert_eq!(day.high_temp, 25.0);
        assert_eq!(day.low_temp, 10.0);
        assert_eq!(day.wind_direction, "SSW");
        assert_eq!(day.pressure, 29.91);
    }

    #[test]
    fn test_representative_sample_falls_back_to_middle() {
        let d = date(2026, 7, 1);
        let samples = vec![
            sample(ts(d, 15), 20.0, 0.0, "first"),
            sample(ts(d, 18), 18.0, 0.0, "middle"),
            sample(ts(d, 21), 16.0, 0.0, "last"),
        ];

        let days = bucket_forecast(&samples, 0, d, Units::Metric);
        assert_eq!(days[0].condition, "middle");
    }
}
