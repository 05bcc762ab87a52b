//! Integration test: the published product table.

use std::collections::HashSet;

use ecmwf_kerchunk::combinations::{steps, REFERENCE_TIMES, STREAMS, TYPES};
use ecmwf_kerchunk::{
    get_combinations, group_by_asset, merge_plan, Combination, KerchunkError, Step,
};

fn grib2() -> &'static [Combination] {
    get_combinations("grib2").unwrap()
}

fn count(reference_time: &str) -> usize {
    grib2()
        .iter()
        .filter(|c| c.reference_time == reference_time)
        .count()
}

// ============================================================================
// Table contents
// ============================================================================

#[test]
fn test_table_size() {
    assert_eq!(count("00"), 85 + 2 + 85 + 2 + 65 + 65 + 7);
    assert_eq!(count("12"), 85 + 2 + 85 + 2 + 65 + 65);
    assert_eq!(count("06"), 49 + 49 + 31 + 31);
    assert_eq!(count("18"), 49 + 49 + 31 + 31);
    assert_eq!(grib2().len(), 935);
}

#[test]
fn test_every_member_uses_known_vocabulary() {
    let known_steps: HashSet<Step> = steps().into_iter().collect();
    for c in grib2() {
        assert_eq!(c.format, "grib2");
        assert!(REFERENCE_TIMES.contains(&c.reference_time));
        assert!(STREAMS.contains(&c.stream));
        assert!(TYPES.contains(&c.type_));
        assert!(known_steps.contains(&c.step), "{:?}", c);
    }
}

#[test]
fn test_no_duplicates() {
    let unique: HashSet<&Combination> = grib2().iter().collect();
    assert_eq!(unique.len(), grib2().len());
}

#[test]
fn test_monthly_forecasts() {
    let monthly: Vec<&Combination> = grib2().iter().filter(|c| c.stream == "mmsf").collect();
    assert_eq!(monthly.len(), 7);
    assert!(monthly.iter().all(|c| c.reference_time == "00" && c.type_ == "fc"));
    let rendered: Vec<String> = monthly.iter().map(|c| c.step.to_string()).collect();
    assert_eq!(rendered, vec!["1m", "2m", "3m", "4m", "5m", "6m", "7m"]);
}

#[test]
fn test_no_tropical_cyclone_tracks_in_grib2() {
    assert!(grib2().iter().all(|c| c.type_ != "tf"));
}

#[test]
fn test_ensemble_probability_steps() {
    let ep: Vec<String> = grib2()
        .iter()
        .filter(|c| c.reference_time == "12" && c.stream == "waef" && c.type_ == "ep")
        .map(|c| c.step.to_string())
        .collect();
    assert_eq!(ep, vec!["240h", "360h"]);
}

// ============================================================================
// Ordering and memoization
// ============================================================================

#[test]
fn test_repeated_calls_share_the_table() {
    let first = get_combinations("grib2").unwrap();
    let second = get_combinations("grib2").unwrap();
    assert_eq!(first, second);
    assert!(std::ptr::eq(first, second));
}

#[test]
fn test_reference_time_is_outermost() {
    let order: Vec<&str> = group_by_asset(grib2())
        .iter()
        .map(|((_, _, reference_time, _), _)| *reference_time)
        .fold(Vec::new(), |mut acc, rt| {
            if acc.last() != Some(&rt) {
                acc.push(rt);
            }
            acc
        });
    assert_eq!(order, vec!["00", "06", "12", "18"]);
}

#[test]
fn test_asset_groups() {
    let groups = group_by_asset(grib2());
    let keys: Vec<(&str, &str, &str, &str)> =
        groups.iter().take(6).map(|(key, _)| *key).collect();
    assert_eq!(
        keys,
        vec![
            ("grib2", "fc", "00", "oper"),
            ("grib2", "ef", "00", "enfo"),
            ("grib2", "ep", "00", "enfo"),
            ("grib2", "ef", "00", "waef"),
            ("grib2", "ep", "00", "waef"),
            ("grib2", "fc", "00", "mmsf"),
        ]
    );
    assert_eq!(groups.len(), 7 + 4 + 6 + 4);

    for (_, members) in &groups {
        assert!(members.windows(2).all(|w| w[0].step < w[1].step));
    }
}

#[test]
fn test_wave_forecast_steps() {
    let (_, members) = group_by_asset(grib2())
        .into_iter()
        .find(|(key, _)| *key == ("grib2", "fc", "00", "wave"))
        .unwrap();
    assert_eq!(members.len(), 65);
    assert_eq!(members[0].step, Step::hours(0));
    assert_eq!(members[47].step, Step::hours(141));
    assert_eq!(members[48].step, Step::hours(144));
    assert_eq!(members[64].step, Step::hours(240));
}

#[test]
fn test_bufr_is_not_supported() {
    assert_eq!(
        get_combinations("bufr"),
        Err(KerchunkError::UnsupportedFormat("bufr".to_string()))
    );
    assert!(get_combinations("netcdf").is_err());
}

// ============================================================================
// Merge rules line up with the table
// ============================================================================

#[test]
fn test_merged_products_are_published() {
    let published: HashSet<(&str, &str)> = grib2().iter().map(|c| (c.stream, c.type_)).collect();
    for (stream, type_) in [
        ("oper", "fc"),
        ("enfo", "ep"),
        ("waef", "ef"),
        ("waef", "ep"),
        ("scda", "fc"),
        ("scwv", "fc"),
        ("wave", "fc"),
    ] {
        assert!(merge_plan(stream, type_).is_some(), "{} {}", stream, type_);
        assert!(published.contains(&(stream, type_)), "{} {}", stream, type_);
    }
}
