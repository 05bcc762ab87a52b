//! Reference mapping fixtures modelled on an ECMWF wave forecast scan.
//!
//! The values mirror what scanning `20220222000000-120h-wave-fc.grib2` and
//! merging its messages along `time` produces: inline coordinate axes, a few
//! scalar chunks (some already base64, some raw) and byte ranges for the
//! five wave variables.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::generators::{ecmwf_latitudes, ecmwf_longitudes, f64_le_bytes, i64_le_bytes};

/// Source file referenced by the byte ranges.
pub const WAVE_URL: &str =
    "https://ai4edataeuwest.blob.core.windows.net/ecmwf/20220222/00z/0p4-beta/wave/20220222000000-120h-wave-fc.grib2";

/// Wave variables stored as byte ranges.
pub const WAVE_VARIABLES: [&str; 5] = ["mp2", "mwd", "mwp", "swh", "pp1d"];

/// `latitude/0` after range compression.
pub const LATITUDE_RANGE_B64: &str = "base64:AAAAAACAVkCamZmZmZlWwJqZmZmZmdm/";

/// `longitude/0` after range compression.
pub const LONGITUDE_RANGE_B64: &str = "base64:AAAAAACAZsAAAAAAAIBmQJqZmZmZmdk/";

/// `step/0` holding 120 hours, already encoded by the scanner.
pub const STEP_120H_B64: &str = "base64:AAAAAAAAXkA=";

/// 2022-02-22T00:00:00Z
pub const REFERENCE_EPOCH: i64 = 1_645_488_000;

/// Byte range of each wave variable inside [`WAVE_URL`].
pub const WAVE_RANGES: [(&str, u64, u64); 5] = [
    ("mp2", 0, 322850),
    ("mwd", 322850, 342261),
    ("mwp", 665111, 329790),
    ("swh", 994901, 349036),
    ("pp1d", 1343937, 334711),
];

fn inline_b64(bytes: &[u8]) -> String {
    format!("base64:{}", STANDARD.encode(bytes))
}

/// `.zarray` text of a 1-D coordinate as written by the GRIB scanner.
pub fn coordinate_zarray(name: &str, len: usize) -> String {
    format!(
        r#"{{"chunks":[{len}],"compressor":null,"dtype":"<f8","fill_value":null,"filters":[{{"dtype":"float64","id":"grib","var":"{name}"}}],"order":"C","shape":[{len}],"zarr_format":2}}"#
    )
}

/// `.zarray` text of the coordinate once the range filter is declared.
pub fn range_zarray(len: usize) -> String {
    format!(
        r#"{{"chunks":[{len}],"compressor":null,"dtype":"<f8","fill_value":null,"filters":[{{"id": "range"}}],"order":"C","shape":[{len}],"zarr_format":2}}"#
    )
}

fn variable_zarray(name: &str) -> String {
    format!(
        r#"{{"chunks":[1,451,900],"compressor":null,"dtype":"<f8","fill_value":null,"filters":[{{"dtype":"float64","id":"grib","var":"{name}"}}],"order":"C","shape":[1,451,900],"zarr_format":2}}"#
    )
}

const SCALAR_F8_ZARRAY: &str = r#"{"chunks":[1],"compressor":null,"dtype":"<f8","fill_value":null,"filters":null,"order":"C","shape":[1],"zarr_format":2}"#;

const TIME_ZARRAY: &str = "{\n    \"chunks\": [\n        1\n    ],\n    \"compressor\": null,\n    \"dtype\": \"<i8\",\n    \"fill_value\": null,\n    \"filters\": null,\n    \"order\": \"C\",\n    \"shape\": [\n        1\n    ],\n    \"zarr_format\": 2\n}";

/// The merged, not yet compacted, scan of the wave forecast file.
pub fn wave_forecast_refs() -> Map<String, Value> {
    let mut refs = Map::new();
    let mut put = |key: &str, value: Value| {
        refs.insert(key.to_string(), value);
    };

    put(".zgroup", json!(r#"{"zarr_format":2}"#));
    put(
        ".zattrs",
        json!(r#"{"GRIB_centre":"ecmf","GRIB_edition":2,"coordinates":"meanSea latitude longitude step time valid_time"}"#),
    );

    put("latitude/0", json!(inline_b64(&f64_le_bytes(&ecmwf_latitudes()))));
    put("latitude/.zarray", json!(coordinate_zarray("latitude", 451)));
    put(
        "latitude/.zattrs",
        json!(r#"{"_ARRAY_DIMENSIONS":["latitude"],"long_name":"latitude","standard_name":"latitude","units":"degrees_north"}"#),
    );
    put("longitude/0", json!(inline_b64(&f64_le_bytes(&ecmwf_longitudes()))));
    put("longitude/.zarray", json!(coordinate_zarray("longitude", 900)));
    put(
        "longitude/.zattrs",
        json!(r#"{"_ARRAY_DIMENSIONS":["longitude"],"long_name":"longitude","standard_name":"longitude","units":"degrees_east"}"#),
    );

    // The scanner leaves some scalar chunks as raw strings
    put("meanSea/0", json!("\u{0}".repeat(8)));
    put("meanSea/.zarray", json!(SCALAR_F8_ZARRAY));
    put("meanSea/.zattrs", json!(r#"{"_ARRAY_DIMENSIONS":["time"]}"#));

    put("step/0", json!(STEP_120H_B64));
    put("step/.zarray", json!(SCALAR_F8_ZARRAY));
    put(
        "step/.zattrs",
        json!(r#"{"_ARRAY_DIMENSIONS":["time"],"standard_name":"forecast_period","units":"hours"}"#),
    );

    put("time/0", json!(inline_b64(&i64_le_bytes(&[REFERENCE_EPOCH]))));
    put("time/.zarray", json!(TIME_ZARRAY));
    put(
        "valid_time/0",
        json!(inline_b64(&i64_le_bytes(&[REFERENCE_EPOCH + 120 * 3600]))),
    );
    put(
        "valid_time/.zarray",
        json!(SCALAR_F8_ZARRAY.replace("<f8", "<i8")),
    );

    for (name, offset, length) in WAVE_RANGES {
        put(&format!("{}/0.0.0", name), json!([WAVE_URL, offset, length]));
        put(&format!("{}/.zarray", name), json!(variable_zarray(name)));
        put(
            &format!("{}/.zattrs", name),
            json!(format!(
                r#"{{"GRIB_shortName":"{}","_ARRAY_DIMENSIONS":["time","latitude","longitude"]}}"#,
                name
            )),
        );
    }

    refs
}

/// The scan wrapped in the top-level kerchunk document.
pub fn wave_forecast_scan() -> Value {
    json!({
        "version": 1,
        "refs": Value::Object(wave_forecast_refs()),
    })
}

/// [`wave_forecast_scan`] serialized as JSON text.
pub fn wave_forecast_scan_json() -> String {
    wave_forecast_scan().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_shape() {
        let scan = wave_forecast_scan();
        let refs = scan["refs"].as_object().unwrap();

        assert_eq!(scan["version"], 1);
        assert_eq!(refs["mwd/0.0.0"], json!([WAVE_URL, 322850, 342261]));
        assert!(refs["latitude/0"].as_str().unwrap().starts_with("base64:"));
        assert!(!refs["meanSea/0"].as_str().unwrap().starts_with("base64"));
        assert_eq!(refs.len(), 2 + 3 + 3 + 3 + 3 + 2 + 2 + 3 * WAVE_VARIABLES.len());
    }

    #[test]
    fn test_zarray_templates() {
        assert!(coordinate_zarray("latitude", 451).contains(r#""var":"latitude""#));
        assert!(range_zarray(900).contains(r#""filters":[{"id": "range"}]"#));
        assert!(range_zarray(900).ends_with(r#""shape":[900],"zarr_format":2}"#));
    }
}
