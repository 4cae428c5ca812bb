//! Data models for device readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Sensor channels a device can report.
///
/// Closed set: every column name the SQL builders emit comes from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorField {
    // ---
    Battery,
    Temp,
    Attd,
    Pres,
    Methane,
    Lpg,
    Smoke,
    PoisonousGas,
}

impl SensorField {
    // ---
    pub const ALL: [SensorField; 8] = [
        SensorField::Battery,
        SensorField::Temp,
        SensorField::Attd,
        SensorField::Pres,
        SensorField::Methane,
        SensorField::Lpg,
        SensorField::Smoke,
        SensorField::PoisonousGas,
    ];

    /// Column in the append-only `sensor_data` table.
    pub fn reading_column(self) -> &'static str {
        match self {
            SensorField::Battery => "battery",
            SensorField::Temp => "temp",
            SensorField::Attd => "attd",
            SensorField::Pres => "pres",
            SensorField::Methane => "methane",
            SensorField::Lpg => "lpg",
            SensorField::Smoke => "smoke",
            SensorField::PoisonousGas => "poisonous_gas_ppm",
        }
    }

    /// Current-value column on the `device` row.
    pub fn device_column(self) -> &'static str {
        match self {
            SensorField::Battery => "cur_battery",
            SensorField::Temp => "cur_temp",
            SensorField::Attd => "cur_attd",
            SensorField::Pres => "cur_pres",
            SensorField::Methane => "cur_methane",
            SensorField::Lpg => "cur_lpg",
            SensorField::Smoke => "cur_smoke",
            SensorField::PoisonousGas => "cur_poisonous_gas_ppm",
        }
    }
}

/// Sensor values posted by a device as the `SensorsJson` form field.
///
/// Every channel is optional; `null` and a missing key both mean "not sent".
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorValues {
    // ---
    pub cur_battery: Option<f64>,
    pub cur_temp: Option<f64>,
    pub cur_attd: Option<f64>,
    pub cur_pres: Option<f64>,
    pub cur_methane: Option<f64>,
    #[serde(rename = "CurLPG")]
    pub cur_lpg: Option<f64>,
    pub cur_smoke: Option<f64>,
    #[serde(rename = "CurPoisonousGasPPM")]
    pub cur_poisonous_gas_ppm: Option<f64>,
}

impl SensorValues {
    // ---
    pub fn get(&self, field: SensorField) -> Option<f64> {
        match field {
            SensorField::Battery => self.cur_battery,
            SensorField::Temp => self.cur_temp,
            SensorField::Attd => self.cur_attd,
            SensorField::Pres => self.cur_pres,
            SensorField::Methane => self.cur_methane,
            SensorField::Lpg => self.cur_lpg,
            SensorField::Smoke => self.cur_smoke,
            SensorField::PoisonousGas => self.cur_poisonous_gas_ppm,
        }
    }

    /// Channels that carry a value, in [`SensorField::ALL`] order.
    ///
    /// With `zero_means_absent` set, an explicit `0` is dropped as well, which is
    /// how older firmware signals an unused channel.
    pub fn provided(&self, zero_means_absent: bool) -> Vec<(SensorField, f64)> {
        // ---
        SensorField::ALL
            .iter()
            .filter_map(|&field| self.get(field).map(|v| (field, v)))
            .filter(|&(_, v)| !(zero_means_absent && v == 0.0))
            .collect()
    }
}

/// One row of device history as returned by `/GetDeviceHistoryStatus`.
///
/// Field names match what deployed dashboards already parse, `Cttd` included.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "DevID")]
    pub dev_id: String,
    #[serde(rename = "Battery")]
    pub battery: Option<f64>,
    #[serde(rename = "Temp")]
    pub temp: Option<f64>,
    #[serde(rename = "Cttd")]
    pub attd: Option<f64>,
    #[serde(rename = "Pres")]
    pub pres: Option<f64>,
    #[serde(rename = "UpdateTime")]
    pub recorded_time: DateTime<Utc>,
    #[serde(rename = "Methane")]
    pub methane: Option<f64>,
    #[serde(rename = "LPG")]
    pub lpg: Option<f64>,
    #[serde(rename = "Smoke")]
    pub smoke: Option<f64>,
    #[serde(rename = "Poisonous_Gas")]
    pub poisonous_gas_ppm: Option<f64>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_partial_payload() {
        // ---
        let values: SensorValues =
            serde_json::from_str(r#"{"CurBattery": 80, "CurTemp": 21.5}"#).unwrap();

        assert_eq!(values.cur_battery, Some(80.0));
        assert_eq!(values.cur_temp, Some(21.5));
        assert_eq!(values.cur_pres, None);
        assert_eq!(
            values.provided(false),
            vec![(SensorField::Battery, 80.0), (SensorField::Temp, 21.5)]
        );
    }

    #[test]
    fn test_parse_gas_channels() {
        // ---
        let values: SensorValues = serde_json::from_str(
            r#"{"CurMethane": 1.5, "CurLPG": 2.5, "CurSmoke": 3.5, "CurPoisonousGasPPM": 4.5}"#,
        )
        .unwrap();

        assert_eq!(
            values.provided(false),
            vec![
                (SensorField::Methane, 1.5),
                (SensorField::Lpg, 2.5),
                (SensorField::Smoke, 3.5),
                (SensorField::PoisonousGas, 4.5),
            ]
        );
    }

    #[test]
    fn test_unknown_keys_and_nulls_ignored() {
        // ---
        let values: SensorValues = serde_json::from_str(
            r#"{"ID": 123, "DevID": "BE120de2", "CurBattery": null, "CurPres": 1013}"#,
        )
        .unwrap();

        assert_eq!(values.provided(false), vec![(SensorField::Pres, 1013.0)]);
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        // ---
        // Single-quoted keys, as sent by some Python clients
        assert!(serde_json::from_str::<SensorValues>("{'CurBattery': 100}").is_err());
        assert!(serde_json::from_str::<SensorValues>(r#"{"CurTemp": "warm"}"#).is_err());
        assert!(serde_json::from_str::<SensorValues>("[1, 2]").is_err());
    }

    #[test]
    fn test_zero_absent_only_when_configured() {
        // ---
        let values: SensorValues =
            serde_json::from_str(r#"{"CurBattery": 0, "CurTemp": 0.0, "CurPres": 990}"#).unwrap();

        assert_eq!(values.provided(false).len(), 3);
        assert_eq!(values.provided(true), vec![(SensorField::Pres, 990.0)]);

        let all_zero: SensorValues =
            serde_json::from_str(r#"{"CurBattery": 0, "CurTemp": 0}"#).unwrap();
        assert!(all_zero.provided(true).is_empty());
        assert!(SensorValues::default().provided(false).is_empty());
    }

    #[test]
    fn test_column_names_distinct() {
        // ---
        for (i, a) in SensorField::ALL.iter().enumerate() {
            for b in &SensorField::ALL[i + 1..] {
                assert_ne!(a.reading_column(), b.reading_column());
                assert_ne!(a.device_column(), b.device_column());
            }
            assert_eq!(a.device_column(), format!("cur_{}", a.reading_column()));
        }
    }

    #[test]
    fn test_reading_wire_names() {
        // ---
        let reading = Reading {
            id: 7,
            dev_id: "dev-42".to_string(),
            battery: Some(80.0),
            temp: Some(21.5),
            attd: None,
            pres: None,
            recorded_time: Utc.with_ymd_and_hms(2024, 3, 28, 12, 0, 0).unwrap(),
            methane: None,
            lpg: None,
            smoke: None,
            poisonous_gas_ppm: None,
        };

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["ID"], 7);
        assert_eq!(json["DevID"], "dev-42");
        assert_eq!(json["Battery"], 80.0);
        assert_eq!(json["Temp"], 21.5);
        assert!(json["Cttd"].is_null());
        assert!(json["Poisonous_Gas"].is_null());
        assert_eq!(json["UpdateTime"], "2024-03-28T12:00:00Z");
    }
}
