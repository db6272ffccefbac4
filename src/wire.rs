use serde::Deserialize;
use serde_json::Value;

use crate::{
    decode::{flex_bool, flex_int, nullable},
    Result, WormlyError,
};

/// Every command responds with `errorcode` (0 = success), an optional
/// `message`, and command-specific fields captured in `payload`.
#[derive(Debug, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default, deserialize_with = "flex_int")]
    pub errorcode: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Turns a nonzero `errorcode` into [`WormlyError::Api`].
    pub fn into_result(self) -> Result<T> {
        if self.errorcode != 0 {
            return Err(WormlyError::Api {
                code: self.errorcode,
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(self.payload)
    }
}

/// Payload of commands that only acknowledge.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Ack {}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct HostCreated {
    #[serde(default, deserialize_with = "flex_int")]
    pub hostid: i64,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct HostStatusList {
    #[serde(default, deserialize_with = "nullable")]
    pub status: Vec<HostStatus>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct HostStatus {
    #[serde(default, deserialize_with = "flex_int")]
    pub hostid: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "flex_bool")]
    pub uptimemonitored: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub healthmonitored: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub uptimeerrors: bool,
    #[serde(default, deserialize_with = "flex_bool")]
    pub healtherrors: bool,
    /// Unix timestamp; `-1` or `0` when the host was never checked.
    #[serde(default, deserialize_with = "flex_int")]
    pub lastuptimecheck: i64,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct SensorCreated {
    #[serde(default, deserialize_with = "flex_int")]
    pub hostsensorid: i64,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct SensorList {
    #[serde(default, deserialize_with = "nullable")]
    pub sensors: Vec<RawSensor>,
}

/// A sensor row from `getHostSensors`. Ids stay raw so that one malformed
/// row does not fail the whole response.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct RawSensor {
    #[serde(default)]
    pub hsid: Value,
    #[serde(default)]
    pub sensorid: Value,
    #[serde(default, deserialize_with = "flex_bool")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub nicename: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct PeriodSaved {
    #[serde(default, deserialize_with = "flex_int")]
    pub periodid: i64,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct PeriodList {
    #[serde(default, deserialize_with = "nullable")]
    pub periods: Vec<RawPeriod>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct RawPeriod {
    #[serde(default, deserialize_with = "flex_int")]
    pub periodid: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub start: String,
    #[serde(default, deserialize_with = "nullable")]
    pub end: String,
    #[serde(default, deserialize_with = "nullable")]
    pub timezone: String,
    #[serde(default, deserialize_with = "nullable")]
    pub recurrence: String,
    #[serde(default, deserialize_with = "nullable")]
    pub on: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Ack, Envelope, HostStatusList, PeriodList};
    use crate::WormlyError;

    #[test]
    fn nonzero_errorcode_is_api_error() {
        let envelope: Envelope<Ack> =
            serde_json::from_value(json!({"errorcode": "12", "message": "Invalid key"}))
                .expect("must decode");
        match envelope.into_result() {
            Err(WormlyError::Api { code, message }) => {
                assert_eq!(code, 12);
                assert_eq!(message, "Invalid key");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn missing_errorcode_means_success() {
        let envelope: Envelope<Ack> = serde_json::from_value(json!({})).expect("must decode");
        assert!(envelope.into_result().is_ok());
    }

    #[test]
    fn period_ids_decode_from_mixed_shapes() {
        let list: Envelope<PeriodList> = serde_json::from_value(json!({
            "errorcode": 0,
            "periods": [
                {"periodid": 11, "start": "01:00", "end": "02:00", "timezone": "UTC", "recurrence": "DAILY"},
                {"periodid": "12", "start": "03:00", "end": "04:00", "timezone": "UTC", "recurrence": "WEEKLY", "on": "mon"},
                {"periodid": 13.0},
                {"periodid": ""}
            ]
        }))
        .expect("must decode");

        let ids: Vec<i64> = list
            .into_result()
            .expect("must succeed")
            .periods
            .iter()
            .map(|period| period.periodid)
            .collect();
        assert_eq!(ids, vec![11, 12, 13, 0]);
    }

    #[test]
    fn bad_period_id_string_fails_decode() {
        let result: Result<Envelope<PeriodList>, _> = serde_json::from_value(json!({
            "errorcode": 0,
            "periods": [{"periodid": "twelve"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn decoding_is_repeatable() {
        let body = r#"{"errorcode":0,"status":[{"hostid":"5","name":"web","uptimemonitored":"1","healthmonitored":false,"lastuptimecheck":null}]}"#;
        let first: Envelope<HostStatusList> = serde_json::from_str(body).expect("must decode");
        let second: Envelope<HostStatusList> = serde_json::from_str(body).expect("must decode");
        assert_eq!(first, second);
        assert_eq!(first.payload.status[0].hostid, 5);
        assert!(first.payload.status[0].uptimemonitored);
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let list: Envelope<HostStatusList> =
            serde_json::from_value(json!({"errorcode": 0, "status": null})).expect("must decode");
        assert!(list.payload.status.is_empty());
    }
}
