use std::fmt;

/// A monitored host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Host {
    pub id: i64,
    pub name: String,
    /// Seconds between uptime checks.
    pub test_interval: u32,
    pub enabled: bool,
}

/// An HTTP sensor attached to a host. `id` is the host-sensor id (`hsid`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SensorHttp {
    pub id: i64,
    pub host_id: i64,
    pub url: String,
    pub nice_name: String,
    pub enabled: bool,
    pub timeout: i64,
    pub response_code: String,
    pub verify_ssl_cert: bool,
    pub search_headers: bool,
    pub expected_text: String,
    pub unwanted_text: String,
    pub ssl_validity: i64,
    pub cookies: String,
    pub post_params: String,
    pub custom_request_headers: String,
    pub user_agent: String,
    pub force_resolve: String,
}

/// Payload for creating an HTTP sensor. Empty strings and non-positive
/// numbers are left out of the request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewSensorHttp {
    pub host_id: i64,
    pub url: String,
    pub nice_name: String,
    pub timeout: i64,
    pub response_code: String,
    pub verify_ssl_cert: bool,
    pub search_headers: bool,
    pub expected_text: String,
    pub unwanted_text: String,
    pub ssl_validity: i64,
    pub cookies: String,
    pub post_params: String,
    pub custom_request_headers: String,
    pub user_agent: String,
    pub force_resolve: String,
}

impl NewSensorHttp {
    pub fn new(host_id: i64, url: impl Into<String>) -> Self {
        Self {
            host_id,
            url: url.into(),
            ..Self::default()
        }
    }
}

/// A recurring window during which alerts for a host are suppressed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduledDowntimePeriod {
    pub id: i64,
    pub host_id: i64,
    /// Start time of day, `HH:MM`.
    pub start: String,
    /// End time of day, `HH:MM`.
    pub end: String,
    pub timezone: String,
    /// `ONCEONLY`, `DAILY`, `WEEKLY` or `MONTHLY`.
    pub recurrence: String,
    /// Date or day selector for non-daily recurrences; empty otherwise.
    pub on: String,
}

/// Schedule fields sent when creating or updating a downtime period.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DowntimeSchedule {
    pub start: String,
    pub end: String,
    pub timezone: String,
    pub recurrence: String,
    pub on: String,
}

/// Sensor type ids as reported by `getHostSensors`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorType {
    Ping,
    Http,
    Unknown,
    Smtp,
    Pop3,
    Imap,
    Ftp,
    Tcp,
    Dns,
}

impl SensorType {
    /// Maps a wire id (`"1"`..`"9"`) to a type; anything else is `Unknown`.
    pub fn from_id(id: &str) -> Self {
        match id.trim() {
            "1" => Self::Ping,
            "2" => Self::Http,
            "4" => Self::Smtp,
            "5" => Self::Pop3,
            "6" => Self::Imap,
            "7" => Self::Ftp,
            "8" => Self::Tcp,
            "9" => Self::Dns,
            _ => Self::Unknown,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Ping => "1",
            Self::Http => "2",
            Self::Unknown => "3",
            Self::Smtp => "4",
            Self::Pop3 => "5",
            Self::Imap => "6",
            Self::Ftp => "7",
            Self::Tcp => "8",
            Self::Dns => "9",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Http => "http",
            Self::Unknown => "unknown",
            Self::Smtp => "smtp",
            Self::Pop3 => "pop3",
            Self::Imap => "imap",
            Self::Ftp => "ftp",
            Self::Tcp => "tcp",
            Self::Dns => "dns",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::SensorType;

    #[test]
    fn sensor_type_ids_round_trip_names() {
        assert_eq!(SensorType::from_id("2"), SensorType::Http);
        assert_eq!(SensorType::from_id("9").name(), "dns");
        assert_eq!(SensorType::Http.id(), "2");
    }

    #[test]
    fn unrecognized_sensor_type_is_unknown() {
        assert_eq!(SensorType::from_id("42"), SensorType::Unknown);
        assert_eq!(SensorType::from_id("").to_string(), "unknown");
    }
}
