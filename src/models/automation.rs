use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a saved search is re-executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutomationInterval {
    #[serde(rename = "24h")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
}

impl AutomationInterval {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "24h",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Monthly is a fixed 30 days.
    #[must_use]
    pub fn duration(self) -> chrono::Duration {
        match self {
            Self::Daily => chrono::Duration::hours(24),
            Self::Weekly => chrono::Duration::weeks(1),
            Self::Monthly => chrono::Duration::days(30),
        }
    }
}

impl fmt::Display for AutomationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutomationInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "24h" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!(
                "Invalid interval '{other}'. Expected one of: 24h, weekly, monthly"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intervals() {
        assert_eq!("24h".parse(), Ok(AutomationInterval::Daily));
        assert_eq!("Weekly".parse(), Ok(AutomationInterval::Weekly));
        assert_eq!(" monthly ".parse(), Ok(AutomationInterval::Monthly));
        assert!("hourly".parse::<AutomationInterval>().is_err());
    }

    #[test]
    fn test_durations() {
        assert_eq!(AutomationInterval::Daily.duration().num_hours(), 24);
        assert_eq!(AutomationInterval::Weekly.duration().num_days(), 7);
        assert_eq!(AutomationInterval::Monthly.duration().num_days(), 30);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&AutomationInterval::Daily).unwrap();
        assert_eq!(json, "\"24h\"");
        let parsed: AutomationInterval = serde_json::from_str("\"monthly\"").unwrap();
        assert_eq!(parsed, AutomationInterval::Monthly);
    }
}
