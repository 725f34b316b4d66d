use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Binance kline interval codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KlineInterval {
    OneMinute,
    ThreeMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
    SixHours,
    EightHours,
    TwelveHours,
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
}

impl KlineInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            KlineInterval::OneMinute => "1m",
            KlineInterval::ThreeMinutes => "3m",
            KlineInterval::FiveMinutes => "5m",
            KlineInterval::FifteenMinutes => "15m",
            KlineInterval::ThirtyMinutes => "30m",
            KlineInterval::OneHour => "1h",
            KlineInterval::TwoHours => "2h",
            KlineInterval::FourHours => "4h",
            KlineInterval::SixHours => "6h",
            KlineInterval::EightHours => "8h",
            KlineInterval::TwelveHours => "12h",
            KlineInterval::OneDay => "1d",
            KlineInterval::ThreeDays => "3d",
            KlineInterval::OneWeek => "1w",
            KlineInterval::OneMonth => "1M",
        }
    }

    /// Nominal length of one candle (a month counts as 30 days)
    pub fn duration(&self) -> Duration {
        match self {
            KlineInterval::OneMinute => Duration::minutes(1),
            KlineInterval::ThreeMinutes => Duration::minutes(3),
            KlineInterval::FiveMinutes => Duration::minutes(5),
            KlineInterval::FifteenMinutes => Duration::minutes(15),
            KlineInterval::ThirtyMinutes => Duration::minutes(30),
            KlineInterval::OneHour => Duration::hours(1),
            KlineInterval::TwoHours => Duration::hours(2),
            KlineInterval::FourHours => Duration::hours(4),
            KlineInterval::SixHours => Duration::hours(6),
            KlineInterval::EightHours => Duration::hours(8),
            KlineInterval::TwelveHours => Duration::hours(12),
            KlineInterval::OneDay => Duration::days(1),
            KlineInterval::ThreeDays => Duration::days(3),
            KlineInterval::OneWeek => Duration::weeks(1),
            KlineInterval::OneMonth => Duration::days(30),
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KlineInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case
        let interval = match s.trim() {
            "1m" => KlineInterval::OneMinute,
            "3m" => KlineInterval::ThreeMinutes,
            "5m" => KlineInterval::FiveMinutes,
            "15m" => KlineInterval::FifteenMinutes,
            "30m" => KlineInterval::ThirtyMinutes,
            "1h" => KlineInterval::OneHour,
            "2h" => KlineInterval::TwoHours,
            "4h" => KlineInterval::FourHours,
            "6h" => KlineInterval::SixHours,
            "8h" => KlineInterval::EightHours,
            "12h" => KlineInterval::TwelveHours,
            "1d" => KlineInterval::OneDay,
            "3d" => KlineInterval::ThreeDays,
            "1w" => KlineInterval::OneWeek,
            "1M" => KlineInterval::OneMonth,
            other => return Err(format!("unsupported kline interval '{}'", other)),
        };
        Ok(interval)
    }
}

impl TryFrom<String> for KlineInterval {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KlineInterval> for String {
    fn from(interval: KlineInterval) -> Self {
        interval.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// How far back to fetch history, e.g. "1 month ago UTC"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lookback {
    pub amount: u32,
    pub unit: LookbackUnit,
}

impl Lookback {
    pub fn new(amount: u32, unit: LookbackUnit) -> Self {
        Self { amount, unit }
    }

    /// Start of the window that ends at `now`. Months and years are calendar based.
    ///
    /// Windows reaching past the earliest representable time clamp to it.
    pub fn start_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let amount = i64::from(self.amount);
        let start = match self.unit {
            LookbackUnit::Minute => Duration::try_minutes(amount).and_then(|d| now.checked_sub_signed(d)),
            LookbackUnit::Hour => Duration::try_hours(amount).and_then(|d| now.checked_sub_signed(d)),
            LookbackUnit::Day => Duration::try_days(amount).and_then(|d| now.checked_sub_signed(d)),
            LookbackUnit::Week => Duration::try_weeks(amount).and_then(|d| now.checked_sub_signed(d)),
            LookbackUnit::Month => now.checked_sub_months(Months::new(self.amount)),
            LookbackUnit::Year => self
                .amount
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
        };
        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            LookbackUnit::Minute => "minute",
            LookbackUnit::Hour => "hour",
            LookbackUnit::Day => "day",
            LookbackUnit::Week => "week",
            LookbackUnit::Month => "month",
            LookbackUnit::Year => "year",
        };
        let plural = if self.amount == 1 { "" } else { "s" };
        write!(f, "{} {}{} ago UTC", self.amount, unit, plural)
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let mut parts = lowered.split_whitespace();

        let amount: u32 = parts
            .next()
            .ok_or_else(|| "empty lookback description".to_string())?
            .parse()
            .map_err(|_| format!("lookback '{}' must start with a whole number", s))?;
        if amount == 0 {
            return Err("lookback amount must be positive".to_string());
        }

        let unit_word = parts
            .next()
            .ok_or_else(|| format!("lookback '{}' is missing a unit", s))?;
        let unit = match unit_word.trim_end_matches('s') {
            "m" | "min" | "minute" => LookbackUnit::Minute,
            "h" | "hour" => LookbackUnit::Hour,
            "d" | "day" => LookbackUnit::Day,
            "w" | "week" => LookbackUnit::Week,
            "month" => LookbackUnit::Month,
            "y" | "year" => LookbackUnit::Year,
            other => return Err(format!("unknown lookback unit '{}'", other)),
        };

        for rest in parts {
            if rest != "ago" && rest != "utc" {
                return Err(format!("unexpected word '{}' in lookback '{}'", rest, s));
            }
        }

        Ok(Lookback::new(amount, unit))
    }
}

impl TryFrom<String> for Lookback {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lookback> for String {
    fn from(lookback: Lookback) -> Self {
        lookback.to_string()
    }
}
