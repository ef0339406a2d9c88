use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{required, CoreError, CoreResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Highest fare an admin may enter for one passenger on one leg.
pub const MAX_PRICE: i64 = 1_000_000;

/// Cabin tier a flight is sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FareClass {
    Economy,
    #[serde(rename = "Premium Economy")]
    PremiumEconomy,
    Business,
    First,
}

impl FareClass {
    pub const ALL: [FareClass; 4] = [
        FareClass::Economy,
        FareClass::PremiumEconomy,
        FareClass::Business,
        FareClass::First,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FareClass::Economy => "Economy",
            FareClass::PremiumEconomy => "Premium Economy",
            FareClass::Business => "Business",
            FareClass::First => "First",
        }
    }
}

impl fmt::Display for FareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FareClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match normalized.as_str() {
            "economy" => Ok(FareClass::Economy),
            "premium economy" | "premium" => Ok(FareClass::PremiumEconomy),
            "business" => Ok(FareClass::Business),
            "first" => Ok(FareClass::First),
            _ => Err(CoreError::Validation(format!("Unknown fare class: {}", s.trim()))),
        }
    }
}

/// A row of the flight inventory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flight {
    pub num: i64,
    pub city_from: String,
    pub city_to: String,
    pub depart_date: NaiveDate,
    pub arrival_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub depart_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub arrival_time: NaiveTime,
    pub duration: String,
    pub fclass: FareClass,
    pub price: i64,
}

/// Validated input for creating or replacing a flight. The duration is
/// always derived, never taken from the form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlight {
    pub city_from: String,
    pub city_to: String,
    pub depart_date: NaiveDate,
    pub arrival_date: NaiveDate,
    pub depart_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub fclass: FareClass,
    pub price: i64,
}

impl NewFlight {
    pub fn departs_at(&self) -> NaiveDateTime {
        self.depart_date.and_time(self.depart_time)
    }

    pub fn arrives_at(&self) -> NaiveDateTime {
        self.arrival_date.and_time(self.arrival_time)
    }

    pub fn duration(&self) -> String {
        format_duration(self.arrives_at() - self.departs_at())
    }
}

/// Admin create/edit form, field names as the panel posts them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlightForm {
    pub city_from: String,
    pub city_to: String,
    pub depart_date: String,
    pub arrival_date: String,
    pub depart_time: String,
    pub arrival_time: String,
    pub fclass: String,
    pub price: String,
}

impl FlightForm {
    pub fn validate(&self) -> CoreResult<NewFlight> {
        let city_from = required("From city", &self.city_from)?;
        let city_to = required("To city", &self.city_to)?;
        if city_from.eq_ignore_ascii_case(&city_to) {
            return Err(CoreError::Validation(
                "From and to cities must be different.".to_string(),
            ));
        }

        let depart_date = parse_date("departure date", &self.depart_date)?;
        let arrival_date = parse_date("arrival date", &self.arrival_date)?;
        if depart_date > arrival_date {
            return Err(CoreError::Validation(
                "Depart date must come before arrival date.".to_string(),
            ));
        }

        let depart_time = parse_time("departure time", &self.depart_time)?;
        let arrival_time = parse_time("arrival time", &self.arrival_time)?;
        if arrival_date.and_time(arrival_time) < depart_date.and_time(depart_time) {
            return Err(CoreError::Validation(
                "Arrival time must come after departure time.".to_string(),
            ));
        }

        let fclass = self.fclass.parse::<FareClass>()?;

        let price = self
            .price
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|p| (0..=MAX_PRICE).contains(p))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Price must be a whole number between 0 and {}.",
                    MAX_PRICE
                ))
            })?;

        Ok(NewFlight {
            city_from,
            city_to,
            depart_date,
            arrival_date,
            depart_time,
            arrival_time,
            fclass,
            price,
        })
    }
}

pub fn parse_date(label: &str, value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| CoreError::Validation(format!("Invalid {}: expected YYYY-MM-DD.", label)))
}

pub fn parse_time(label: &str, value: &str) -> CoreResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CoreError::Validation(format!("Invalid {}: expected HH:MM.", label)))
}

/// Renders a span as `H:MM:SS`, prefixed with `N day,`/`N days,` once it
/// reaches a full day.
pub fn format_duration(span: chrono::Duration) -> String {
    let total = span.num_seconds().max(0);
    let days = total / 86_400;
    let rest = total % 86_400;
    let clock = format!("{}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);

    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(super::TIME_FORMAT))
    }
}
