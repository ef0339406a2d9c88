use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::flight::{parse_date, FareClass};
use crate::{required, CoreError, CoreResult};

/// Search form on the landing page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchForm {
    pub city_from: String,
    pub city_to: String,
    pub depart_date: String,
    pub return_date: String,
    pub fclass: String,
    #[serde(rename = "passenger_num")]
    pub passenger_num: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub city_from: String,
    pub city_to: String,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub fclass: FareClass,
    pub passenger_count: u32,
}

/// One leg to look up in the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    pub city_from: String,
    pub city_to: String,
    pub date: NaiveDate,
    pub fclass: FareClass,
}

impl SearchForm {
    pub fn validate(&self, max_passengers: u32) -> CoreResult<SearchCriteria> {
        let city_from = required("From city", &self.city_from)?;
        let city_to = required("To city", &self.city_to)?;
        if city_from.eq_ignore_ascii_case(&city_to) {
            return Err(CoreError::Validation(
                "From and to cities must be different.".to_string(),
            ));
        }

        let depart_date = parse_date("departure date", &self.depart_date)?;
        let return_date = match self.return_date.trim() {
            "" => None,
            raw => Some(parse_date("return date", raw)?),
        };
        if matches!(return_date, Some(ret) if ret < depart_date) {
            return Err(CoreError::Validation(
                "Depart date must come before return date.".to_string(),
            ));
        }

        let fclass = self.fclass.parse::<FareClass>()?;

        let passenger_count = self
            .passenger_num
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=max_passengers).contains(n))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Number of passengers must be between 1 and {}.",
                    max_passengers
                ))
            })?;

        Ok(SearchCriteria {
            city_from,
            city_to,
            depart_date,
            return_date,
            fclass,
            passenger_count,
        })
    }
}

impl SearchCriteria {
    pub fn is_round_trip(&self) -> bool {
        self.return_date.is_some()
    }

    pub fn outbound(&self) -> FlightQuery {
        FlightQuery {
            city_from: self.city_from.clone(),
            city_to: self.city_to.clone(),
            date: self.depart_date,
            fclass: self.fclass,
        }
    }

    /// The reversed route on the return date, for round trips only.
    pub fn inbound(&self) -> Option<FlightQuery> {
        self.return_date.map(|date| FlightQuery {
            city_from: self.city_to.clone(),
            city_to: self.city_from.clone(),
            date,
            fclass: self.fclass,
        })
    }
}
