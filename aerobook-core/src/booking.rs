use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{required, CoreError, CoreResult};

/// Inclusive bounds of the numeric booking reference.
pub const REFERENCE_MIN: i64 = 100;
pub const REFERENCE_MAX: i64 = 10_000;

pub fn generate_reference() -> i64 {
    rand::thread_rng().gen_range(REFERENCE_MIN..=REFERENCE_MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerDetails {
    pub title: String,
    pub fname: String,
    pub lname: String,
    pub nationality: String,
    pub gender: String,
}

impl PassengerDetails {
    /// Reads `title{i}`, `fname{i}`, `lname{i}`, `nationality{i}` and
    /// `gender{i}` for every `i` in `0..count`.
    pub fn from_form(form: &HashMap<String, String>, count: u32) -> CoreResult<Vec<Self>> {
        (0..count)
            .map(|i| {
                let field = |name: &str, label: &str| {
                    let value = form.get(&format!("{}{}", name, i)).map(String::as_str).unwrap_or("");
                    required(&format!("Passenger {} {}", i + 1, label), value)
                };

                Ok(PassengerDetails {
                    title: field("title", "title")?,
                    fname: field("fname", "first name")?,
                    lname: field("lname", "last name")?,
                    nationality: field("nationality", "nationality")?,
                    gender: field("gender", "gender")?,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
}

impl ContactDetails {
    pub fn from_form(form: &HashMap<String, String>) -> CoreResult<Self> {
        let email = required("Email", form.get("email").map(String::as_str).unwrap_or(""))?;
        if !email.contains('@') {
            return Err(CoreError::Validation("Email address is not valid.".to_string()));
        }
        let phone = required("Phone", form.get("phone").map(String::as_str).unwrap_or(""))?;
        Ok(Self { email, phone })
    }
}

/// Every plane shares one cabin layout: numbered rows, lettered seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    pub rows: u32,
    pub letters: String,
}

impl Default for SeatLayout {
    fn default() -> Self {
        Self {
            rows: 30,
            letters: "ABCDEF".to_string(),
        }
    }
}

impl SeatLayout {
    pub fn letters(&self) -> Vec<char> {
        self.letters.chars().map(|c| c.to_ascii_uppercase()).collect()
    }
}

/// A seat such as `12C`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatCode(String);

impl SeatCode {
    pub fn parse(raw: &str, layout: &SeatLayout) -> CoreResult<Self> {
        let raw = raw.trim().to_ascii_uppercase();
        let invalid = || CoreError::Validation(format!("Seat {} doesn't exist on this aircraft.", raw));

        let letter = raw.chars().last().ok_or_else(invalid)?;
        let row = raw[..raw.len() - letter.len_utf8()]
            .parse::<u32>()
            .map_err(|_| invalid())?;

        if !(1..=layout.rows).contains(&row) || !layout.letters().contains(&letter) {
            return Err(invalid());
        }

        Ok(Self(format!("{}{}", row, letter)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Meal names are stored capitalized: `VEGAN` and `vegan` both become `Vegan`.
pub fn normalize_meal(raw: &str) -> CoreResult<String> {
    let raw = required("Meal preference", raw)?;
    if !raw.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '-') {
        return Err(CoreError::Validation(format!("Unknown meal preference: {}", raw)));
    }

    let mut chars = raw.chars();
    Ok(match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    })
}

/// Departing flight plus the optional return flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Itinerary {
    pub depart: i64,
    pub ret: Option<i64>,
}

impl Itinerary {
    pub fn flight_nums(&self) -> Vec<i64> {
        std::iter::once(self.depart).chain(self.ret).collect()
    }
}

/// Everything the wizard collected, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub itinerary: Itinerary,
    pub meal: String,
    pub seat: SeatCode,
    pub contact: ContactDetails,
    pub passengers: Vec<PassengerDetails>,
}

/// The pair that grants access to a stored booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRef {
    pub id: i64,
    #[serde(rename = "ref")]
    pub reference: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub id: i64,
    pub depart_flight_num: i64,
    pub return_flight_num: Option<i64>,
    pub meal: String,
    pub seat: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "ref")]
    pub reference: i64,
}

impl Booking {
    pub fn itinerary(&self) -> Itinerary {
        Itinerary {
            depart: self.depart_flight_num,
            ret: self.return_flight_num,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passenger {
    pub id: i64,
    pub title: String,
    pub fname: String,
    pub lname: String,
    pub nationality: String,
    pub gender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
}

/// Changes allowed from the manage page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingUpdate {
    pub meal: String,
    pub contact: ContactDetails,
    /// `(passenger id, first name, last name)`
    pub names: Vec<(i64, String, String)>,
}

impl BookingUpdate {
    /// Passenger names come from `fname{id}` / `lname{id}`. A passenger with
    /// neither field present keeps the stored name.
    pub fn from_form(form: &HashMap<String, String>, passengers: &[Passenger]) -> CoreResult<Self> {
        let meal = normalize_meal(form.get("meal").map(String::as_str).unwrap_or(""))?;
        let contact = ContactDetails::from_form(form)?;

        let mut names = Vec::with_capacity(passengers.len());
        for p in passengers {
            let fname = form.get(&format!("fname{}", p.id));
            let lname = form.get(&format!("lname{}", p.id));
            if fname.is_none() && lname.is_none() {
                continue;
            }
            let fname = required("First name", fname.map(String::as_str).unwrap_or(&p.fname))?;
            let lname = required("Last name", lname.map(String::as_str).unwrap_or(&p.lname))?;
            names.push((p.id, fname, lname));
        }

        Ok(Self { meal, contact, names })
    }
}
