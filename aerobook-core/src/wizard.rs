use serde::{Deserialize, Serialize};

use crate::booking::{ContactDetails, Itinerary, NewBooking, PassengerDetails, SeatCode};
use crate::search::SearchCriteria;

/// How far a visitor has progressed through the booking pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardStage {
    SearchSet,
    DepartureChosen,
    ReturnChosen,
    DetailsSet,
    SeatChosen,
    MealChosen,
}

/// Where the visitor goes after picking a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    ReturnFlight,
    PersonalDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Missing booking step: {0}")]
    MissingStep(&'static str),

    #[error("Expected {expected} passengers but received {received}")]
    PassengerCount { expected: u32, received: usize },
}

/// Booking selections carried in the visitor's session between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub criteria: SearchCriteria,
    pub depart_flight: Option<i64>,
    pub return_flight: Option<i64>,
    #[serde(default)]
    pub passengers: Vec<PassengerDetails>,
    pub contact: Option<ContactDetails>,
    pub seat: Option<SeatCode>,
    pub meal: Option<String>,
}

impl WizardState {
    /// A new search always starts from a clean slate.
    pub fn start(criteria: SearchCriteria) -> Self {
        Self {
            criteria,
            depart_flight: None,
            return_flight: None,
            passengers: Vec::new(),
            contact: None,
            seat: None,
            meal: None,
        }
    }

    pub fn stage(&self) -> WizardStage {
        if self.meal.is_some() {
            WizardStage::MealChosen
        } else if self.seat.is_some() {
            WizardStage::SeatChosen
        } else if self.contact.is_some() {
            WizardStage::DetailsSet
        } else if self.return_flight.is_some() {
            WizardStage::ReturnChosen
        } else if self.depart_flight.is_some() {
            WizardStage::DepartureChosen
        } else {
            WizardStage::SearchSet
        }
    }

    /// The first pick is the departure. On a round trip the next pick is the
    /// return flight; picking again replaces it. A one-way trip replaces the
    /// departure.
    pub fn choose_flight(&mut self, num: i64) -> NextStep {
        match self.depart_flight {
            Some(_) if self.criteria.is_round_trip() => {
                self.return_flight = Some(num);
                NextStep::PersonalDetails
            }
            Some(_) => {
                self.depart_flight = Some(num);
                NextStep::PersonalDetails
            }
            None => {
                self.depart_flight = Some(num);
                if self.criteria.is_round_trip() {
                    NextStep::ReturnFlight
                } else {
                    NextStep::PersonalDetails
                }
            }
        }
    }

    pub fn itinerary(&self) -> Result<Itinerary, WizardError> {
        let depart = self
            .depart_flight
            .ok_or(WizardError::MissingStep("departing flight"))?;

        let ret = if self.criteria.is_round_trip() {
            Some(self.return_flight.ok_or(WizardError::MissingStep("return flight"))?)
        } else {
            None
        };

        Ok(Itinerary { depart, ret })
    }

    pub fn set_details(
        &mut self,
        passengers: Vec<PassengerDetails>,
        contact: ContactDetails,
    ) -> Result<(), WizardError> {
        self.itinerary()?;

        if passengers.len() != self.criteria.passenger_count as usize {
            return Err(WizardError::PassengerCount {
                expected: self.criteria.passenger_count,
                received: passengers.len(),
            });
        }

        self.passengers = passengers;
        self.contact = Some(contact);
        Ok(())
    }

    pub fn choose_seat(&mut self, seat: SeatCode) -> Result<(), WizardError> {
        if self.contact.is_none() {
            return Err(WizardError::MissingStep("passenger details"));
        }
        self.seat = Some(seat);
        Ok(())
    }

    pub fn choose_meal(&mut self, meal: String) -> Result<(), WizardError> {
        if self.seat.is_none() {
            return Err(WizardError::MissingStep("seat"));
        }
        self.meal = Some(meal);
        Ok(())
    }

    /// Assembles the booking once every step is complete.
    pub fn checkout(&self) -> Result<NewBooking, WizardError> {
        let itinerary = self.itinerary()?;
        let contact = self
            .contact
            .clone()
            .ok_or(WizardError::MissingStep("passenger details"))?;
        let seat = self.seat.clone().ok_or(WizardError::MissingStep("seat"))?;
        let meal = self.meal.clone().ok_or(WizardError::MissingStep("meal"))?;

        Ok(NewBooking {
            itinerary,
            meal,
            seat,
            contact,
            passengers: self.passengers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::SeatLayout;
    use crate::flight::FareClass;
    use chrono::NaiveDate;

    fn criteria(round_trip: bool, passengers: u32) -> SearchCriteria {
        SearchCriteria {
            city_from: "Lisbon".into(),
            city_to: "Dublin".into(),
            depart_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            return_date: round_trip.then(|| NaiveDate::from_ymd_opt(2025, 5, 8).unwrap()),
            fclass: FareClass::Economy,
            passenger_count: passengers,
        }
    }

    fn passenger(name: &str) -> PassengerDetails {
        PassengerDetails {
            title: "Dr".into(),
            fname: name.into(),
            lname: "Smith".into(),
            nationality: "Irish".into(),
            gender: "Female".into(),
        }
    }

    fn contact() -> ContactDetails {
        ContactDetails {
            email: "smith@example.ie".into(),
            phone: "0851234567".into(),
        }
    }

    fn seat(code: &str) -> SeatCode {
        SeatCode::parse(code, &SeatLayout::default()).unwrap()
    }

    #[test]
    fn test_round_trip_lifecycle() {
        let mut wizard = WizardState::start(criteria(true, 1));
        assert_eq!(wizard.stage(), WizardStage::SearchSet);

        assert_eq!(wizard.choose_flight(3), NextStep::ReturnFlight);
        assert_eq!(wizard.stage(), WizardStage::DepartureChosen);

        assert_eq!(wizard.choose_flight(8), NextStep::PersonalDetails);
        assert_eq!(wizard.stage(), WizardStage::ReturnChosen);

        wizard.set_details(vec![passenger("Jo")], contact()).unwrap();
        assert_eq!(wizard.stage(), WizardStage::DetailsSet);

        wizard.choose_seat(seat("4B")).unwrap();
        assert_eq!(wizard.stage(), WizardStage::SeatChosen);

        wizard.choose_meal("Vegetarian".into()).unwrap();
        assert_eq!(wizard.stage(), WizardStage::MealChosen);

        let booking = wizard.checkout().unwrap();
        assert_eq!(booking.itinerary, Itinerary { depart: 3, ret: Some(8) });
        assert_eq!(booking.seat.as_str(), "4B");
        assert_eq!(booking.passengers, vec![passenger("Jo")]);
    }

    #[test]
    fn test_one_way_skips_return_flight() {
        let mut wizard = WizardState::start(criteria(false, 1));
        assert_eq!(wizard.choose_flight(3), NextStep::PersonalDetails);
        wizard.set_details(vec![passenger("Jo")], contact()).unwrap();
        wizard.choose_seat(seat("1A")).unwrap();
        wizard.choose_meal("Standard".into()).unwrap();
        assert_eq!(wizard.checkout().unwrap().itinerary.ret, None);
    }

    #[test]
    fn test_one_way_repick_replaces_departure() {
        let mut wizard = WizardState::start(criteria(false, 1));
        wizard.choose_flight(3);
        wizard.choose_flight(5);
        assert_eq!(wizard.depart_flight, Some(5));
        assert_eq!(wizard.return_flight, None);
    }

    #[test]
    fn test_details_require_return_flight_on_round_trip() {
        let mut wizard = WizardState::start(criteria(true, 1));
        wizard.choose_flight(3);
        assert_eq!(
            wizard.set_details(vec![passenger("Jo")], contact()),
            Err(WizardError::MissingStep("return flight"))
        );
    }

    #[test]
    fn test_skipping_ahead_is_rejected() {
        let mut wizard = WizardState::start(criteria(false, 1));
        assert_eq!(wizard.choose_seat(seat("1A")), Err(WizardError::MissingStep("passenger details")));
        assert_eq!(wizard.choose_meal("Vegan".into()), Err(WizardError::MissingStep("seat")));
        assert_eq!(wizard.checkout(), Err(WizardError::MissingStep("departing flight")));
    }

    #[test]
    fn test_passenger_count_must_match_search() {
        let mut wizard = WizardState::start(criteria(false, 2));
        wizard.choose_flight(1);
        assert_eq!(
            wizard.set_details(vec![passenger("Jo")], contact()),
            Err(WizardError::PassengerCount { expected: 2, received: 1 })
        );
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut wizard = WizardState::start(criteria(true, 1));
        wizard.choose_flight(3);
        let json = serde_json::to_string(&wizard).unwrap();
        let restored: WizardState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, wizard);
    }
}
