use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Index of a [`Trip`] in its [`crate::timetable::Timetable`].
pub type TripIdx = usize;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: String,
    pub long_name: String,
    /// Arena indices, re-sorted by first departure once all visits are known.
    #[serde(skip)]
    pub trips: Vec<TripIdx>,
    pub stations: Vec<Station>,
}

impl Route {
    pub fn new(id: String, long_name: String) -> Self {
        Self {
            id,
            long_name,
            trips: Vec::new(),
            stations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub route_long_name: String,
    pub branch: String,
    pub direction_id: u8,
    pub stop_id: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub stop_sequence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    #[serde(skip)]
    pub route_id: String,
    pub service_id: String,
    pub direction_id: u8,
    pub headsign: String,
    pub stop_times: Vec<StopTime>,
    #[serde(skip)]
    pub service: Option<Arc<Calendar>>,
}

impl Trip {
    pub fn first_departure(&self) -> Option<NaiveTime> {
        self.stop_times
            .first()
            .map(|stop_time| stop_time.departure_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTime {
    #[serde(skip)]
    pub trip_id: String,
    pub arrival_time: NaiveTime,
    pub departure_time: NaiveTime,
    pub stop_id: String,
    pub stop_sequence: u32,
    #[serde(skip)]
    pub stop: Option<Arc<Stop>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stop {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Calendar {
    pub service_id: String,
    /// Monday first.
    pub service_days: [bool; 7],
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Calendar {
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.service_days[day.num_days_from_monday() as usize]
    }

    pub fn active_days(&self) -> Vec<Weekday> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter(|&day| self.runs_on(day))
        .collect()
    }
}
