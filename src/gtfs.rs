//! Raw rows of the input tables.
//!
//! Columns are matched by header name and kept as strings; numbers, times and
//! dates are parsed by the stage that accepts the row.
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use itertools::Itertools;
use serde::{Deserialize, Deserializer};

use crate::error::ProcessingError;

pub const GTFS_DATE_FORMAT: &str = "%Y%m%d";

/// `route_type` of heavy/commuter rail.
pub const RAIL_ROUTE_TYPE: &str = "2";

// Only the columns a stage filters on are mandatory. The others are read
// once a row is accepted, so a short row that gets filtered out is harmless.

/// `None` when the column is absent from the header or the row ends before
/// it; an empty field stays `Some("")`.
///
/// Records reach serde already decoded as text, so running out of fields is
/// the only way reading a string can fail here.
pub fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer).ok())
}

#[derive(Deserialize, Debug)]
pub struct Route {
    pub route_type: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub route_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub route_long_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Station {
    pub direction_id: String,
    pub route_long_name: String,
    #[serde(rename = "Branch", default, deserialize_with = "deserialize_present")]
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_lat: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_lon: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_sequence: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Trip {
    pub route_id: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub trip_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub service_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub direction_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub trip_headsign: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StopTime {
    pub trip_id: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub arrival_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub departure_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_sequence: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub stop_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Calendar {
    pub service_id: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub monday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub tuesday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub wednesday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub thursday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub friday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub saturday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub sunday: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub end_date: Option<String>,
}

impl Calendar {
    /// Day flags, Monday first. Anything but `"0"` is an active day.
    pub fn service_days(&self, table: &str) -> Result<[bool; 7], ProcessingError> {
        let flags = [
            ("monday", &self.monday),
            ("tuesday", &self.tuesday),
            ("wednesday", &self.wednesday),
            ("thursday", &self.thursday),
            ("friday", &self.friday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
        ];

        let mut days = [false; 7];
        for (day, (field, flag)) in days.iter_mut().zip(flags) {
            *day = required(table, field, flag.as_deref())? != "0";
        }
        Ok(days)
    }
}

pub fn required<V>(table: &str, field: &'static str, value: Option<V>) -> Result<V, ProcessingError> {
    value.ok_or_else(|| ProcessingError::MissingFieldError {
        table: table.to_owned(),
        field,
    })
}

pub fn parse_number<N: FromStr>(
    table: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<N, ProcessingError> {
    let value = required(table, field, value)?;
    value
        .parse()
        .map_err(|_| ProcessingError::InvalidNumberError {
            table: table.to_owned(),
            field,
            value: value.to_owned(),
        })
}

/// Parses `HH:MM:SS` into a time of day.
///
/// Trips running past midnight carry hours of 24 and more; those are folded
/// back onto the same clock, so `25:10:00` becomes `01:10:00`.
pub fn parse_time(time: &str) -> Result<NaiveTime, ProcessingError> {
    let invalid = || ProcessingError::InvalidTimeError(time.to_owned());

    let (hour, minute, second) = time
        .split(':')
        .map(|part| part.parse::<u32>())
        .collect_tuple()
        .ok_or_else(invalid)?;
    let (hour, minute, second) = (
        hour.map_err(|_| invalid())?,
        minute.map_err(|_| invalid())?,
        second.map_err(|_| invalid())?,
    );
    let hour = if hour > 23 { hour - 24 } else { hour };

    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid)
}

pub fn parse_date(date: &str) -> Result<NaiveDate, ProcessingError> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProcessingError::InvalidDateError(date.to_owned()));
    }
    NaiveDate::parse_from_str(date, GTFS_DATE_FORMAT)
        .map_err(|_| ProcessingError::InvalidDateError(date.to_owned()))
}
