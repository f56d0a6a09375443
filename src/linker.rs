//! The linking stages. Each one is a single pass over one table, filtered by
//! membership in what the earlier stages registered.
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::data::*;
use crate::error::ProcessingError;
use crate::gtfs::{self, parse_date, parse_number, parse_time, required, RAIL_ROUTE_TYPE};
use crate::table::filter_table;
use crate::timetable::*;

const ROUTES: &str = "routes";
const STATIONS: &str = "station ordering";
const TRIPS: &str = "trips";
const STOP_TIMES: &str = "stop_times";
const STOPS: &str = "stops";
const CALENDAR: &str = "calendar";

/// Keeps the rail routes. A repeated route id replaces the earlier route.
pub fn read_routes(
    source: impl Read,
    echo: Option<&mut dyn Write>,
) -> Result<BTreeMap<String, Route>, ProcessingError> {
    let mut routes = BTreeMap::new();

    filter_table(ROUTES, source, echo, |row: gtfs::Route| {
        if row.route_type != RAIL_ROUTE_TYPE {
            return Ok(false);
        }
        let route_id = required(ROUTES, "route_id", row.route_id)?;
        let long_name = required(ROUTES, "route_long_name", row.route_long_name)?;
        routes.insert(route_id.clone(), Route::new(route_id, long_name));
        Ok(true)
    })?;

    info!("Kept {} rail routes", routes.len());
    Ok(routes)
}

/// Appends each station row to the first route carrying the same display name.
///
/// Rows whose direction is `0` are skipped.
pub fn attach_stations(
    routes: &mut BTreeMap<String, Route>,
    source: impl Read,
    echo: Option<&mut dyn Write>,
) -> Result<usize, ProcessingError> {
    let attached = filter_table(STATIONS, source, echo, |row: gtfs::Station| {
        if row.direction_id == "0" {
            return Ok(false);
        }
        let Some(route) = routes
            .values_mut()
            .find(|route| route.long_name == row.route_long_name)
        else {
            return Ok(false);
        };

        route.stations.push(Station {
            direction_id: parse_number(STATIONS, "direction_id", Some(row.direction_id.as_str()))?,
            stop_lat: parse_number(STATIONS, "stop_lat", row.stop_lat.as_deref())?,
            stop_lon: parse_number(STATIONS, "stop_lon", row.stop_lon.as_deref())?,
            stop_sequence: parse_number(
                STATIONS,
                "stop_sequence",
                row.stop_sequence.as_deref(),
            )?,
            branch: required(STATIONS, "Branch", row.branch)?,
            stop_id: required(STATIONS, "stop_id", row.stop_id)?,
            route_long_name: row.route_long_name,
        });
        Ok(true)
    })?;

    info!("Attached {attached} stations");
    Ok(attached)
}

/// Creates the trips of known routes.
///
/// A repeated trip id re-points the registry to the newer trip; the older one
/// stays on its route.
pub fn link_trips(
    timetable: &mut Timetable,
    source: impl Read,
    echo: Option<&mut dyn Write>,
) -> Result<TripRegistry, ProcessingError> {
    let Timetable { routes, trips } = timetable;
    let mut registry = TripRegistry::default();

    let accepted = filter_table(TRIPS, source, echo, |row: gtfs::Trip| {
        let Some(route) = routes.get_mut(&row.route_id) else {
            return Ok(false);
        };
        let trip_id = required(TRIPS, "trip_id", row.trip_id)?;
        let service_id = required(TRIPS, "service_id", row.service_id)?;
        let direction_id = parse_number(TRIPS, "direction_id", row.direction_id.as_deref())?;
        let headsign = required(TRIPS, "trip_headsign", row.trip_headsign)?;

        let idx = trips.len();
        route.trips.push(idx);
        registry.by_id.insert(trip_id.clone(), idx);
        registry.service_ids.insert(service_id.clone());
        trips.push(Trip {
            id: trip_id,
            route_id: row.route_id,
            service_id,
            direction_id,
            headsign,
            stop_times: Vec::new(),
            service: None,
        });
        Ok(true)
    })?;

    if accepted != registry.by_id.len() {
        warn!(
            "{} trip rows reused an earlier trip id",
            accepted - registry.by_id.len()
        );
    }
    info!(
        "Linked {accepted} trips using {} services",
        registry.service_ids.len()
    );
    Ok(registry)
}

/// Appends each visit of a known trip to that trip, in file order.
pub fn link_stop_times(
    timetable: &mut Timetable,
    registry: &TripRegistry,
    source: impl Read,
    echo: Option<&mut dyn Write>,
) -> Result<SeenStops, ProcessingError> {
    let mut seen = SeenStops::new();

    let accepted = filter_table(STOP_TIMES, source, echo, |row: gtfs::StopTime| {
        let Some(&idx) = registry.by_id.get(&row.trip_id) else {
            return Ok(false);
        };

        let stop_time = StopTime {
            arrival_time: parse_time(required(
                STOP_TIMES,
                "arrival_time",
                row.arrival_time.as_deref(),
            )?)?,
            departure_time: parse_time(required(
                STOP_TIMES,
                "departure_time",
                row.departure_time.as_deref(),
            )?)?,
            stop_sequence: parse_number(
                STOP_TIMES,
                "stop_sequence",
                row.stop_sequence.as_deref(),
            )?,
            stop_id: required(STOP_TIMES, "stop_id", row.stop_id)?,
            trip_id: row.trip_id,
            stop: None,
        };
        seen.insert(stop_time.stop_id.clone());
        timetable.trips[idx].stop_times.push(stop_time);
        Ok(true)
    })?;

    info!("Linked {accepted} stop times over {} stops", seen.len());
    Ok(seen)
}

/// Sorts every trip's visits by sequence, then every route's trips by the
/// departure of their first visit. Trips without visits go last.
pub fn order_timetable(timetable: &mut Timetable) {
    let Timetable { routes, trips } = timetable;

    for trip in trips.iter_mut() {
        trip.stop_times.sort_by_key(|stop_time| stop_time.stop_sequence);
    }

    let empty = trips.iter().filter(|trip| trip.stop_times.is_empty()).count();
    if empty > 0 {
        warn!("{empty} trips have no stop times");
    }

    for route in routes.values_mut() {
        route.trips.sort_by_key(|&idx| {
            let departure = trips[idx].first_departure();
            (departure.is_none(), departure)
        });
    }
}

/// Reads the stops that some visit references and points every such visit at
/// its stop.
pub fn attach_stops(
    timetable: &mut Timetable,
    seen: &SeenStops,
    source: impl Read,
    echo: Option<&mut dyn Write>,
) -> Result<StopRegistry, ProcessingError> {
    let mut stops = StopRegistry::new();

    filter_table(STOPS, source, echo, |row: gtfs::Stop| {
        if !seen.contains(&row.stop_id) {
            return Ok(false);
        }
        stops.insert(
            row.stop_id.clone(),
            Arc::new(Stop {
                id: row.stop_id,
                name: required(STOPS, "stop_name", row.stop_name)?,
            }),
        );
        Ok(true)
    })?;

    let mut unresolved = 0;
    for stop_time in timetable
        .trips
        .iter_mut()
        .flat_map(|trip| trip.stop_times.iter_mut())
    {
        match stops.get(&stop_time.stop_id) {
            Some(stop) => stop_time.stop = Some(Arc::clone(stop)),
            None => unresolved += 1,
        }
    }

    if unresolved > 0 {
        warn!("{unresolved} stop times reference a stop missing from the stops table");
    }
    info!("Attached {} stops", stops.len());
    Ok(stops)
}

/// Reads the calendars of the services in use and hands each registered trip
/// its calendar. Trips without one keep `service` empty.
pub fn link_calendars(
    timetable: &mut Timetable,
    registry: &TripRegistry,
    source: impl Read,
    echo: Option<&mut dyn Write>,
) -> Result<CalendarRegistry, ProcessingError> {
    let mut calendars = CalendarRegistry::new();

    filter_table(CALENDAR, source, echo, |row: gtfs::Calendar| {
        if !registry.service_ids.contains(&row.service_id) {
            return Ok(false);
        }
        let calendar = Calendar {
            service_days: row.service_days(CALENDAR)?,
            start_date: parse_date(required(CALENDAR, "start_date", row.start_date.as_deref())?)?,
            end_date: parse_date(required(CALENDAR, "end_date", row.end_date.as_deref())?)?,
            service_id: row.service_id,
        };
        calendars.insert(calendar.service_id.clone(), Arc::new(calendar));
        Ok(true)
    })?;

    let mut unlinked = 0;
    for &idx in registry.by_id.values() {
        let trip = &mut timetable.trips[idx];
        trip.service = calendars.get(&trip.service_id).cloned();
        if trip.service.is_none() {
            debug!("Trip {} has no calendar for service {}", trip.id, trip.service_id);
            unlinked += 1;
        }
    }

    if unlinked > 0 {
        warn!("{unlinked} trips have no calendar");
    }
    info!("Linked {} calendars", calendars.len());
    Ok(calendars)
}
