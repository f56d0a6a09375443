//! One artifact per route, holding the route's whole linked graph.
//!
//! Back references (trip to route, visit to trip) and the shared stop and
//! calendar links are stored as ids and rebuilt by [`load_artifact`].
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::data::*;
use crate::error::ProcessingError;
use crate::lines::{normalize_line_name, LineLookup};
use crate::timetable::Timetable;

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteArtifact {
    pub line_number: u8,
    pub route: Route,
    /// In the route's departure order.
    pub trips: Vec<Trip>,
    pub stops: BTreeMap<String, Stop>,
    pub calendars: BTreeMap<String, Calendar>,
}

#[derive(Debug)]
pub struct Artifact {
    pub file_name: String,
    pub line_number: u8,
    pub bytes: Vec<u8>,
}

pub fn artifact_file_name(line_number: u8) -> String {
    format!("CR-{line_number}-data.json")
}

pub fn resolve_line(route: &Route, lines: &impl LineLookup) -> Result<u8, ProcessingError> {
    let name = normalize_line_name(&route.long_name);
    lines
        .line_number(name)
        .ok_or_else(|| ProcessingError::UnresolvedLineError(name.to_owned()))
}

impl RouteArtifact {
    pub fn new(timetable: &Timetable, route: &Route, line_number: u8) -> Self {
        let trips: Vec<Trip> = timetable.trips_of(route).cloned().collect();

        let stops = trips
            .iter()
            .flat_map(|trip| &trip.stop_times)
            .filter_map(|stop_time| stop_time.stop.as_deref())
            .map(|stop| (stop.id.clone(), stop.clone()))
            .collect();
        let calendars = trips
            .iter()
            .filter_map(|trip| trip.service.as_deref())
            .map(|calendar| (calendar.service_id.clone(), calendar.clone()))
            .collect();

        Self {
            line_number,
            route: route.clone(),
            trips,
            stops,
            calendars,
        }
    }

    /// Rebuilds a single-route timetable, sharing one instance per stop and
    /// per calendar.
    pub fn into_timetable(self) -> Timetable {
        let stops: HashMap<String, Arc<Stop>> = self
            .stops
            .into_iter()
            .map(|(id, stop)| (id, Arc::new(stop)))
            .collect();
        let calendars: HashMap<String, Arc<Calendar>> = self
            .calendars
            .into_iter()
            .map(|(id, calendar)| (id, Arc::new(calendar)))
            .collect();

        let mut route = self.route;
        route.trips = (0..self.trips.len()).collect();

        let trips = self
            .trips
            .into_iter()
            .map(|mut trip| {
                trip.route_id = route.id.clone();
                trip.service = calendars.get(&trip.service_id).cloned();
                for stop_time in &mut trip.stop_times {
                    stop_time.trip_id = trip.id.clone();
                    stop_time.stop = stops.get(&stop_time.stop_id).cloned();
                }
                trip
            })
            .collect();

        Timetable {
            routes: BTreeMap::from([(route.id.clone(), route)]),
            trips,
        }
    }
}

/// Serializes every route of `timetable`.
///
/// All line identifiers are resolved first, so a single unknown line yields no
/// artifacts at all.
pub fn export_routes(
    timetable: &Timetable,
    lines: &impl LineLookup,
) -> Result<Vec<Artifact>, ProcessingError> {
    let resolved = timetable
        .routes
        .values()
        .map(|route| resolve_line(route, lines).map(|line_number| (route, line_number)))
        .collect::<Result<Vec<_>, ProcessingError>>()?;

    let mut artifacts = Vec::with_capacity(resolved.len());
    for (route, line_number) in resolved {
        let file_name = artifact_file_name(line_number);
        if artifacts
            .iter()
            .any(|artifact: &Artifact| artifact.file_name == file_name)
        {
            warn!("Route {} overwrites the artifact {file_name}", route.id);
        }

        let bytes = serde_json::to_vec(&RouteArtifact::new(timetable, route, line_number))?;
        info!(
            "Route {} ({}): {} trips -> {file_name}",
            route.id,
            route.long_name,
            route.trips.len()
        );
        artifacts.push(Artifact {
            file_name,
            line_number,
            bytes,
        });
    }
    Ok(artifacts)
}

pub fn load_artifact(bytes: &[u8]) -> Result<Timetable, ProcessingError> {
    let artifact: RouteArtifact = serde_json::from_slice(bytes)?;
    Ok(artifact.into_timetable())
}
