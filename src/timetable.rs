use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::data::*;

/// The linked schedule: rail routes keyed by route id, and every trip they own.
#[derive(Debug, Default)]
pub struct Timetable {
    pub routes: BTreeMap<String, Route>,
    pub trips: Vec<Trip>,
}

impl Timetable {
    pub fn from_routes(routes: BTreeMap<String, Route>) -> Self {
        Self {
            routes,
            trips: Vec::new(),
        }
    }

    /// Trips of `route` in the route's current order.
    pub fn trips_of<'a>(&'a self, route: &'a Route) -> impl Iterator<Item = &'a Trip> + 'a {
        route.trips.iter().map(move |&idx| &self.trips[idx])
    }

    pub fn stop_times(&self) -> impl Iterator<Item = &StopTime> {
        self.trips.iter().flat_map(|trip| trip.stop_times.iter())
    }
}

/// Trips by id, and the service ids they use.
#[derive(Debug, Default)]
pub struct TripRegistry {
    pub by_id: HashMap<String, TripIdx>,
    pub service_ids: HashSet<String>,
}

/// Stop ids referenced by at least one accepted visit.
pub type SeenStops = HashSet<String>;

pub type StopRegistry = HashMap<String, Arc<Stop>>;

pub type CalendarRegistry = HashMap<String, Arc<Calendar>>;
