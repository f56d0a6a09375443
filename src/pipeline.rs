use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use log::info;

use crate::config::Config;
use crate::error::ProcessingError;
use crate::export::export_routes;
use crate::linker::*;
use crate::lines::LineLookup;
use crate::timetable::Timetable;

type Echo = Option<BufWriter<File>>;

/// Opens an input table, then its echo file, so a missing table leaves no
/// echo behind.
fn open_stage(config: &Config, table: &str) -> Result<(BufReader<File>, Echo), ProcessingError> {
    let path = config.table_path(table);
    let source = File::open(&path)
        .map(BufReader::new)
        .map_err(|source| ProcessingError::io(path, source))?;

    let echo = config
        .echo_path(table)
        .map(|path| {
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|source| ProcessingError::io(path, source))
        })
        .transpose()?;
    Ok((source, echo))
}

fn as_echo(echo: &mut Echo) -> Option<&mut dyn Write> {
    echo.as_mut().map(|writer| writer as &mut dyn Write)
}

/// Reads every table in dependency order and returns the linked, ordered
/// timetable.
pub fn build_timetable(config: &Config) -> Result<Timetable, ProcessingError> {
    let tables = &config.tables;
    if config.echo_accepted {
        std::fs::create_dir_all(&config.output_dir)
            .map_err(|source| ProcessingError::io(&config.output_dir, source))?;
    }

    info!("Processing {}", tables.routes);
    let (source, mut echo) = open_stage(config, &tables.routes)?;
    let mut routes = read_routes(source, as_echo(&mut echo))?;

    info!("Processing {}", tables.stations);
    let (source, mut echo) = open_stage(config, &tables.stations)?;
    attach_stations(&mut routes, source, as_echo(&mut echo))?;

    let mut timetable = Timetable::from_routes(routes);

    info!("Processing {}", tables.trips);
    let (source, mut echo) = open_stage(config, &tables.trips)?;
    let trips = link_trips(&mut timetable, source, as_echo(&mut echo))?;

    info!("Processing {}", tables.stop_times);
    let (source, mut echo) = open_stage(config, &tables.stop_times)?;
    let seen_stops = link_stop_times(&mut timetable, &trips, source, as_echo(&mut echo))?;

    info!("Ordering stop times and trips");
    order_timetable(&mut timetable);

    info!("Processing {}", tables.stops);
    let (source, mut echo) = open_stage(config, &tables.stops)?;
    attach_stops(&mut timetable, &seen_stops, source, as_echo(&mut echo))?;

    info!("Processing {}", tables.calendar);
    let (source, mut echo) = open_stage(config, &tables.calendar)?;
    link_calendars(&mut timetable, &trips, source, as_echo(&mut echo))?;

    Ok(timetable)
}

/// Builds the timetable and writes one artifact per route. Nothing is written
/// unless every route's line resolves.
pub fn run(config: &Config, lines: &impl LineLookup) -> Result<Vec<PathBuf>, ProcessingError> {
    let timetable = build_timetable(config)?;
    let artifacts = export_routes(&timetable, lines)?;

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|source| ProcessingError::io(&config.output_dir, source))?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = config.artifact_path(&artifact.file_name);
        std::fs::write(&path, &artifact.bytes)
            .map_err(|source| ProcessingError::io(&path, source))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use chrono::Weekday;
    use tempfile::TempDir;

    use super::*;
    use crate::export::load_artifact;
    use crate::lines::CommuterRailLines;

    const TABLES: [(&str, &str); 6] = [
        (
            "routes.txt",
            "\"route_id\",\"agency_id\",\"route_short_name\",\"route_long_name\",\"route_type\"
\"CR-Fitchburg\",\"1\",\"\",\"Fitchburg Line\",\"2\"
\"CR-Lowell\",\"1\",\"\",\"Lowell Line\",\"2\"
\"1\",\"1\",\"1\",\"Harvard - Dudley\",\"3\"
",
        ),
        (
            "CommuterRailStationLineOrdering.csv",
            "route_long_name,Branch,direction_id,stop_id,stop_lat,stop_lon,stop_sequence
Fitchburg Line,Trunk,1,Wachusett,42.45,-71.77,1
Fitchburg Line,Trunk,0,Wachusett,42.45,-71.77,9
Fitchburg Line,Trunk,1,Porter Square,42.38,-71.11,2
Lowell Line,Trunk,1,Lowell,42.63,-71.31,1
",
        ),
        (
            "trips.txt",
            "route_id,service_id,trip_id,trip_headsign,direction_id
CR-Fitchburg,weekday,F1,North Station,1
CR-Fitchburg,weekday,F2,North Station,1
CR-Lowell,saturday,L1,North Station,1
1,bus,B1,Dudley,0
",
        ),
        (
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence
F1,08:10:00,08:10:00,Porter Square,2
F1,08:00:00,08:00:00,Wachusett,1
F2,07:30:00,07:30:00,Wachusett,1
L1,24:30:00,24:30:00,Lowell,1
B1,09:00:00,09:00:00,Harvard,1
",
        ),
        (
            "stops.txt",
            "stop_id,stop_name,stop_lat,stop_lon
Wachusett,Wachusett,42.45,-71.77
Porter Square,Porter Square,42.38,-71.11
Lowell,Lowell,42.63,-71.31
Harvard,Harvard,42.37,-71.11
",
        ),
        (
            "calendar.txt",
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
weekday,1,0,0,0,1,0,0,20120101,20121231
saturday,0,0,0,0,0,1,0,20120101,20121231
bus,1,1,1,1,1,1,1,20120101,20121231
",
        ),
    ];

    fn fixture(overrides: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("in")).unwrap();
        for (table, content) in TABLES {
            let content = overrides
                .iter()
                .find(|(overridden, _)| *overridden == table)
                .map_or(content, |&(_, content)| content);
            std::fs::write(dir.path().join("in").join(table), content).unwrap();
        }
        dir
    }

    fn config(dir: &Path) -> Config {
        Config::default()
            .input_dir(dir.join("in"))
            .output_dir(dir.join("out"))
    }

    fn snapshot(timetable: &Timetable) -> Vec<String> {
        timetable
            .routes
            .values()
            .flat_map(|route| {
                std::iter::once(format!("{route:?}")).chain(timetable.trips_of(route).map(
                    |trip| format!("{:?} {:?}", trip, trip.service.as_deref()),
                ))
            })
            .collect()
    }

    #[test]
    fn builds_the_linked_timetable() {
        let dir = fixture(&[]);
        let timetable = build_timetable(&config(dir.path())).unwrap();

        assert_eq!(timetable.routes.len(), 2);
        assert_eq!(timetable.trips.len(), 3);

        let fitchburg = &timetable.routes["CR-Fitchburg"];
        let stations: Vec<_> = fitchburg.stations.iter().map(|s| s.stop_sequence).collect();
        assert_eq!(stations, vec![1, 2]);

        let trips: Vec<_> = timetable.trips_of(fitchburg).collect();
        assert_eq!(trips[0].id, "F2");
        assert_eq!(trips[1].id, "F1");
        let sequences: Vec<_> = trips[1].stop_times.iter().map(|st| st.stop_sequence).collect();
        assert_eq!(sequences, vec![1, 2]);

        let wachusett: Vec<_> = timetable
            .stop_times()
            .filter(|st| st.stop_id == "Wachusett")
            .map(|st| st.stop.clone().unwrap())
            .collect();
        assert!(Arc::ptr_eq(&wachusett[0], &wachusett[1]));

        let service = trips[0].service.as_ref().unwrap();
        assert_eq!(service.active_days(), vec![Weekday::Mon, Weekday::Fri]);
    }

    #[test]
    fn echo_files_hold_only_accepted_rows() {
        let dir = fixture(&[]);
        build_timetable(&config(dir.path())).unwrap();

        let routes = std::fs::read_to_string(dir.path().join("out/CR-routes.txt")).unwrap();
        assert_eq!(routes, "CR-Fitchburg,1,,Fitchburg Line,2\nCR-Lowell,1,,Lowell Line,2\n");
        let stop_times = std::fs::read_to_string(dir.path().join("out/CR-stop_times.txt")).unwrap();
        assert_eq!(stop_times.lines().count(), 4);
        assert!(!stop_times.contains("B1"));
    }

    #[test]
    fn rerunning_gives_the_same_graph() {
        let dir = fixture(&[]);
        let first = build_timetable(&config(dir.path())).unwrap();
        let second = build_timetable(&config(dir.path())).unwrap();
        assert_eq!(snapshot(&first), snapshot(&second));
    }

    #[test]
    fn writes_one_artifact_per_line() {
        let dir = fixture(&[]);
        let written = run(&config(dir.path()), &CommuterRailLines).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("out/CR-9-data.json"), dir.path().join("out/CR-10-data.json")]
        );

        let bytes = std::fs::read(&written[1]).unwrap();
        let lowell = load_artifact(&bytes).unwrap();
        let route = &lowell.routes["CR-Lowell"];
        let trip = lowell.trips_of(route).next().unwrap();
        assert_eq!(
            trip.stop_times[0].departure_time,
            chrono::NaiveTime::from_hms_opt(0, 30, 0).unwrap()
        );
        assert!(trip.service.as_ref().unwrap().runs_on(Weekday::Sat));
    }

    #[test]
    fn unresolved_line_writes_nothing() {
        let routes = "route_id,route_type,route_long_name
CR-Fitchburg,2,Fitchburg Line
CR-Ghost,2,Ghost Line
";
        let dir = fixture(&[("routes.txt", routes)]);
        let result = run(&config(dir.path()), &CommuterRailLines);

        assert!(matches!(result, Err(ProcessingError::UnresolvedLineError(_))));
        let artifacts = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with("-data.json"))
            .count();
        assert_eq!(artifacts, 0);
    }

    #[test]
    fn missing_table_is_an_io_error() {
        let dir = fixture(&[]);
        std::fs::remove_file(dir.path().join("in/stops.txt")).unwrap();
        let result = build_timetable(&config(dir.path()).echo_accepted(false));
        assert!(matches!(result, Err(ProcessingError::IoError { .. })));
    }

    #[test]
    fn missing_table_leaves_no_echo_behind() {
        let dir = fixture(&[]);
        std::fs::remove_file(dir.path().join("in/stops.txt")).unwrap();
        let result = build_timetable(&config(dir.path()));

        assert!(matches!(result, Err(ProcessingError::IoError { .. })));
        assert!(dir.path().join("out/CR-stop_times.txt").exists());
        assert!(!dir.path().join("out/CR-stops.txt").exists());
    }

    #[test]
    fn custom_line_table_is_honoured() {
        let dir = fixture(&[]);
        let lines = HashMap::from([("Fitchburg".to_string(), 40u8), ("Lowell".to_string(), 41u8)]);
        let written = run(&config(dir.path()).echo_accepted(false), &lines).unwrap();
        assert_eq!(written[0], dir.path().join("out/CR-40-data.json"));
    }
}
