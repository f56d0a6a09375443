use std::path::PathBuf;

/// Where the tables are read from and where echoes and artifacts go.
///
/// ```
/// let config = rail_schedule::config::Config::default()
///     .input_dir("gtfs")
///     .echo_accepted(false);
/// assert_eq!(config.table_path(&config.tables.trips), std::path::Path::new("gtfs/trips.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tables: TableNames,
    /// Prefix of echo files; the echo of `trips.txt` is `CR-trips.txt`
    pub echo_prefix: String,
    pub echo_accepted: bool,
}

#[derive(Debug, Clone)]
pub struct TableNames {
    pub routes: String,
    pub stations: String,
    pub trips: String,
    pub stop_times: String,
    pub stops: String,
    pub calendar: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            routes: "routes.txt".into(),
            stations: "CommuterRailStationLineOrdering.csv".into(),
            trips: "trips.txt".into(),
            stop_times: "stop_times.txt".into(),
            stops: "stops.txt".into(),
            calendar: "calendar.txt".into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            tables: TableNames::default(),
            echo_prefix: "CR-".into(),
            echo_accepted: true,
        }
    }
}

impl Config {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Whether accepted rows are echoed next to the artifacts (default: true)
    pub fn echo_accepted(mut self, echo_accepted: bool) -> Self {
        self.echo_accepted = echo_accepted;
        self
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.input_dir.join(table)
    }

    pub fn echo_path(&self, table: &str) -> Option<PathBuf> {
        self.echo_accepted
            .then(|| self.output_dir.join(format!("{}{table}", self.echo_prefix)))
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
