use log::{error, info};

use rail_schedule::config::Config;
use rail_schedule::lines::CommuterRailLines;
use rail_schedule::pipeline;

fn main() {
    env_logger::init();

    match pipeline::run(&Config::default(), &CommuterRailLines) {
        Ok(written) => {
            for path in written {
                info!("Wrote {}", path.display());
            }
        }
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    }
}
