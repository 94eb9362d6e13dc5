use std::error::Error;

use clap::Parser;
use vndump::{
    cli::{Cli, Target},
    export, fetch_entity, fetch_stats,
};

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDOUT/STDERR
    env_logger::init();

    let cli = Cli::parse();
    let target = cli.target()?;
    let config = cli.config();

    match target {
        Target::Stats => {
            let stats = fetch_stats(&config)?;
            export::export_stats(&cli.dir, &stats, cli.format())?;
        }
        Target::Entity(entity) => {
            let records = fetch_entity(&config, entity, &cli.flags)?;
            export::export_records(&cli.dir, entity, &cli.flags, &records, cli.format())?;
        }
    }

    Ok(())
}
