use std::env;
use std::process::ExitCode;

use log::{error, info};

use soilcast::config::DEFAULT_SOURCE;
use soilcast::{PipelineConfig, Session, io, report, stats};

fn run(source: &str) -> soilcast::Result<()> {
    let config = PipelineConfig::new().source(source);
    config.validate()?;

    let dataset = io::load(&config.source)?;
    println!("{}", report::render_summary(&stats::describe(&dataset)));

    let session = Session::from_dataset(config, dataset)?;
    print!("{}", report::render_session(&session));

    let scenario_input = report::default_scenario();
    let scenario = session.simulate(&scenario_input)?;
    println!();
    print!("{}", report::render_scenario(&scenario_input, &scenario));

    info!("done");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let source = env::args().nth(1).unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    match run(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
