use clap::Parser;
use log::{error, info};
use rc_bench::Cli;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Cli::parse().into_options();
    match rc_bench::run(&options) {
        Ok(reports) => info!(
            "{} report(s); results in {}",
            reports.len(),
            options.results_dir.display()
        ),
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    }
}
