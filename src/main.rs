use std::process::ExitCode;

use clap::Parser;

use filterlab::cli::{self, CliArgs};
use filterlab::logger;
use filterlab::settings::EditorSettings;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    logger::set_echo(args.verbose);
    logger::init();
    filterlab::log_info!("FilterLab v{}", env!("CARGO_PKG_VERSION"));

    let settings = EditorSettings::load();
    cli::run(args, &settings)
}
