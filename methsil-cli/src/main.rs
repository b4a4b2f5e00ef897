mod config;
mod pipeline;
mod render;
mod report;
mod run;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "methsil";
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Reproduce the methylation-induced silencing figure (panels A and B) from the published supplementary tables.")
        .subcommand_required(true)
        .subcommand(run::cli::create_run_cli())
        .subcommand(render::cli::create_render_cli())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(consts::DEFAULT_LOG_LEVEL),
    )
    .init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // PIPELINE
        //
        Some((run::cli::RUN_CMD, matches)) => {
            run::handlers::run_run(matches)?;
        }

        //
        // CHART RENDERING
        //
        Some((render::cli::RENDER_CMD, matches)) => {
            render::handlers::run_render(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
