use clap::{Arg, ArgAction, Command, arg};

pub const RUN_CMD: &str = "run";

pub fn create_run_cli() -> Command {
    Command::new(RUN_CMD)
        .about("Fetch the inputs, run the whole pipeline and write tables, charts and a summary.")
        .arg(
            arg!(--config <CONFIG>)
                .required(false)
                .help("Path to a TOML pipeline configuration (defaults apply when omitted)"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .required(false)
                .help("Directory holding the downloaded inputs (overrides the config and METHSIL_DATA_DIR)"),
        )
        .arg(
            arg!(--out <OUT>)
                .required(false)
                .help("Output directory (overrides the config)"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .action(ArgAction::SetTrue)
                .help("Do not show download progress bars"),
        )
}
