use clap::{Command, arg};

pub const RENDER_CMD: &str = "render";

pub fn create_render_cli() -> Command {
    Command::new(RENDER_CMD)
        .about("Render a chart written by `run` (JSON) to SVG.")
        .arg(
            arg!(--chart <CHART>)
                .required(true)
                .help("Path to the chart JSON"),
        )
        .arg(
            arg!(--out <OUT>)
                .required(true)
                .help("Path of the SVG to write"),
        )
}
