use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::report::charts::ChartSpec;
use crate::report::svg::render_svg;

pub fn run_render(matches: &ArgMatches) -> Result<()> {
    let chart = matches
        .get_one::<String>("chart")
        .context("--chart is required")?;
    let out = matches
        .get_one::<String>("out")
        .context("--out is required")?;

    let spec = ChartSpec::from_json_file(Path::new(chart))?;
    render_svg(&spec, Path::new(out))
        .with_context(|| format!("Failed to render {chart}"))?;
    Ok(())
}
