use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::ArgMatches;

use crate::config::PipelineConfig;
use crate::pipeline::{SUMMARY_FILE, run_pipeline};

/// Merge the command-line flags into the configuration file (or the defaults).
pub fn resolve_config(matches: &ArgMatches) -> Result<PipelineConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => PipelineConfig::from_file(Path::new(path))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = matches.get_one::<String>("data-dir") {
        config.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(dir) = matches.get_one::<String>("out") {
        config.out_dir = PathBuf::from(dir);
    }
    Ok(config)
}

pub fn run_run(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    let output = run_pipeline(&config, !matches.get_flag("no-progress"))?;

    println!("{}", output.summary.umrs.headline());
    println!(
        "{} files written, summary in {}",
        output.files.len(),
        config.out_dir.join(SUMMARY_FILE).display()
    );
    Ok(())
}
