//! Local cache of the downloaded input sources.
//!
//! Every source lives as a plain file in one data directory. A source already present there
//! is never fetched again, which makes re-running the pipeline cheap and lets it run fully
//! offline once the directory is populated.

use std::env;
use std::fs::{File, create_dir_all, remove_file, rename};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Source;
use crate::error::{LoadError, Result};

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "METHSIL_DATA_DIR";

pub const DEFAULT_DATA_DIR: &str = "data";

const PARTIAL_SUFFIX: &str = ".part";

/// Get the data directory from the environment, falling back to `./data`.
pub fn get_default_data_dir() -> PathBuf {
    match env::var(DATA_DIR_ENV) {
        Ok(val) if !val.is_empty() => PathBuf::from(val),
        _ => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

/// Builder for a [`SourceCache`].
///
/// ```rust,no_run
/// use methsil_io::cache::SourceCache;
/// use std::path::PathBuf;
///
/// let cache = SourceCache::builder()
///     .with_data_dir(PathBuf::from("/tmp/methsil"))
///     .with_progress(false)
///     .finish()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct SourceCacheBuilder {
    data_dir: Option<PathBuf>,
    show_progress: Option<bool>,
}

impl SourceCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = Some(path);
        self
    }

    /// Draw a progress bar while downloading. On by default.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = Some(show);
        self
    }

    /// Consumes the builder, creating the data directory if needed.
    pub fn finish(self) -> Result<SourceCache> {
        let data_dir = self.data_dir.unwrap_or_else(get_default_data_dir);
        create_dir_all(&data_dir)?;

        Ok(SourceCache {
            data_dir,
            show_progress: self.show_progress.unwrap_or(true),
        })
    }
}

pub struct SourceCache {
    data_dir: PathBuf,
    show_progress: bool,
}

fn unavailable(source: &Source, reason: impl ToString) -> LoadError {
    LoadError::SourceUnavailable {
        id: source.id.clone(),
        reason: reason.to_string(),
    }
}

impl SourceCache {
    pub fn builder() -> SourceCacheBuilder {
        SourceCacheBuilder::new()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file the pipeline reads for `source`.
    pub fn local_path(&self, source: &Source) -> PathBuf {
        match (source.decompress, source.file_name.strip_suffix(".gz")) {
            (true, Some(plain)) => self.data_dir.join(plain),
            _ => self.data_dir.join(&source.file_name),
        }
    }

    pub fn is_cached(&self, source: &Source) -> bool {
        self.local_path(source).is_file()
    }

    ///
    /// Make sure `source` is available locally and return the path to read.
    ///
    /// A cached copy is returned as is. Otherwise the source is downloaded (and decompressed
    /// when requested). Fails with [`LoadError::SourceUnavailable`] when there is no cached
    /// copy and the source has no url or the download fails.
    ///
    pub fn ensure(&self, source: &Source) -> Result<PathBuf> {
        let local = self.local_path(source);
        if local.is_file() {
            log::debug!("Using cached {} at {}", source.id, local.display());
            return Ok(local);
        }

        let archive = self.data_dir.join(&source.file_name);
        if !archive.is_file() {
            let url = source.url.as_deref().ok_or_else(|| {
                unavailable(
                    source,
                    format!(
                        "{} not found and no url is configured",
                        archive.display()
                    ),
                )
            })?;
            log::info!("Downloading {} from {}", source.id, url);
            self.download(source, url, &archive)?;
        }

        if local != archive {
            log::info!("Decompressing {}", archive.display());
            gunzip(&archive, &local).map_err(|e| unavailable(source, e))?;
        }

        Ok(local)
    }

    fn download(&self, source: &Source, url: &str, dest: &Path) -> Result<()> {
        let response = ureq::get(url)
            .call()
            .map_err(|e| unavailable(source, format!("request to {url} failed: {e}")))?;

        let bar = match (self.show_progress, response.body().content_length()) {
            (false, _) => ProgressBar::hidden(),
            (true, Some(len)) => ProgressBar::new(len),
            (true, None) => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {bytes:>10}/{total_bytes:10} {msg}",
        ) {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(source.id.clone());

        let partial = partial_path(dest);
        let written = (|| -> io::Result<u64> {
            let mut out = BufWriter::new(File::create(&partial)?);
            let mut body = bar.wrap_read(response.into_body().into_reader());
            let n = io::copy(&mut body, &mut out)?;
            out.flush()?;
            Ok(n)
        })();
        bar.finish_and_clear();

        match written {
            Ok(n) => {
                rename(&partial, dest)?;
                log::info!("Fetched {} ({} bytes)", source.id, n);
                Ok(())
            }
            Err(e) => {
                let _ = remove_file(&partial);
                Err(unavailable(source, format!("download from {url} failed: {e}")))
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

/// Decompress a gzip archive into `target`, writing through a temporary file.
fn gunzip(archive: &Path, target: &Path) -> io::Result<()> {
    let partial = partial_path(target);
    let result = (|| {
        let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(archive)?));
        let mut out = BufWriter::new(File::create(&partial)?);
        io::copy(&mut decoder, &mut out)?;
        out.flush()
    })();

    match result {
        Ok(()) => rename(&partial, target),
        Err(e) => {
            let _ = remove_file(&partial);
            Err(e)
        }
    }
}
