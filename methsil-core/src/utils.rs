use std::ffi::OsStr;
use std::fs::File;
#[cfg(feature = "http")]
use std::io::Cursor;
use std::io::{BufReader, Read};
use std::path::Path;

#[cfg(feature = "http")]
use anyhow::bail;
use anyhow::{Context, Result};
#[cfg(feature = "http")]
use flate2::read::GzDecoder;
use flate2::read::MultiGzDecoder;
#[cfg(feature = "http")]
use ureq::{Error as UreqError, get};

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Get a reader for a url. Either for gzip'd or non-gzip'd content.
/// The whole body is read into memory before the reader is returned.
///
/// # Arguments
///
/// - url: http(s) url of the file to read
///
#[cfg(feature = "http")]
pub fn get_dynamic_reader_from_url(url: &str) -> Result<BufReader<Box<dyn Read>>> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("Unsupported url scheme: {}", url);
    }

    let response = match get(url).call() {
        Ok(resp) => resp,
        Err(UreqError::StatusCode(code)) => {
            bail!("HTTP status {} when fetching {}", code, url)
        }
        Err(e) => bail!("Request error when fetching {}: {}", url, e),
    };

    let mut bytes = Vec::new();
    response
        .into_body()
        .into_reader()
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed reading response body from {}", url))?;

    let cursor = Cursor::new(bytes);

    let reader: Box<dyn Read> = match url.ends_with(".gz") {
        true => Box::new(GzDecoder::new(cursor)),
        false => Box::new(cursor),
    };

    Ok(BufReader::new(reader))
}

/// True when `source` looks like a remote location rather than a local path.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{BufRead, Write};

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn lines() -> Vec<String> {
        vec!["chr1\t10\t20".to_string(), "chr2\t5\t9".to_string()]
    }

    #[rstest]
    fn test_plain_reader(lines: Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.bed");
        std::fs::write(&path, lines.join("\n")).unwrap();

        let read: Vec<String> = get_dynamic_reader(&path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(read, lines);
    }

    #[rstest]
    fn test_gzip_reader(lines: Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zipped.bed.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(lines.join("\n").as_bytes()).unwrap();
        encoder.finish().unwrap();

        let read: Vec<String> = get_dynamic_reader(&path)
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(read, lines);
    }

    #[rstest]
    fn test_missing_file_is_error() {
        assert!(get_dynamic_reader(Path::new("/no/such/file.tsv")).is_err());
    }

    #[rstest]
    #[case("https://example.org/a.gtf.gz", true)]
    #[case("http://example.org/a.gtf", true)]
    #[case("data/a.gtf", false)]
    fn test_is_url(#[case] source: &str, #[case] expected: bool) {
        assert_eq!(is_url(source), expected);
    }
}
