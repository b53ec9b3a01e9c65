//! HTTP downloads
//!
//! Plain GET requests against fixed vendor URLs. Failures are reported to
//! the caller as-is; nothing here retries.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use crate::{Error, Result};

fn get(url: &str) -> Result<ureq::Response> {
    ureq::get(url).call().map_err(|e| Error::Download {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Download `url` to `target`, streaming the body straight to disk.
///
/// A partially written file is removed when the transfer fails.
pub fn download_file(url: &str, target: &Path) -> Result<()> {
    tracing::info!("Downloading {} to {}", url, target.display());
    let response = get(url)?;
    let mut reader = response.into_reader();
    let mut file = File::create(target).map_err(|e| Error::io(target, e))?;

    if let Err(e) = std::io::copy(&mut reader, &mut file) {
        drop(file);
        let _ = fs::remove_file(target);
        return Err(Error::Download {
            url: url.to_string(),
            message: e.to_string(),
        });
    }
    Ok(())
}

/// Fetch `url` into memory, decoding a gzip `Content-Encoding`.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    tracing::info!("Fetching {}", url);
    let response = get(url)?;
    let gzipped = response
        .header("Content-Encoding")
        .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"));

    let read_error = |e: std::io::Error| Error::Download {
        url: url.to_string(),
        message: e.to_string(),
    };

    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(read_error)?;

    if !gzipped {
        return Ok(body);
    }
    let mut decoded = Vec::new();
    GzDecoder::new(body.as_slice())
        .read_to_end(&mut decoded)
        .map_err(read_error)?;
    Ok(decoded)
}
