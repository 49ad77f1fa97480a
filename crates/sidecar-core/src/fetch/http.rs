//! Single-stream HTTP GET download into a `.part` file.

use crate::config::HttpConfig;
use crate::temp_file::PartFile;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::path::Path;

/// Downloads `url` to `dest` with one GET, following redirects.
/// Returns the number of bytes written. Non-2xx responses are errors and leave no file behind.
pub fn download(url: &str, dest: &Path, http: &HttpConfig) -> Result<u64> {
    let part = RefCell::new(PartFile::create(dest)?);
    let write_err: RefCell<Option<anyhow::Error>> = RefCell::new(None);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(http.connect_timeout())?;
    easy.timeout(http.timeout())?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match part.borrow_mut().append(data) {
            Ok(()) => Ok(data.len()),
            Err(e) => {
                tracing::warn!("download write failed: {:#}", e);
                *write_err.borrow_mut() = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        let performed = transfer.perform();
        if let Some(e) = write_err.borrow_mut().take() {
            return Err(e.context(format!("GET {}", url)));
        }
        performed.with_context(|| format!("GET {} failed", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }

    let part = part.into_inner();
    let written = part.written();
    part.finalize(dest)?;
    tracing::debug!(url, bytes = written, dest = %dest.display(), "downloaded");
    Ok(written)
}
