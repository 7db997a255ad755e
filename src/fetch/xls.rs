use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Download one spreadsheet. A single request; any non-2xx status is a
/// [`Error::Fetch`] carrying the status and the URL.
pub async fn fetch_xls(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let resp = client.get(url.as_str()).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Fetch {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let bytes = resp.bytes().await?;
    debug!(url = %url, size = bytes.len(), "fetched");
    Ok(bytes.to_vec())
}
