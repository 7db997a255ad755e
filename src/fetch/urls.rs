// src/fetch/urls.rs
use url::Url;

use crate::dataset::Variant;
use crate::error::{Error, Result};
use crate::partition::PartitionKey;

/// Deterministic source URL of one partition of `variant`.
pub fn partition_url(base: &str, variant: Variant, key: &PartitionKey) -> Result<Url> {
    let path = variant.url_template().replace("{key}", key.as_str());
    let base = format!("{}/", base.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|b| b.join(&path))
        .map_err(|e| Error::Config(format!("bad base url `{}`: {}", base, e)))
}

/// Last path segment of `url`, the name the raw file is stored under.
pub fn file_name(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
}
