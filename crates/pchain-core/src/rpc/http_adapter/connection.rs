use reqwest::Url;

use crate::error::CoreError;

pub(super) const INFO_PATH: &str = "/ext/info";
pub(super) const PLATFORM_PATH: &str = "/ext/bc/P";
pub(super) const BLOCK_INDEX_PATH: &str = "/ext/index/P/block";

/// Node endpoints derived from one base URL.
pub(super) struct NodeEndpoints {
    pub(super) info: String,
    pub(super) platform: String,
    pub(super) block_index: String,
}

impl NodeEndpoints {
    pub(super) fn from_base(base: &str) -> Result<Self, CoreError> {
        let base = node_base_url(base)?;
        Ok(Self {
            info: format!("{base}{INFO_PATH}"),
            platform: format!("{base}{PLATFORM_PATH}"),
            block_index: format!("{base}{BLOCK_INDEX_PATH}"),
        })
    }
}

/// Validates a node URL and strips any trailing slash. Paths other than
/// the root are rejected, since the API paths are appended to it.
fn node_base_url(raw: &str) -> Result<String, CoreError> {
    let url = Url::parse(raw)
        .map_err(|e| CoreError::Config(format!("node URL `{raw}` does not parse: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::Config(format!(
            "node URL `{raw}` uses scheme `{}`; only http and https are served by avalanchego",
            url.scheme()
        )));
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(CoreError::Config(format!(
            "node URL `{raw}` must not carry a path (found `{}`)",
            url.path()
        )));
    }
    Ok(raw.trim_end_matches('/').to_owned())
}
