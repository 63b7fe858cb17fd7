use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::config::LauncherConfig;

/// Shared client for catalog fetches and artifact transfers.
///
/// Compression is disabled so byte counts match the sizes declared in the catalog.
pub fn build_http_client(config: &LauncherConfig) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(format!("{}/{}", config.launcher_name, config.launcher_version))
        .default_headers(default_headers)
        .build()
}
