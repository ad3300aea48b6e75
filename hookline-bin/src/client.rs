use crate::options::{Config, HeaderMapExt};
use anyhow::{Context, Result};
use hookline_lib::{Client, ClientBuilder};
use http::HeaderMap;

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    let url = cfg.webhook_url()?;
    let headers = HeaderMap::from_header_pairs(&cfg.header)?;

    ClientBuilder::builder()
        .url(url)
        .user_agent(cfg.user_agent.clone())
        .custom_headers(headers)
        .timeout(cfg.timeout)
        .max_redirects(cfg.max_redirects)
        .allow_insecure(cfg.insecure)
        .build()
        .client()
        .context("Failed to create request client")
}
