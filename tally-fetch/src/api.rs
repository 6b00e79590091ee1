//! Lab management API endpoints.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tally_core::{Dataset, DateRange, UserInfo};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::client::HttpClient;
use crate::error::FetchError;
use crate::parser::{parse_page, parse_tools, parse_users};

/// Default authorization scheme.
pub const DEFAULT_AUTH_SCHEME: &str = "Token";

/// Tool list endpoint.
pub const TOOLS_ENDPOINT: &str = "api/tools/";

/// User list endpoint.
pub const USERS_ENDPOINT: &str = "api/users/";

/// Client for the lab management API.
#[derive(Debug, Clone)]
pub struct LabApi {
    http: HttpClient,
    base_url: Url,
    auth_header: String,
}

impl LabApi {
    /// Creates an API client.
    ///
    /// `base_url` is treated as a directory: a missing trailing slash is
    /// added so that endpoint paths are joined beneath it.
    pub fn new(
        http: HttpClient,
        base_url: &str,
        auth_scheme: &str,
        token: &str,
    ) -> Result<Self, FetchError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))?;

        Ok(Self {
            http,
            base_url,
            auth_header: format!("{auth_scheme} {token}"),
        })
    }

    /// Resolves an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Fetches every item from a paginated endpoint.
    ///
    /// `query` is sent with the first request only; `next` links already
    /// carry their own query string.
    #[instrument(skip(self, query), fields(endpoint = %path))]
    pub async fn get_all(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, FetchError> {
        let mut url = self.endpoint(path)?;
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut page_query = query;
        let mut pages = 0usize;

        loop {
            seen.insert(url.to_string());
            let body = self.http.get_json(&url, &self.auth_header, page_query).await?;
            let page = parse_page(body)?;
            pages += 1;
            debug!(page = pages, items = page.items.len(), "Fetched page");
            items.extend(page.items);

            let Some(next) = page.next else {
                break;
            };
            let next_url = url
                .join(&next)
                .map_err(|e| FetchError::InvalidUrl(format!("{next}: {e}")))?;
            if seen.contains(next_url.as_str()) {
                warn!(next = %next_url, "Pagination loop detected, stopping");
                break;
            }
            url = next_url;
            page_query = &[];
        }

        info!(pages, items = items.len(), "Fetch complete");
        Ok(items)
    }

    /// Fetches the raw items of `dataset` for `range`.
    ///
    /// Date parameters are only sent to endpoints that accept them; the
    /// caller still filters by range.
    pub async fn fetch_dataset(
        &self,
        dataset: Dataset,
        range: &DateRange,
    ) -> Result<Vec<Value>, FetchError> {
        let query = if dataset.sends_date_params() {
            vec![("start", range.api_start()), ("end", range.api_end())]
        } else {
            Vec::new()
        };
        self.get_all(dataset.endpoint(), &query).await
    }

    /// Fetches the tool id to name table.
    pub async fn fetch_tools(&self) -> Result<BTreeMap<String, String>, FetchError> {
        let items = self.get_all(TOOLS_ENDPOINT, &[]).await?;
        Ok(parse_tools(&items))
    }

    /// Fetches the user table.
    pub async fn fetch_users(&self) -> Result<BTreeMap<String, UserInfo>, FetchError> {
        let items = self.get_all(USERS_ENDPOINT, &[]).await?;
        Ok(parse_users(&items))
    }
}
