//! Builds the live record source and storage client from configuration.

use tally_core::{JobError, Phase, PhaseExt};
use tally_drive::{Credentials, DriveClient, DriveError, TokenProvider};
use tally_fetch::{ApiRecordSource, HttpClient, LabApi};
use tally_store::{JobConfig, TokenCache};
use tracing::debug;

/// Record source for the lab API described by `config`.
pub fn record_source(config: &JobConfig) -> Result<ApiRecordSource, JobError> {
    let http = HttpClient::with_timeout(config.http_timeout).in_phase(Phase::Config)?;
    let api = LabApi::new(
        http,
        &config.api_base_url,
        &config.api_auth_scheme,
        &config.api_token,
    )
    .in_phase(Phase::Config)?;
    Ok(ApiRecordSource::new(api).with_max_records(config.max_records))
}

/// Storage client using the credentials file named by `config`.
///
/// Credentials are read here so that a missing or malformed file fails
/// before any network call.
pub fn storage(config: &JobConfig) -> Result<DriveClient, JobError> {
    let credentials = Credentials::load(&config.credentials_file).in_phase(Phase::Config)?;
    debug!(kind = credentials.kind(), "Storage credentials ready");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .map_err(DriveError::from)
        .in_phase(Phase::Config)?;
    let auth = TokenProvider::new(
        http.clone(),
        credentials,
        TokenCache::new(config.token_cache.clone()),
    );
    Ok(DriveClient::new(http, &config.drive_api_base, auth))
}
