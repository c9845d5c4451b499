use crate::data::{Storage, StoreError, StoredUrl, UrlCheck};
use crate::submission::{self, SubmissionError};
use sitecheck_probe::{ProbeError, Prober};
use thiserror::Error;
use tracing::{error, info, warn};

/// Result of submitting a raw url.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A new url row was created.
    Created(StoredUrl),
    /// An equivalent url was already tracked; no row was created.
    Existing(StoredUrl),
}

impl SubmitOutcome {
    pub fn url(&self) -> &StoredUrl {
        match self {
            SubmitOutcome::Created(url) | SubmitOutcome::Existing(url) => url,
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] SubmissionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submit a raw url: validate, normalize, then find-or-create by the
/// normalized name.
///
/// Two concurrent submissions of the same name can both pass the lookup;
/// the UNIQUE constraint decides the winner and the loser resolves the
/// duplicate by retrying the lookup.
pub fn submit(storage: &Storage, raw: &str) -> Result<SubmitOutcome, SubmitError> {
    let parsed = match submission::validate(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "rejected url submission");
            return Err(e.into());
        }
    };

    let name = submission::normalize(&parsed);

    if let Some(existing) = storage.find_url_by_name(&name)? {
        return Ok(SubmitOutcome::Existing(existing));
    }

    match storage.create_url(&name) {
        Ok(url) => Ok(SubmitOutcome::Created(url)),
        Err(StoreError::Duplicate) => {
            // Lost the insert race; the row exists now.
            match storage.find_url_by_name(&name)? {
                Some(existing) => Ok(SubmitOutcome::Existing(existing)),
                None => Err(SubmitError::Store(StoreError::Duplicate)),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Result of running a check against a tracked url.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The fetch succeeded and a check row was recorded.
    Recorded(UrlCheck),
    /// The fetch failed; nothing was persisted.
    Failed(ProbeError),
    /// No url with the given id exists.
    UnknownUrl,
}

/// Fetch the page behind a tracked url and record the extracted metadata
/// as a new check.
///
/// A failed fetch leaves the check history untouched.
pub async fn run_check(
    storage: &Storage,
    prober: &Prober,
    id: i64,
) -> Result<CheckOutcome, StoreError> {
    let Some(url) = storage.find_url_by_id(id)? else {
        return Ok(CheckOutcome::UnknownUrl);
    };

    match prober.probe(&url.name).await {
        Ok(page) => {
            let check = storage.create_check(
                url.id,
                Some(page.status_code),
                page.h1.as_deref(),
                page.title.as_deref(),
                page.description.as_deref(),
            )?;
            info!(url = %url.name, status = page.status_code, "check succeeded");
            Ok(CheckOutcome::Recorded(check))
        }
        Err(e) => {
            error!(url = %url.name, error = %e, "check failed");
            Ok(CheckOutcome::Failed(e))
        }
    }
}
