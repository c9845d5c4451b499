pub mod data;
pub mod submission;
pub mod workflow;

pub use data::{Storage, StoreError, StoredUrl, UrlCheck, UrlSummary};
pub use submission::SubmissionError;
pub use workflow::{CheckOutcome, SubmitError, SubmitOutcome};
