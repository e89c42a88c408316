// ABOUTME: Validated domain types shared across the orchestrator.
// ABOUTME: Application names and timestamp-based release identifiers.

mod application_name;
mod release_id;

pub use application_name::{ApplicationName, ApplicationNameError};
pub use release_id::{RELEASE_FORMAT, ReleaseId, ReleaseIdError};
