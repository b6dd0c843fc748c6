pub mod chrome;
pub mod dom;
pub mod page;
pub mod session;

use thiserror::Error;

/// Failure taxonomy for the browser session layer. Everything here is
/// converted to a plain user-facing string at the calendar operation boundary.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(
        "The browser profile is already in use by process {holder}. Close the existing browser instance and retry."
    )]
    ProfileLocked { holder: String },
    #[error(
        "Failed to launch the browser ({0}). Close any existing browser instance using this profile and retry."
    )]
    Launch(String),
    #[error("Timed out waiting for login. Complete the sign-in in the opened browser window and retry.")]
    LoginTimeout,
    #[error("Timed out waiting for the calendar page to load.")]
    ReadyTimeout,
    #[error("No element matched selector {0}")]
    NotFound(String),
    #[error("Navigation failed: {0}")]
    Navigation(String),
    #[error("Browser call failed: {0}")]
    Backend(String),
}
