use crate::config::ConfigError;
use crate::services::data_sources::SourceError;
use crate::services::mail::MailError;
use crate::services::templates::pdf::RenderError;
use common::jobs::MailReport;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop a whole batch. Anything that concerns a single row is
/// recorded in the batch report instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not prepare the certificate renderer: {0}")]
    Renderer(#[from] RenderError),

    #[error("could not create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mail settings: {0}")]
    Mail(MailError),

    /// `report` holds what happened to the rows handled before the refusal.
    #[error("the mail relay rejected the credentials, no further certificates will be sent: {reason}")]
    Authentication {
        reason: String,
        report: Box<MailReport>,
    },
}
