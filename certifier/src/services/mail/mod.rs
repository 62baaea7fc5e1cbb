//! Emailing the generated certificates.
//!
//! Messages go out one at a time through a [`Relay`]. The production relay is
//! [`SmtpRelay`], which opens a fresh STARTTLS session for every message and
//! logs in after the upgrade. A failed login is the only error that stops the
//! batch; see [`MailError::is_fatal`].

mod batch;
mod message;
mod transport;

pub use batch::send_certificates;
pub use message::CertificateMailer;
pub use transport::{Relay, SmtpRelay};

use common::jobs::FailureKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("certificate '{0}' not found")]
    MissingAttachment(PathBuf),

    #[error("could not read certificate '{path}': {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("could not build the message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("authentication rejected by the mail relay: {0}")]
    Authentication(String),

    #[error("mail relay error: {0}")]
    Transport(String),
}

impl MailError {
    /// No later message can succeed once the relay has refused the credentials.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MailError::Authentication(_))
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            MailError::MissingAttachment(_) | MailError::Attachment { .. } => {
                FailureKind::MissingAttachment
            }
            MailError::InvalidAddress { .. } => FailureKind::InvalidAddress,
            MailError::Build(_)
            | MailError::ContentType(_)
            | MailError::Authentication(_)
            | MailError::Transport(_) => FailureKind::Transport,
        }
    }
}
