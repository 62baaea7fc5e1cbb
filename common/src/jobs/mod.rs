use serde::Serialize;
use std::path::PathBuf;

/// Result of one certificate generation batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Distinct participant names found in the sheet.
    pub names: usize,
    /// Certificates written, in generation order.
    pub generated: Vec<PathBuf>,
    pub failed: Vec<RenderFailure>,
}

/// A certificate that could not be rendered.
#[derive(Debug, Clone, Serialize)]
pub struct RenderFailure {
    pub name: String,
    pub reason: String,
}

/// Result of one mailing batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MailReport {
    /// Rows read from the sheet, including the ones skipped.
    pub total_rows: usize,
    pub sent: Vec<Delivery>,
    /// Rows without a usable email or name.
    pub skipped: Vec<SkippedRow>,
    pub failed: Vec<FailedDelivery>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub row: usize,
    pub recipient: String,
    pub attachment: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDelivery {
    pub row: usize,
    pub recipient: String,
    pub name: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Why a single message was not delivered. None of these stop the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// The certificate for the row was not found on disk.
    MissingAttachment,
    InvalidAddress,
    Transport,
}
