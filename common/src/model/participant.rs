use serde::{Deserialize, Serialize};

/// One record of the participants sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Spreadsheet line the record came from. The header is line 1.
    pub row: usize,
    /// Full name exactly as typed in the sheet.
    pub name: String,
    /// `None` when the sheet has no email column or the cell is blank.
    pub email: Option<String>,
}

impl Participant {
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }

    /// Address to deliver to, ignoring surrounding whitespace.
    pub fn address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }

    /// A row can be mailed only when it has both an address and a name.
    pub fn is_mailable(&self) -> bool {
        self.address().is_some() && !self.trimmed_name().is_empty()
    }
}
