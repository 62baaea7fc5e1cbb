use super::{MailError, Relay};
use crate::config::MailSettings;
use crate::services::templates::text::substitute;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const FALLBACK_CONTENT_TYPE: &str = "application/pdf";

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|source| MailError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// Composes and sends one certificate per call.
pub struct CertificateMailer<R> {
    sender: Mailbox,
    cc: Option<Mailbox>,
    subject: String,
    body_template: String,
    relay: R,
}

impl<R: Relay> CertificateMailer<R> {
    /// Fails when the sender or CC address does not parse.
    pub fn new(settings: &MailSettings, relay: R) -> Result<Self, MailError> {
        let cc = settings
            .cc
            .as_deref()
            .filter(|cc| !cc.trim().is_empty())
            .map(parse_mailbox)
            .transpose()?;
        Ok(Self {
            sender: parse_mailbox(&settings.sender)?,
            cc,
            subject: settings.subject.clone(),
            body_template: settings.body_template.clone(),
            relay,
        })
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn cc(&self) -> Option<&Mailbox> {
        self.cc.as_ref()
    }

    /// Multipart message with the plain-text greeting and `attachment`.
    pub fn compose(&self, recipient: &str, name: &str, attachment: &Path) -> Result<Message, MailError> {
        if !attachment.is_file() {
            return Err(MailError::MissingAttachment(attachment.to_path_buf()));
        }
        let data = fs::read(attachment).map_err(|source| MailError::Attachment {
            path: attachment.to_path_buf(),
            source,
        })?;
        let to = parse_mailbox(recipient)?;

        let content_type = mime_guess::from_path(attachment)
            .first_raw()
            .unwrap_or(FALLBACK_CONTENT_TYPE);
        let filename = attachment
            .file_name()
            .map(|file| file.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("Attaching {} as {}", filename, content_type);

        let body = substitute(&self.body_template, &HashMap::from([("name", name.trim())]));

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(self.subject.as_str());
        if let Some(cc) = &self.cc {
            builder = builder.cc(cc.clone());
        }

        let message = builder.multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body))
                .singlepart(Attachment::new(filename).body(data, ContentType::parse(content_type)?)),
        )?;
        Ok(message)
    }

    /// Composes the message and hands it to the relay.
    pub fn send(&self, recipient: &str, name: &str, attachment: &Path) -> Result<(), MailError> {
        let message = self.compose(recipient, name, attachment)?;
        self.relay.deliver(&message)
    }
}
