use super::MailError;
use crate::config::MailSettings;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{Message, SmtpTransport, Transport};
use log::debug;

/// SMTP reply codes that mean the credentials were refused.
const AUTHENTICATION_CODES: [&str; 3] = ["530", "534", "535"];

/// Something that can deliver a finished message.
pub trait Relay {
    /// Connects and authenticates without sending anything.
    fn verify(&self) -> Result<(), MailError>;

    fn deliver(&self, message: &Message) -> Result<(), MailError>;
}

impl<R: Relay + ?Sized> Relay for &R {
    fn verify(&self) -> Result<(), MailError> {
        (**self).verify()
    }

    fn deliver(&self, message: &Message) -> Result<(), MailError> {
        (**self).deliver(message)
    }
}

/// Plain connection upgraded with STARTTLS, then login. Nothing is pooled, so
/// each message gets its own session.
pub struct SmtpRelay {
    transport: SmtpTransport,
}

impl SmtpRelay {
    /// The login defaults to the sender's address.
    pub fn new(settings: &MailSettings) -> Result<Self, MailError> {
        let username = match &settings.username {
            Some(username) => username.clone(),
            None => settings
                .sender
                .parse::<Mailbox>()
                .map_err(|source| MailError::InvalidAddress {
                    address: settings.sender.clone(),
                    source,
                })?
                .email
                .to_string(),
        };
        debug!(
            "Using relay {}:{} as {}",
            settings.host, settings.port, username
        );

        let transport = SmtpTransport::starttls_relay(&settings.host)
            .map_err(classify)?
            .port(settings.port)
            .credentials(Credentials::new(username, settings.password.clone()))
            .build();
        Ok(Self { transport })
    }
}

impl Relay for SmtpRelay {
    fn verify(&self) -> Result<(), MailError> {
        match self.transport.test_connection() {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Transport(
                "the relay closed the connection".to_string(),
            )),
            Err(e) => Err(classify(e)),
        }
    }

    fn deliver(&self, message: &Message) -> Result<(), MailError> {
        self.transport.send(message).map(|_| ()).map_err(classify)
    }
}

fn classify(error: SmtpError) -> MailError {
    match error.status() {
        Some(code) if is_authentication_code(&code.to_string()) => {
            MailError::Authentication(error.to_string())
        }
        _ => MailError::Transport(error.to_string()),
    }
}

pub(crate) fn is_authentication_code(code: &str) -> bool {
    AUTHENTICATION_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_codes() {
        assert!(is_authentication_code("535"));
        assert!(is_authentication_code("534"));
        assert!(is_authentication_code("530"));
        assert!(!is_authentication_code("550"));
        assert!(!is_authentication_code("421"));
    }

    #[test]
    fn relay_builds_without_connecting() {
        let settings = MailSettings {
            host: "localhost".to_string(),
            port: 2525,
            ..MailSettings::default()
        };
        assert!(SmtpRelay::new(&settings).is_ok());
    }

    #[test]
    fn sender_must_be_an_address_when_no_username_is_set() {
        let settings = MailSettings {
            sender: "not an address".to_string(),
            ..MailSettings::default()
        };
        assert!(matches!(
            SmtpRelay::new(&settings),
            Err(MailError::InvalidAddress { .. })
        ));
    }
}
