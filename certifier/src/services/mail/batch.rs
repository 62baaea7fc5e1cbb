use super::{CertificateMailer, Relay};
use crate::config::Settings;
use crate::error::BatchError;
use crate::services::data_sources::read_table;
use common::jobs::{Delivery, FailedDelivery, MailReport, SkippedRow};
use common::model::filename::FilenamePlan;
use common::model::participant::Participant;
use log::{error, info, warn};

/// Emails every row of the sheet the certificate generated for its name.
///
/// Rows are processed in sheet order. A row without an email or a name is
/// skipped, and a row whose message cannot be built or delivered is recorded
/// as failed; neither stops the batch. A relay that refuses the credentials
/// does, whether that happens on the first connection or halfway through; the
/// error then carries the report of the rows handled so far.
pub fn send_certificates<R: Relay>(settings: &Settings, relay: R) -> Result<MailReport, BatchError> {
    let source = &settings.source;
    let table = read_table(source)?;
    let columns =
        table.require_columns(&[source.name_column.as_str(), source.email_column.as_str()])?;
    let participants = table.participants(columns[0], Some(columns[1]));

    let mailer = CertificateMailer::new(&settings.mail, relay).map_err(BatchError::Mail)?;
    let plan = FilenamePlan::new(participants.iter().map(Participant::trimmed_name));
    let output_dir = &settings.certificate.output_dir;

    let mut report = MailReport {
        total_rows: participants.len(),
        ..MailReport::default()
    };
    info!("Sending certificates to {} participant row(s)", report.total_rows);

    if let Err(e) = mailer.relay().verify() {
        if e.is_fatal() {
            error!("{}", e);
            return Err(BatchError::Authentication {
                reason: e.to_string(),
                report: Box::new(report),
            });
        }
        warn!("Could not check the mail relay before sending: {}", e);
    }

    for participant in &participants {
        let name = participant.trimmed_name();
        let recipient = match participant.address() {
            Some(address) if participant.is_mailable() => address,
            _ => {
                warn!(
                    "Row {} (name: '{}') has no usable email or name, skipping",
                    participant.row, name
                );
                report.skipped.push(SkippedRow {
                    row: participant.row,
                    name: name.to_string(),
                });
                continue;
            }
        };

        let attachment = output_dir.join(plan.certificate_for(name));
        match mailer.send(recipient, name, &attachment) {
            Ok(()) => {
                match mailer.cc() {
                    Some(cc) => info!(
                        "Sent {} to {} (cc: {})",
                        attachment.display(),
                        recipient,
                        cc
                    ),
                    None => info!("Sent {} to {}", attachment.display(), recipient),
                }
                report.sent.push(Delivery {
                    row: participant.row,
                    recipient: recipient.to_string(),
                    attachment,
                });
            }
            Err(e) if e.is_fatal() => {
                error!(
                    "{} while sending row {}; stopping after {} message(s) sent",
                    e,
                    participant.row,
                    report.sent.len()
                );
                return Err(BatchError::Authentication {
                    reason: e.to_string(),
                    report: Box::new(report),
                });
            }
            Err(e) => {
                error!(
                    "Row {}: could not send the certificate of '{}' to {}: {}",
                    participant.row, name, recipient, e
                );
                report.failed.push(FailedDelivery {
                    row: participant.row,
                    recipient: recipient.to_string(),
                    name: name.to_string(),
                    kind: e.kind(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Mailing finished: {} sent, {} skipped, {} failed",
        report.sent.len(),
        report.skipped.len(),
        report.failed.len()
    );
    Ok(report)
}
