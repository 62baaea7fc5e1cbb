//! # Certificate generation batch
//!
//! 1.  Read the participants sheet and check that the name column exists. A
//!     missing file or column stops the batch before anything is written.
//! 2.  Collect the distinct non-blank names, in first-seen order.
//! 3.  Plan the filenames, load fonts and background once, and make sure the
//!     output directory exists.
//! 4.  Render one certificate per name. A failed render is logged and recorded
//!     in the report; the batch moves on to the next name.

use crate::config::Settings;
use crate::error::BatchError;
use crate::services::data_sources::read_table;
use crate::services::templates::pdf::CertificateRenderer;
use common::jobs::{GenerationReport, RenderFailure};
use common::model::filename::FilenamePlan;
use common::model::participant::Participant;
use log::{error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub fn generate_certificates(settings: &Settings) -> Result<GenerationReport, BatchError> {
    let table = read_table(&settings.source)?;
    let columns = table.require_columns(&[settings.source.name_column.as_str()])?;
    let participants = table.participants(columns[0], None);

    let names = distinct_names(&participants);
    if names.is_empty() {
        warn!(
            "No participant names found in column '{}', nothing to generate",
            settings.source.name_column
        );
        return Ok(GenerationReport::default());
    }
    info!("Generating certificates for {} participant(s)", names.len());

    let plan = FilenamePlan::new(names.iter().copied());
    let renderer = CertificateRenderer::new(&settings.certificate)?;
    let output_dir = &settings.certificate.output_dir;
    ensure_output_dir(output_dir)?;

    let mut report = GenerationReport {
        names: names.len(),
        ..GenerationReport::default()
    };
    for name in names {
        let path = output_dir.join(plan.certificate_for(name));
        match renderer.render_to_file(name, &path) {
            Ok(()) => {
                info!("Certificate for '{}' written to '{}'", name, path.display());
                report.generated.push(path);
            }
            Err(e) => {
                error!("Could not generate the certificate for '{}': {}", name, e);
                report.failed.push(RenderFailure {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "{} certificate(s) generated in '{}', {} failed",
        report.generated.len(),
        output_dir.display(),
        report.failed.len()
    );
    Ok(report)
}

/// Trimmed, non-blank names with duplicates removed, in sheet order.
pub fn distinct_names(participants: &[Participant]) -> Vec<&str> {
    let mut seen = HashSet::new();
    participants
        .iter()
        .map(Participant::trimmed_name)
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .collect()
}

/// Creates `dir` and its parents. Succeeds when it already exists.
pub fn ensure_output_dir(dir: &Path) -> Result<(), BatchError> {
    fs::create_dir_all(dir).map_err(|source| BatchError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}
