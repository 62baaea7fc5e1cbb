mod support;

use certifier::services::mail::{send_certificates, MailError, Relay};
use certifier::services::merge::generate_certificates;
use certifier::Settings;
use lettre::Message;
use std::cell::Cell;
use std::fs;
use std::path::Path;
use support::{test_fonts, TestFonts};

#[derive(Default)]
struct CountingRelay {
    delivered: Cell<usize>,
}

impl Relay for CountingRelay {
    fn verify(&self) -> Result<(), MailError> {
        Ok(())
    }

    fn deliver(&self, _message: &Message) -> Result<(), MailError> {
        self.delivered.set(self.delivered.get() + 1);
        Ok(())
    }
}

fn settings(dir: &Path, fonts: &TestFonts) -> Settings {
    let mut settings = Settings::default();
    settings.source.path = dir.join("participantes.csv");
    fs::write(
        &settings.source.path,
        "Nome completo:,E-mail:\nAna Silva,ana@example.com\n\"Bruno Costa,\",\nAna Silva,ana@example.com\n",
    )
    .unwrap();
    settings.certificate.output_dir = dir.join("certificados");
    settings.certificate.background_image = dir.join("fundo.png");
    settings.certificate.fonts.dir = fonts.dir.clone();
    settings.certificate.fonts.families = vec![fonts.family.clone()];
    settings
}

#[test]
fn generated_certificates_are_found_by_the_mailer() {
    let fonts = test_fonts();
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &fonts);

    let generated = generate_certificates(&settings).unwrap();
    assert_eq!(generated.names, 2);
    assert!(generated.failed.is_empty());
    let out = &settings.certificate.output_dir;
    assert_eq!(
        generated.generated,
        [
            out.join("Ana_Silva_certificado.pdf"),
            out.join("Bruno_Costa_certificado.pdf")
        ]
    );
    for path in &generated.generated {
        assert!(fs::read(path).unwrap().starts_with(b"%PDF-"));
    }

    let relay = CountingRelay::default();
    let sent = send_certificates(&settings, &relay).unwrap();
    assert_eq!(sent.total_rows, 3);
    assert_eq!(sent.sent.len(), 2);
    assert_eq!(sent.skipped.len(), 1);
    assert!(sent.failed.is_empty());
    assert_eq!(relay.delivered.get(), 2);
}

#[test]
fn generating_twice_overwrites() {
    let fonts = test_fonts();
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), &fonts);

    let first = generate_certificates(&settings).unwrap();
    let second = generate_certificates(&settings).unwrap();
    assert_eq!(first.generated, second.generated);
    assert_eq!(fs::read_dir(&settings.certificate.output_dir).unwrap().count(), 2);
}
