use super::background::{Background, BackgroundKind};
use super::text::{parse_styles, substitute, TextStyle};
use crate::config::{BuiltinFont, CertificateSettings, FontSettings, HexColor};
use genpdf::elements::Paragraph;
use genpdf::error::Error;
use genpdf::fonts::{Builtin, FontData, FontFamily};
use genpdf::render::Area;
use genpdf::style::{Color, Style, StyledString};
use genpdf::{Alignment, Context, Document, Element, Mm, RenderResult, Size};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable font family in '{dir}' (tried {families:?}): {reason}")]
    Fonts {
        dir: PathBuf,
        families: Vec<String>,
        reason: String,
    },

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("could not write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<Error> for RenderError {
    fn from(e: Error) -> Self {
        RenderError::Pdf(e.to_string())
    }
}

impl From<HexColor> for Color {
    fn from(color: HexColor) -> Self {
        Color::Rgb(color.r, color.g, color.b)
    }
}

impl From<BuiltinFont> for Builtin {
    fn from(font: BuiltinFont) -> Self {
        match font {
            BuiltinFont::Helvetica => Builtin::Helvetica,
            BuiltinFont::Times => Builtin::Times,
            BuiltinFont::Courier => Builtin::Courier,
        }
    }
}

/// Renders one certificate per participant name.
///
/// Fonts and the page background are loaded once, when the renderer is built;
/// each call to [`CertificateRenderer::render_to_file`] then only lays out text.
pub struct CertificateRenderer {
    settings: CertificateSettings,
    fonts: FontFamily<FontData>,
    background: Background,
}

impl CertificateRenderer {
    pub fn new(settings: &CertificateSettings) -> Result<Self, RenderError> {
        let fonts = load_font(&settings.fonts)?;
        let background = Background::prepare(
            &settings.background_image,
            settings.colors.fallback_fill,
            settings.page.dimensions_mm(),
        );
        Ok(Self {
            settings: settings.clone(),
            fonts,
            background,
        })
    }

    pub fn background(&self) -> &BackgroundKind {
        self.background.kind()
    }

    /// Writes the certificate for `name` to `path`, replacing any existing file.
    /// Nothing is written when rendering fails.
    pub fn render_to_file(&self, name: &str, path: &Path) -> Result<(), RenderError> {
        let mut buffer = Vec::new();
        self.build_document(name).render(&mut buffer)?;
        fs::write(path, buffer).map_err(|source| RenderError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn build_document(&self, name: &str) -> Document {
        let s = &self.settings;
        let values = HashMap::from([
            ("name", name.trim()),
            ("date", s.event_date.as_str()),
            ("workload", s.workload.as_str()),
        ]);
        let color = Color::from(s.colors.text);

        let mut doc = self.configure_document(&substitute(&s.title, &values));

        doc.push(Spacer(s.spacing.top));
        doc.push(template_paragraph(
            &s.title,
            &values,
            Style::new()
                .bold()
                .with_font_size(s.font_sizes.title)
                .with_color(color),
        ));
        doc.push(Spacer(s.spacing.after_title));
        doc.push(template_paragraph(
            &s.body_template,
            &values,
            Style::new()
                .with_font_size(s.font_sizes.body)
                .with_line_spacing(s.body_line_spacing)
                .with_color(color),
        ));
        doc.push(Spacer(s.spacing.before_footer));
        doc.push(template_paragraph(
            &s.footer,
            &values,
            Style::new()
                .with_font_size(s.font_sizes.footer)
                .with_color(color),
        ));
        doc
    }

    /// Configure and return a genpdf Document with font, page geometry and decorator set.
    fn configure_document(&self, title: &str) -> Document {
        let s = &self.settings;
        let mut doc = Document::new(self.fonts.clone());
        doc.set_title(title);
        let (width, height) = s.page.dimensions_mm();
        doc.set_paper_size(Size::new(width, height));
        doc.set_font_size(s.font_sizes.body);
        doc.set_line_spacing(1.0);
        doc.set_page_decorator(self.background.decorator(s.margin_mm));
        doc
    }
}

/// Load the first font family of `fonts.families` that has all four TTF files.
fn load_font(fonts: &FontSettings) -> Result<FontFamily<FontData>, RenderError> {
    let mut last_error = None;
    for family in &fonts.families {
        let builtin = fonts.builtin.map(Builtin::from);
        match genpdf::fonts::from_files(&fonts.dir, family, builtin) {
            Ok(loaded) => {
                debug!("Loaded font family {} from '{}'", family, fonts.dir.display());
                return Ok(loaded);
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(RenderError::Fonts {
        dir: fonts.dir.clone(),
        families: fonts.families.clone(),
        reason: last_error.unwrap_or_else(|| "no font family configured".to_string()),
    })
}

fn emphasis(style: TextStyle) -> Style {
    match style {
        TextStyle::Regular => Style::new(),
        TextStyle::Bold => Style::new().bold(),
        TextStyle::Italic => Style::new().italic(),
        TextStyle::BoldItalic => Style::new().bold().italic(),
    }
}

/// A centred paragraph built from a template line. Markup is parsed before the
/// placeholders are filled in, so values are always printed literally.
fn template_paragraph(
    template: &str,
    values: &HashMap<&str, &str>,
    base: Style,
) -> impl Element {
    let mut paragraph = Paragraph::default();
    for segment in parse_styles(template) {
        let text = substitute(&segment.text, values);
        if !text.is_empty() {
            paragraph.push(StyledString::new(text, emphasis(segment.style)));
        }
    }
    paragraph.aligned(Alignment::Center).styled(base)
}

/// Fixed vertical gap, in millimetres.
struct Spacer(f64);

impl Element for Spacer {
    fn render(
        &mut self,
        _context: &Context,
        area: Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let available = area.size().height;
        let wanted = Mm::from(self.0);
        result.size = Size::new(0.0, if wanted > available { available } else { wanted });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HexColor, PageSettings, PaperSize};

    /// A four-style TTF family usable by genpdf. `_copy` keeps a renamed copy
    /// alive when the family had to be assembled from differently named files.
    struct TestFonts {
        _copy: Option<tempfile::TempDir>,
        dir: PathBuf,
        family: String,
    }

    const STYLES: [&str; 4] = ["Regular", "Bold", "Italic", "BoldItalic"];

    /// Liberation Sans when installed (or under `CERTIFIER_TEST_FONTS`),
    /// otherwise DejaVu Sans copied under genpdf's file names.
    fn test_fonts() -> Option<TestFonts> {
        let liberation = std::env::var_os("CERTIFIER_TEST_FONTS")
            .map(PathBuf::from)
            .into_iter()
            .chain(
                [
                    "/usr/share/fonts/truetype/liberation",
                    "/usr/share/fonts/liberation-sans",
                    "/usr/share/fonts/liberation",
                ]
                .map(PathBuf::from),
            )
            .find(|dir| {
                STYLES
                    .iter()
                    .all(|style| dir.join(format!("LiberationSans-{style}.ttf")).is_file())
            });
        if let Some(dir) = liberation {
            return Some(TestFonts {
                _copy: None,
                dir,
                family: "LiberationSans".to_string(),
            });
        }

        let dejavu = [
            "/usr/share/fonts/truetype/dejavu",
            "/usr/share/fonts/dejavu",
            "/usr/share/fonts/TTF",
        ]
        .map(PathBuf::from)
        .into_iter()
        .find(|dir| dir.join("DejaVuSans.ttf").is_file())?;
        let copy = tempfile::tempdir().ok()?;
        let sources = ["", "-Bold", "-Oblique", "-BoldOblique"];
        for (style, suffix) in STYLES.iter().zip(sources) {
            fs::copy(
                dejavu.join(format!("DejaVuSans{suffix}.ttf")),
                copy.path().join(format!("TestSans-{style}.ttf")),
            )
            .ok()?;
        }
        Some(TestFonts {
            dir: copy.path().to_path_buf(),
            _copy: Some(copy),
            family: "TestSans".to_string(),
        })
    }

    /// Fails loudly instead of skipping, so a machine without fonts is noticed.
    fn require_fonts() -> TestFonts {
        test_fonts().expect("rendering tests need Liberation Sans or DejaVu Sans installed")
    }

    fn settings(fonts: &TestFonts, out: &Path) -> CertificateSettings {
        let mut settings = CertificateSettings::default();
        settings.fonts.dir = fonts.dir.clone();
        settings.fonts.families = vec![fonts.family.clone()];
        settings.output_dir = out.to_path_buf();
        settings.background_image = out.join("missing-background.png");
        settings
    }

    fn count(pattern: &str, pdf: &[u8]) -> usize {
        regex::bytes::Regex::new(pattern).unwrap().find_iter(pdf).count()
    }

    #[test]
    fn missing_fonts_are_a_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = CertificateSettings::default();
        settings.fonts.dir = dir.path().join("fonts");

        let err = CertificateRenderer::new(&settings).err().expect("fonts are missing");
        match err {
            RenderError::Fonts { families, .. } => assert_eq!(families, ["LiberationSans", "Arial"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn renders_a_pdf_with_fallback_background() {
        let fonts = require_fonts();
        let dir = tempfile::tempdir().unwrap();
        let renderer = CertificateRenderer::new(&settings(&fonts, dir.path())).unwrap();
        assert_eq!(
            renderer.background(),
            &BackgroundKind::SolidFill(HexColor::new(0xd3, 0xd3, 0xd3))
        );

        let path = dir.path().join("Ana_Silva_certificado.pdf");
        renderer.render_to_file("Ana Silva", &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn every_page_of_a_long_certificate_carries_the_background() {
        let fonts = require_fonts();
        let dir = tempfile::tempdir().unwrap();
        let renderer = CertificateRenderer::new(&settings(&fonts, dir.path())).unwrap();

        let path = dir.path().join("long.pdf");
        renderer
            .render_to_file(&"Ana Maria ".repeat(400), &path)
            .unwrap();

        let bytes = fs::read(&path).unwrap();
        let pages = count(r"/Type\s*/Page\b", &bytes);
        assert!(pages >= 2, "expected the body to overflow, got {pages} page(s)");
        assert_eq!(count(r"/Subtype\s*/Image", &bytes), pages);
    }

    #[test]
    fn overwrites_existing_certificate() {
        let fonts = require_fonts();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ana_Silva_certificado.pdf");
        fs::write(&path, b"stale").unwrap();

        let renderer = CertificateRenderer::new(&settings(&fonts, dir.path())).unwrap();
        renderer.render_to_file("Ana Silva", &path).unwrap();
        assert!(fs::read(&path).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn renders_with_an_image_background_and_portrait_letter() {
        let fonts = require_fonts();
        let dir = tempfile::tempdir().unwrap();
        let background = dir.path().join("fundo.png");
        image::RgbImage::from_pixel(300, 200, image::Rgb([240, 248, 255]))
            .save(&background)
            .unwrap();

        let mut settings = settings(&fonts, dir.path());
        settings.background_image = background.clone();
        settings.page = PageSettings {
            size: PaperSize::Letter,
            landscape: false,
        };
        settings.body_template = "Certificamos que **{{name}}** participou".to_string();

        let renderer = CertificateRenderer::new(&settings).unwrap();
        assert_eq!(renderer.background(), &BackgroundKind::Image(background));

        let path = dir.path().join("out.pdf");
        renderer.render_to_file("Bruno Costa,", &path).unwrap();
        assert!(fs::read(&path).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn write_failures_are_reported() {
        let fonts = require_fonts();
        let dir = tempfile::tempdir().unwrap();
        let renderer = CertificateRenderer::new(&settings(&fonts, dir.path())).unwrap();

        let err = renderer
            .render_to_file("Ana", &dir.path().join("no-such-dir").join("a.pdf"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Write { .. }));
    }
}
