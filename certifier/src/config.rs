//! Runtime settings.
//!
//! Everything that used to be a constant at the top of a script lives here: the
//! participants sheet and its column titles, the certificate texts and layout,
//! and the mail relay. Settings are read from a TOML file whose relative paths
//! are resolved against the directory holding the file. Every field has a
//! default, so a file only needs to name what differs from it.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "certifier.toml";

/// Overrides `mail.password` so the secret can stay out of the file.
pub const PASSWORD_ENV: &str = "CERTIFIER_SMTP_PASSWORD";

const MM_PER_INCH: f64 = 25.4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid colour '{0}', expected #rrggbb")]
    Color(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source: SourceSettings,
    pub certificate: CertificateSettings,
    pub mail: MailSettings,
}

impl Settings {
    /// Reads the file at `path`, resolves relative paths against its directory
    /// and applies [`PASSWORD_ENV`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        settings.resolve_paths(base);
        settings.apply_password_override(std::env::var(PASSWORD_ENV).ok());
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Makes every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let paths = [
            &mut self.source.path,
            &mut self.certificate.output_dir,
            &mut self.certificate.background_image,
            &mut self.certificate.fonts.dir,
        ];
        for path in paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn apply_password_override(&mut self, password: Option<String>) {
        if let Some(password) = password {
            debug!("Applying environment overwrite for mail.password=>{}", PASSWORD_ENV);
            self.mail.password = password;
        }
    }
}

/// Where the participants come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// The participants workbook (`.xlsx`, `.xls`, `.ods`, ...) or a delimited
    /// text export of it.
    pub path: PathBuf,
    /// Worksheet to read from a workbook. Defaults to the first one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Header of the full-name column. Must match exactly, trailing colon included.
    pub name_column: String,
    pub email_column: String,
    /// Field delimiter; guessed from the header line when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("participantes.xlsx"),
            sheet: None,
            name_column: "Nome completo:".to_string(),
            email_column: "E-mail:".to_string(),
            delimiter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertificateSettings {
    pub output_dir: PathBuf,
    pub background_image: PathBuf,
    pub event_date: String,
    pub workload: String,
    pub title: String,
    /// Supports `{{name}}`, `{{date}}`, `{{workload}}` and `**bold**`/`*italic*`.
    pub body_template: String,
    pub footer: String,
    pub page: PageSettings,
    pub margin_mm: f64,
    pub spacing: SpacingSettings,
    pub colors: ColorSettings,
    pub fonts: FontSettings,
    pub font_sizes: FontSizes,
    pub body_line_spacing: f64,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("certificados"),
            background_image: PathBuf::from("Arquivos/fundo.png"),
            event_date: "25 de Agosto de 2025".to_string(),
            workload: "3 horas".to_string(),
            title: "CERTIFICADO DE PARTICIPAÇÃO".to_string(),
            body_template: "Certificamos que {{name}} participou do Meet Up da Comunidade \
                            PythOnRio, com carga horária de {{workload}}, realizado em {{date}}"
                .to_string(),
            footer: "PythOnRio - Comunidade de Python do Rio de Janeiro".to_string(),
            page: PageSettings::default(),
            margin_mm: 35.0,
            spacing: SpacingSettings::default(),
            colors: ColorSettings::default(),
            fonts: FontSettings::default(),
            font_sizes: FontSizes::default(),
            body_line_spacing: 1.875,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
}

impl PaperSize {
    /// Portrait width and height in millimetres.
    fn portrait_mm(self) -> (f64, f64) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (8.5 * MM_PER_INCH, 11.0 * MM_PER_INCH),
            PaperSize::Legal => (8.5 * MM_PER_INCH, 14.0 * MM_PER_INCH),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSettings {
    pub size: PaperSize,
    pub landscape: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            size: PaperSize::A4,
            landscape: true,
        }
    }
}

impl PageSettings {
    /// Width and height in millimetres, orientation applied.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        let (width, height) = self.size.portrait_mm();
        if self.landscape {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Vertical gaps between the blocks of the certificate, in millimetres.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpacingSettings {
    pub top: f64,
    pub after_title: f64,
    pub before_footer: f64,
}

impl Default for SpacingSettings {
    fn default() -> Self {
        Self {
            top: 20.0,
            after_title: 20.0,
            before_footer: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorSettings {
    pub text: HexColor,
    /// Painted over the whole page when the background image cannot be used.
    pub fallback_fill: HexColor,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            text: HexColor::new(0x18, 0x56, 0x66),
            fallback_fill: HexColor::new(0xd3, 0xd3, 0xd3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontSettings {
    /// Directory with `<Family>-Regular.ttf`, `-Bold.ttf`, `-Italic.ttf` and `-BoldItalic.ttf`.
    pub dir: PathBuf,
    /// Tried in order; the first family that loads wins.
    pub families: Vec<String>,
    /// Built-in PDF font used for output instead of embedding the TTF files,
    /// which then only provide metrics. Built-in fonts cover Latin-1 only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builtin: Option<BuiltinFont>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("fonts"),
            families: vec!["LiberationSans".to_string(), "Arial".to_string()],
            builtin: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinFont {
    Helvetica,
    Times,
    Courier,
}

/// Font sizes in points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontSizes {
    pub title: u8,
    pub body: u8,
    pub footer: u8,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            title: 24,
            body: 16,
            footer: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailSettings {
    /// `address` or `Display Name <address>`.
    pub sender: String,
    /// Login for the relay. Defaults to the sender's address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password: String,
    pub host: String,
    pub port: u16,
    /// Copied on every message when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    pub subject: String,
    /// Supports `{{name}}`.
    pub body_template: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            sender: "contato@example.org".to_string(),
            username: None,
            password: String::new(),
            host: "smtp.gmail.com".to_string(),
            port: 587,
            cc: None,
            subject: "Certificado de Participação - PythOnRio".to_string(),
            body_template: "Olá {{name}},\n\
                            Segue em anexo o seu certificado de participação do meet up da \
                            Comunidade PythOnRio.\n\n\
                            Atenciosamente,\n\
                            Comunidade PythOnRio"
                .to_string(),
        }
    }
}

/// An sRGB colour written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for HexColor {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::Color(value.to_string()));
        }
        let channel = |at: usize| {
            u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| ConfigError::Color(value.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for HexColor {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
