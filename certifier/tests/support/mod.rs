use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A four-style TTF family usable by genpdf. `_copy` keeps a renamed copy
/// alive when the family had to be assembled from differently named files.
pub struct TestFonts {
    _copy: Option<TempDir>,
    pub dir: PathBuf,
    pub family: String,
}

const STYLES: [&str; 4] = ["Regular", "Bold", "Italic", "BoldItalic"];

/// Liberation Sans when installed (or under `CERTIFIER_TEST_FONTS`),
/// otherwise DejaVu Sans copied under genpdf's file names.
pub fn test_fonts() -> TestFonts {
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
        return TestFonts {
            _copy: None,
            dir,
            family: "LiberationSans".to_string(),
        };
    }

    let dejavu = [
        "/usr/share/fonts/truetype/dejavu",
        "/usr/share/fonts/dejavu",
        "/usr/share/fonts/TTF",
    ]
    .map(PathBuf::from)
    .into_iter()
    .find(|dir| dir.join("DejaVuSans.ttf").is_file())
    .expect("rendering tests need Liberation Sans or DejaVu Sans installed");

    let copy = tempfile::tempdir().unwrap();
    let sources = ["", "-Bold", "-Oblique", "-BoldOblique"];
    for (style, suffix) in STYLES.iter().zip(sources) {
        fs::copy(
            dejavu.join(format!("DejaVuSans{suffix}.ttf")),
            copy.path().join(format!("TestSans-{style}.ttf")),
        )
        .unwrap();
    }
    TestFonts {
        dir: copy.path().to_path_buf(),
        _copy: Some(copy),
        family: "TestSans".to_string(),
    }
}
