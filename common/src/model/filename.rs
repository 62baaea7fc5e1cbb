//! Naming of certificate files.
//!
//! The generator names each certificate after the participant and the mailer
//! later looks the file up by the same name, so both sides must go through this
//! module. [`base_filename`] is the plain derivation; [`FilenamePlan`] applies it
//! to a whole sheet and resolves names that would end up sharing a file.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Appended to every base filename.
pub const CERTIFICATE_SUFFIX: &str = "_certificado.pdf";

/// Hex digits of the MD5 digest used to tell colliding names apart.
const HASH_LEN: usize = 8;

/// Derives the base filename for a participant name.
///
/// Surrounding whitespace is trimmed, any remaining whitespace becomes `_`,
/// periods and commas are dropped, and so are characters that are not allowed
/// (or are misleading) in a path component. May return an empty string.
pub fn base_filename(name: &str) -> String {
    name.trim()
        .chars()
        .filter_map(|ch| match ch {
            '.' | ',' => None,
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => None,
            c if c.is_whitespace() => Some('_'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// `<base>_certificado.pdf`
pub fn certificate_filename(base: &str) -> String {
    format!("{base}{CERTIFICATE_SUFFIX}")
}

/// Base filenames for every distinct name of a sheet.
///
/// Names that derive to the same base (`"José Silva"` and `"José, Silva"`) or to
/// an empty one get a short MD5 suffix of the trimmed name. Every member of a
/// colliding group is suffixed, so the plan does not depend on row order.
#[derive(Debug, Clone, Default)]
pub struct FilenamePlan {
    bases: HashMap<String, String>,
}

impl FilenamePlan {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let distinct: BTreeSet<&str> = names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();

        let mut by_base: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for name in distinct {
            by_base.entry(base_filename(name)).or_default().push(name);
        }

        let mut bases = HashMap::new();
        for (base, names) in by_base {
            let ambiguous = base.is_empty() || names.len() > 1;
            for name in names {
                let planned = if ambiguous {
                    disambiguate(&base, name)
                } else {
                    base.clone()
                };
                bases.insert(name.to_string(), planned);
            }
        }

        Self { bases }
    }

    /// Base filename for `name`. Names the plan has never seen get the plain
    /// derivation.
    pub fn base_for(&self, name: &str) -> String {
        let name = name.trim();
        self.bases
            .get(name)
            .cloned()
            .unwrap_or_else(|| base_filename(name))
    }

    pub fn certificate_for(&self, name: &str) -> String {
        certificate_filename(&self.base_for(name))
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

fn disambiguate(base: &str, name: &str) -> String {
    let digest = format!("{:x}", md5::compute(name.as_bytes()));
    let short = &digest[..HASH_LEN];
    if base.is_empty() {
        short.to_string()
    } else {
        format!("{base}_{short}")
    }
}
