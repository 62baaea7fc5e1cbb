use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Fragments with detected styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl TextStyle {
    fn from_marker(len: usize) -> Self {
        match len {
            1 => TextStyle::Italic,
            2 => TextStyle::Bold,
            _ => TextStyle::BoldItalic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub style: TextStyle,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Replaces every `{{key}}` with its value. Unknown keys are left untouched so
/// a typo shows up in the output instead of silently disappearing.
pub fn substitute(template: &str, values: &HashMap<&str, &str>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Parse simple markdown-like styles: `***bolditalic***`, `**bold**`, `*italic*`.
/// A marker opens only before a non-space and closes only after one; anything
/// else is kept as literal text.
pub fn parse_styles(line: &str) -> Vec<TextSegment> {
    let chars: Vec<char> = line.chars().collect();
    let mut segments = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '*' {
            plain.push(chars[i]);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&c| c == '*').count().min(3);
        let opens = chars.get(i + run).is_some_and(|c| !c.is_whitespace());
        match find_closing(&chars, i + run, run).filter(|_| opens) {
            Some(end) => {
                if !plain.is_empty() {
                    segments.push(TextSegment {
                        text: std::mem::take(&mut plain),
                        style: TextStyle::Regular,
                    });
                }
                segments.push(TextSegment {
                    text: chars[i + run..end].iter().collect(),
                    style: TextStyle::from_marker(run),
                });
                i = end + run;
            }
            None => {
                plain.extend(&chars[i..i + run]);
                i += run;
            }
        }
    }

    if !plain.is_empty() {
        segments.push(TextSegment {
            text: plain,
            style: TextStyle::Regular,
        });
    }
    segments
}

/// Start of the next run of `run` stars that follows a non-space, leaving at
/// least one character of content.
fn find_closing(chars: &[char], from: usize, run: usize) -> Option<usize> {
    let last = chars.len().checked_sub(run)?;
    (from + 1..=last).find(|&j| {
        !chars[j - 1].is_whitespace() && chars[j..j + run].iter().all(|&c| c == '*')
    })
}
