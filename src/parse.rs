//! Filename convention parser.
//!
//! Product photos are named `<product>_<type>[_<color>]_<camera>.<ext>`,
//! e.g. `Acme_Hoodie_CamGallery.png` or `Foo_Shirt_Black_CamClose.png`.
//! The leading token doubles as the product title (original case) and the
//! handle (lowercased).

use anyhow::{bail, Result};
use std::path::Path;

/// Semantic fields extracted from one image filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    /// Lowercased, trimmed first token. Product identifier.
    pub handle: String,
    /// Trimmed first token, original case. Used in synthesized image names.
    pub title: String,
    /// Trimmed second token (product type or style).
    pub type_token: String,
    /// Lowercased, trimmed third token, when the convention carries one.
    pub color: Option<String>,
}

/// Split a filename into product fields.
///
/// `want_color` selects the three-token convention (`<product>_<type>_<color>_…`)
/// over the two-token one. Too few tokens is an error; callers skip the file
/// and keep scanning.
pub fn parse_filename(filename: &str, want_color: bool) -> Result<ParsedFilename> {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let tokens: Vec<&str> = stem.split('_').collect();
    let min_tokens = if want_color { 3 } else { 2 };
    if tokens.len() < min_tokens {
        bail!(
            "expected at least {} '_'-separated tokens, found {}",
            min_tokens,
            tokens.len()
        );
    }

    let color = if want_color {
        Some(tokens[2].trim().to_lowercase())
    } else {
        None
    };

    Ok(ParsedFilename {
        handle: tokens[0].trim().to_lowercase(),
        title: tokens[0].trim().to_string(),
        type_token: tokens[1].trim().to_string(),
        color,
    })
}

/// Secondary convention: the leading token is a hyphenated handle rather
/// than a display title. Converts `foo-bar` into `Foo Bar`.
pub fn title_from_handle(handle: &str) -> String {
    handle
        .split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
