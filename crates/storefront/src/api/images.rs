//! Image URL resolution for catalog products.
//!
//! The remote service stores product images inconsistently: an `images`
//! entry may be a plain URL, or the whole list may be packed into the first
//! entry as a JSON-encoded string array. Detection keys off the first
//! entry's leading `[` only; that is the observed upstream behavior and
//! non-bracketed JSON stays unsupported on purpose.
//!
//! Resolution never fails. Malformed data degrades to [`PLACEHOLDER_IMAGE`]
//! with a logged warning.

use thiserror::Error;
use tracing::warn;

/// Shown when a product has no resolvable image.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/600?text=No+Image";

/// The first image entry looked like a JSON array but did not parse as one.
#[derive(Debug, Error)]
#[error("malformed image data: {0}")]
pub struct MalformedImageData(#[from] serde_json::Error);

/// Resolve the displayable image URL at `index`.
///
/// Falls back from the requested index to the list's first non-empty entry,
/// then to [`PLACEHOLDER_IMAGE`].
#[must_use]
pub fn image_at(images: &[String], index: usize) -> String {
    let Some(first) = images.first() else {
        return PLACEHOLDER_IMAGE.to_owned();
    };

    if first.starts_with('[') {
        match parse_packed(first) {
            Ok(urls) => pick(&urls, index),
            Err(err) => {
                warn!(error = %err, "unparseable packed image list, using placeholder");
                PLACEHOLDER_IMAGE.to_owned()
            }
        }
    } else {
        pick(images, index)
    }
}

fn parse_packed(raw: &str) -> Result<Vec<String>, MalformedImageData> {
    Ok(serde_json::from_str(raw)?)
}

fn pick(urls: &[String], index: usize) -> String {
    urls.get(index)
        .filter(|url| !url.is_empty())
        .or_else(|| urls.first().filter(|url| !url.is_empty()))
        .cloned()
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_owned())
}
