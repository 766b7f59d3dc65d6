//! Utility functions and helpers.

#[cfg(feature = "fetch")]
pub mod http;
pub mod log;

/// Lowercase `text` and join alphanumeric runs with `-`.
///
/// `"Ex. Bronze Helm"` becomes `"ex-bronze-helm"`. Used for store keys and
/// exported record ids.
pub fn slugify(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
