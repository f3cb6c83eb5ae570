//! # Alias Normalization
//!
//! The one and only key-derivation function for the directory. Every lookup,
//! registration, and remote query runs the caller's string through
//! [`normalize`] first; raw user input never touches a map key.

use crate::config::{ALIAS_SIGIL, RESERVED_ALIASES};

/// Canonicalize an alias for lookup.
///
/// Lowercases, trims surrounding whitespace, and strips the leading `@`
/// sigil. The function is total and idempotent: any whitespace or sigils
/// uncovered by stripping are removed in the same pass, so
/// `normalize(normalize(x)) == normalize(x)` holds for every input
/// (including oddities like `"@@foo"` or `"@ foo"`).
///
/// ```
/// use als_protocol::alias::normalize;
///
/// assert_eq!(normalize("@Koda_Dev"), "koda_dev");
/// assert_eq!(normalize("  @Alice  "), "alice");
/// assert_eq!(normalize("BOB"), "bob");
/// ```
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .trim()
        .trim_start_matches(|c: char| c == ALIAS_SIGIL || c.is_whitespace())
        .to_string()
}

/// Re-attach the display sigil to a canonical alias.
pub fn display_alias(canonical: &str) -> String {
    format!("{}{}", ALIAS_SIGIL, canonical)
}

/// Whether an alias is on the reserved list. Case- and sigil-insensitive.
pub fn is_reserved(alias: &str) -> bool {
    let canonical = normalize(alias);
    RESERVED_ALIASES.iter().any(|r| *r == canonical)
}
