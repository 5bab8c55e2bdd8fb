//! Locale-aware ordering for file paths.
//!
//! Paths compare under the CLDR root collation at tertiary strength with
//! punctuation left non-ignorable. This is the order a browser's
//! `localeCompare` gives without an explicit locale: punctuation and symbols
//! before digits, digits before letters, accents after base letters and
//! lowercase before uppercase. Canonically equivalent strings compare equal.

use std::cmp::Ordering;
use std::sync::OnceLock;

use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use tracing::warn;

static ROOT: OnceLock<Option<CollatorBorrowed<'static>>> = OnceLock::new();

fn root() -> Option<&'static CollatorBorrowed<'static>> {
    ROOT.get_or_init(|| {
        let mut options = CollatorOptions::default();
        options.strength = Some(Strength::Tertiary);

        match Collator::try_new(Default::default(), options) {
            Ok(collator) => Some(collator),
            Err(e) => {
                warn!(error = %e, "Root collation unavailable, using code point order");
                None
            }
        }
    })
    .as_ref()
}

/// Compare two strings in collation order.
pub fn compare(a: &str, b: &str) -> Ordering {
    match root() {
        Some(collator) => collator.compare(a, b),
        None => a.cmp(b),
    }
}
