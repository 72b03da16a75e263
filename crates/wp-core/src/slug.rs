//! Slug derivation for report URLs.
//!
//! A title maps to a base slug; when other reports already use that base
//! (bare or with a numeric suffix) the new one gets `-{count + 1}`.

use regex::Regex;

/// Used when a title has no characters that survive normalization.
pub const FALLBACK_SLUG: &str = "report";

/// Transliterates to ASCII (`Café` becomes `cafe`), lowercases, and joins
/// the remaining words with single hyphens.
pub fn slugify(text: &str) -> String {
    let slug = slug::slugify(text);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Matches `base`, `base-2`, `base-17` and also `base-`, case-insensitively.
pub struct SlugPattern {
    re: Regex,
}

impl SlugPattern {
    pub fn new(base: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(&format!("(?i)^({})(-[0-9]*)?$", regex::escape(base)))?;
        Ok(Self { re })
    }

    pub fn is_match(&self, slug: &str) -> bool {
        self.re.is_match(slug)
    }
}

/// Picks the slug for a new title given the slugs already stored that share
/// its prefix. Candidates that merely start with the base (e.g.
/// `sunset-pointe`) do not count.
pub fn assign_slug<S: AsRef<str>>(base: &str, existing: &[S]) -> Result<String, regex::Error> {
    let pattern = SlugPattern::new(base)?;
    let taken = existing.iter().filter(|s| pattern.is_match(s.as_ref())).count();
    if taken == 0 {
        Ok(base.to_string())
    } else {
        Ok(format!("{}-{}", base, taken + 1))
    }
}
