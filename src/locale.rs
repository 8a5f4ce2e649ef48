//! Locale negotiation for schema localization
//!
//! A requested locale such as `es-MX` is matched against the locales that
//! actually exist in the string table. The first candidate present wins:
//!
//! 1. `(language, country)`
//! 2. `(language)`
//! 3. `(en)`
//!
//! Variants never take part in matching; every candidate has no variant.

use crate::error::{LocalizationError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

/// Language used when neither the requested locale nor its language exists.
pub const FALLBACK_LANGUAGE: &str = "en";

/// A (language, country, variant) triple, always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LocaleTag {
    pub language: String,
    pub country: Option<String>,
    pub variant: Option<String>,
}

impl LocaleTag {
    pub fn new(language: &str, country: Option<&str>) -> Self {
        Self {
            language: language.to_string(),
            country: country.map(str::to_string),
            variant: None,
        }
    }

    /// Parse a requested locale identifier (`language` or `language-COUNTRY`).
    ///
    /// No validation is performed; any token is accepted as-is after
    /// lower-casing. Only the first `-` separates language from country.
    pub fn parse_request(requested: &str) -> Self {
        let lowered = requested.to_lowercase();
        match lowered.split_once('-') {
            Some((language, country)) if !country.is_empty() => Self::new(language, Some(country)),
            Some((language, _)) => Self::new(language, None),
            None => Self::new(&lowered, None),
        }
    }

    /// Candidates to try, most specific first.
    pub fn fallback_chain(&self) -> [LocaleTag; 3] {
        [
            LocaleTag::new(&self.language, self.country.as_deref()),
            LocaleTag::new(&self.language, None),
            LocaleTag::new(FALLBACK_LANGUAGE, None),
        ]
    }
}

impl fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.language)?;
        if let Some(country) = &self.country {
            write!(f, "-{}", country)?;
        }
        if let Some(variant) = &self.variant {
            write!(f, "-{}", variant)?;
        }
        Ok(())
    }
}

/// Distinct locale triples present in the string table.
pub type AvailableLocales = HashSet<LocaleTag>;

/// The locale chosen for a request, bound verbatim into the loader queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocale {
    pub language: String,
    pub country: Option<String>,
}

impl ResolvedLocale {
    pub fn new(language: &str, country: Option<&str>) -> Self {
        Self {
            language: language.to_string(),
            country: country.map(str::to_string),
        }
    }
}

/// Pick the best available locale for `requested`.
pub fn resolve_locale(requested: &str, available: &AvailableLocales) -> Result<ResolvedLocale> {
    let tag = LocaleTag::parse_request(requested);

    let chosen = tag
        .fallback_chain()
        .into_iter()
        .find(|candidate| available.contains(candidate))
        .ok_or_else(|| LocalizationError::NoFallbackLocale {
            requested: requested.to_string(),
        })?;

    info!("returning {} for requested {}", chosen, requested);

    Ok(ResolvedLocale {
        language: chosen.language,
        country: chosen.country,
    })
}
