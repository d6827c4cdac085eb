//! Quote catalog and daily quote selection

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const BUILTIN_QUOTES: &[&str] = &[
    "The only way to do great work is to love what you do.",
    "The future belongs to those who believe in the beauty of their dreams.",
    "Every day is a second chance.",
    "Don't count the days, make the days count.",
    "Success is not final, failure is not fatal.",
    "What you do today can improve all your tomorrows.",
    "Don't wait for opportunity. Create it.",
    "Change starts with you.",
    "A journey of a thousand miles begins with a single step.",
    "Believe you can and you're halfway there.",
    "You are stronger than you think.",
    "Be kind to yourself today.",
    "Today is a fresh start for anything you want.",
    "Your energy is your magnet.",
];

/// Fixed, ordered, non-empty list of quotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteCatalog {
    quotes: Vec<String>,
}

#[derive(Deserialize)]
struct CatalogFile {
    quotes: Vec<String>,
}

impl QuoteCatalog {
    /// Build a catalog from an ordered list of quotes.
    ///
    /// # Panics
    /// Panics if `quotes` is empty. Selection is only defined for a non-empty catalog.
    pub fn new(quotes: Vec<String>) -> Self {
        assert!(!quotes.is_empty(), "quote catalog must not be empty");
        Self { quotes }
    }

    /// The catalog shipped with the binary
    pub fn builtin() -> Self {
        Self::new(BUILTIN_QUOTES.iter().map(|q| q.to_string()).collect())
    }

    /// Load a catalog from a TOML file of the form `quotes = ["...", "..."]`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read quote catalog {}", path.display()))?;
        let file: CatalogFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse quote catalog {}", path.display()))?;

        let quotes: Vec<String> = file
            .quotes
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if quotes.is_empty() {
            bail!("Quote catalog {} contains no quotes", path.display());
        }
        Ok(Self::new(quotes))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Select the quote for a calendar date.
    ///
    /// Uses the 1-indexed day of the year (January 1st is day 1), so the
    /// quote index is `ordinal % len`.
    pub fn select(&self, date: NaiveDate) -> &str {
        let index = date.ordinal() as usize % self.quotes.len();
        &self.quotes[index]
    }
}

impl Default for QuoteCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
