//! Structured data mining from OCR text using regex patterns.
//!
//! Pure functions, no async. Each category is matched independently over the
//! whole text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Emails,
    Phones,
    Urls,
    Dates,
    Numbers,
    Headers,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Emails => "emails",
            Category::Phones => "phones",
            Category::Urls => "urls",
            Category::Dates => "dates",
            Category::Numbers => "numbers",
            Category::Headers => "headers",
        }
    }
}

static PATTERNS: [(Category, &str); 6] = [
    (
        Category::Emails,
        r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
    ),
    (
        Category::Phones,
        r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
    ),
    // `$-_` is a range: it covers `/`, `:`, `?`, `=` and the digits.
    (
        Category::Urls,
        r"https?://(?:[A-Za-z0-9$-_@.&+!*(),]|%[0-9A-Fa-f]{2})+",
    ),
    (
        Category::Dates,
        r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b",
    ),
    (Category::Numbers, r"\b\d+\.?\d*\b"),
    (Category::Headers, r"(?m)^#+[ \t]*(.+)$"),
];

/// Pre-compiled category patterns. Invalid ones are skipped with a warning.
static COMPILED: LazyLock<Vec<(Category, Regex)>> = LazyLock::new(|| {
    let compiled: Vec<(Category, Regex)> = PATTERNS
        .iter()
        .filter_map(|(category, pattern)| match Regex::new(pattern) {
            Ok(regex) => Some((*category, regex)),
            Err(e) => {
                warn!(
                    "Skipping invalid {} pattern ({}): {}",
                    category.as_str(),
                    pattern,
                    e
                );
                None
            }
        })
        .collect();
    debug!("Compiled {} structured data patterns", compiled.len());
    compiled
});

/// Matches per category. Every list but `headers` is duplicate-free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredData {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub urls: Vec<String>,
    pub dates: Vec<String>,
    pub numbers: Vec<String>,
    pub headers: Vec<String>,
}

impl StructuredData {
    pub fn get(&self, category: Category) -> &[String] {
        match category {
            Category::Emails => &self.emails,
            Category::Phones => &self.phones,
            Category::Urls => &self.urls,
            Category::Dates => &self.dates,
            Category::Numbers => &self.numbers,
            Category::Headers => &self.headers,
        }
    }

    fn slot(&mut self, category: Category) -> &mut Vec<String> {
        match category {
            Category::Emails => &mut self.emails,
            Category::Phones => &mut self.phones,
            Category::Urls => &mut self.urls,
            Category::Dates => &mut self.dates,
            Category::Numbers => &mut self.numbers,
            Category::Headers => &mut self.headers,
        }
    }

    /// Categories in display order, with their matches.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> + '_ {
        PATTERNS
            .iter()
            .map(move |(category, _)| (*category, self.get(*category)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, values)| values.is_empty())
    }
}

/// Mine emails, phones, URLs, dates, numbers and markdown headers from text.
pub fn extract_structured(text: &str) -> StructuredData {
    let mut data = StructuredData::default();

    for (category, regex) in COMPILED.iter() {
        let values: Vec<String> = if *category == Category::Headers {
            regex
                .captures_iter(text)
                .filter_map(|cap| cap.get(1))
                .map(|m| m.as_str().trim_end_matches('\r').to_string())
                .collect()
        } else {
            dedup(regex.find_iter(text).map(|m| m.as_str().to_string()))
        };
        *data.slot(*category) = values;
    }

    data
}

/// Remove duplicates, keeping first-occurrence order.
fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED.len(), PATTERNS.len());
    }

    #[test]
    fn test_email_and_date() {
        let data = extract_structured("Contact a@b.com or 2024-01-05");
        assert_eq!(data.emails, vec!["a@b.com"]);
        assert!(data.dates.contains(&"2024-01-05".to_string()));
    }

    #[test]
    fn test_empty_text() {
        let data = extract_structured("");
        assert!(data.is_empty());
        assert_eq!(data, StructuredData::default());
    }

    #[test]
    fn test_phones_full_match() {
        let data = extract_structured("Call +1 (555) 123-4567 or 555.987.6543 today");
        assert_eq!(data.phones, vec!["+1 (555) 123-4567", "555.987.6543"]);
    }

    #[test]
    fn test_urls() {
        let data = extract_structured(
            "See https://arxiv.org/pdf/2201.04234 and http://example.com/a%20b?x=1 now",
        );
        assert_eq!(
            data.urls,
            vec!["https://arxiv.org/pdf/2201.04234", "http://example.com/a%20b?x=1"]
        );
    }

    #[test]
    fn test_date_formats() {
        let data = extract_structured("Issued 05/01/24, due 15-12-2024, filed 2024/3/7");
        assert_eq!(data.dates, vec!["05/01/24", "15-12-2024", "2024/3/7"]);
    }

    #[test]
    fn test_numbers_deduplicated() {
        let data = extract_structured("Total 42.50 paid, 42.50 again, 7 items");
        assert_eq!(data.numbers, vec!["42.50", "7"]);
    }

    #[test]
    fn test_headers_keep_order_and_duplicates() {
        let text = "# Title\nbody\n## Section\ntext # not a header\n### Section\n## Section";
        let data = extract_structured(text);
        assert_eq!(data.headers, vec!["Title", "Section", "Section", "Section"]);
    }

    #[test]
    fn test_headers_crlf() {
        let data = extract_structured("# Invoice\r\nline\r\n");
        assert_eq!(data.headers, vec!["Invoice"]);
    }

    #[test]
    fn test_emails_deduplicated() {
        let data = extract_structured("x@mail.org, y@mail.org, x@mail.org");
        assert_eq!(data.emails, vec!["x@mail.org", "y@mail.org"]);
    }

    #[test]
    fn test_idempotent() {
        let text = "# Receipt\nshop@store.io 2023-11-02 total 19.99\n# Receipt";
        assert_eq!(extract_structured(text), extract_structured(text));
    }

    #[test]
    fn test_iter_order() {
        let names: Vec<&str> = StructuredData::default()
            .iter()
            .map(|(c, _)| c.as_str())
            .collect();
        assert_eq!(names, vec!["emails", "phones", "urls", "dates", "numbers", "headers"]);
    }
}
