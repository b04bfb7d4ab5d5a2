use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_CATEGORY: &str = "Web";
pub const DEFAULT_STATUS: &str = "Activo";

/// A single result as returned by a search provider, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    pub country: String,
    pub language: String,
    pub date: String,
    pub category: String,
    pub status: String,
    pub source: String,
    pub score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl SearchHit {
    /// Builds a hit with the default country, language, status and today's date.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: String::new(),
            country: UNKNOWN.to_string(),
            language: UNKNOWN.to_string(),
            date: today(),
            category: DEFAULT_CATEGORY.to_string(),
            status: DEFAULT_STATUS.to_string(),
            source: source.into(),
            score: 0,
            metadata: None,
        }
    }
}

#[must_use]
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Exact-match filter over the categorical fields of a result.
///
/// Values such as `""` or `"null"` (common in model output) count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultFilters {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ResultFilters {
    /// Drops blank and null-like values.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            country: clean(self.country),
            language: clean(self.language),
            category: clean(self.category),
            status: clean(self.status),
            source: clean(self.source),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.language.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.source.is_none()
    }

    /// True when every present field equals the corresponding hit field.
    #[must_use]
    pub fn matches(
        &self,
        country: &str,
        language: &str,
        category: &str,
        status: &str,
        source: &str,
    ) -> bool {
        let eq = |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);

        eq(&self.country, country)
            && eq(&self.language, language)
            && eq(&self.category, category)
            && eq(&self.status, status)
            && eq(&self.source, source)
    }

    #[must_use]
    pub fn matches_hit(&self, hit: &SearchHit) -> bool {
        self.matches(&hit.country, &hit.language, &hit.category, &hit.status, &hit.source)
    }

    pub fn to_json(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(self).ok()
    }

    #[must_use]
    pub fn from_json(raw: Option<&str>) -> Self {
        raw.and_then(|s| serde_json::from_str::<Self>(s).ok())
            .map(Self::normalized)
            .unwrap_or_default()
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| {
            !v.is_empty() && !v.eq_ignore_ascii_case("null") && !v.eq_ignore_ascii_case("none")
        })
}

/// Maps a language label to the two-letter code search APIs expect.
#[must_use]
pub fn language_code(language: &str) -> String {
    match language.trim().to_lowercase().as_str() {
        "español" | "espanol" | "spanish" => "es".to_string(),
        "inglés" | "ingles" | "english" => "en".to_string(),
        "alemán" | "aleman" | "german" => "de".to_string(),
        "francés" | "frances" | "french" => "fr".to_string(),
        "japonés" | "japones" | "japanese" => "ja".to_string(),
        other => other.chars().take(2).collect(),
    }
}

/// Maps a country label to an ISO 3166 alpha-2 code where the label is a known alias.
#[must_use]
pub fn country_code(country: &str) -> String {
    match country.trim().to_uppercase().as_str() {
        "USA" => "US".to_string(),
        "UK" => "GB".to_string(),
        other => other.to_string(),
    }
}

/// One page of `items`, 1-based. Out-of-range pages are empty.
#[must_use]
pub fn paginate<T>(items: Vec<T>, page: u64, page_size: u64) -> Vec<T> {
    let page = page.max(1);
    let start = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
    let take = usize::try_from(page_size).unwrap_or(usize::MAX);
    items.into_iter().skip(start).take(take).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(country: &str, category: &str) -> SearchHit {
        let mut hit = SearchHit::new("t", "https://example.com", "Google");
        hit.country = country.to_string();
        hit.category = category.to_string();
        hit
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(ResultFilters::default().matches_hit(&hit("ES", "Web")));
    }

    #[test]
    fn test_filter_is_exact_match() {
        let filters = ResultFilters {
            country: Some("ES".to_string()),
            category: Some("Startups".to_string()),
            ..Default::default()
        };

        assert!(filters.matches_hit(&hit("ES", "Startups")));
        assert!(!filters.matches_hit(&hit("es", "Startups")));
        assert!(!filters.matches_hit(&hit("ES", "Startup")));
    }

    #[test]
    fn test_normalized_drops_null_like_values() {
        let filters = ResultFilters {
            country: Some("null".to_string()),
            language: Some("  ".to_string()),
            category: Some(" Salud ".to_string()),
            status: None,
            source: Some("None".to_string()),
        }
        .normalized();

        assert_eq!(filters.category.as_deref(), Some("Salud"));
        assert!(filters.country.is_none());
        assert!(filters.language.is_none());
        assert!(filters.source.is_none());
    }

    #[test]
    fn test_filters_serialize_fixed_keys() {
        let json = serde_json::to_value(ResultFilters::default()).unwrap();
        for key in ["country", "language", "category", "status"] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn test_unknown_filter_key_is_rejected() {
        let parsed: Result<ResultFilters, _> = serde_json::from_str(r#"{"colour": "red"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_json_round_trip_through_storage() {
        let filters = ResultFilters {
            status: Some("Activo".to_string()),
            ..Default::default()
        };
        let stored = filters.to_json();
        assert_eq!(ResultFilters::from_json(stored.as_deref()), filters);
        assert_eq!(ResultFilters::default().to_json(), None);
    }

    #[test]
    fn test_language_and_country_codes() {
        assert_eq!(language_code("Español"), "es");
        assert_eq!(language_code("Japonés"), "ja");
        assert_eq!(language_code("Italiano"), "it");
        assert_eq!(country_code("USA"), "US");
        assert_eq!(country_code("es"), "ES");
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(paginate(items.clone(), 1, 10), (1..=10).collect::<Vec<_>>());
        assert_eq!(paginate(items.clone(), 3, 10), vec![21, 22, 23, 24, 25]);
        assert!(paginate(items.clone(), 4, 10).is_empty());
        assert_eq!(paginate(items, 0, 5).len(), 5);
    }
}
