//! Closed categorical vocabularies shared by training and serving.
//!
//! The declaration order below is the indicator column order of the one-hot
//! schema. Appending a value is a schema change and needs a retrain.

use serde::Serialize;

/// Overflow value for industries the dataset does not name.
pub const OTHER_INDUSTRY: &str = "Other";

pub const INDUSTRIES: &[&str] = &[
    "Technology",
    "FinTech",
    "Healthcare",
    "HealthTech",
    "E-commerce",
    "EdTech",
    "Cybersecurity",
    "Gaming",
    "IoT",
    "Manufacturing",
    OTHER_INDUSTRY,
];

pub const REGIONS: &[&str] = &[
    "North America",
    "Europe",
    "Asia",
    "South America",
    "Africa",
    "Oceania",
];

pub const EXIT_STATUSES: &[&str] = &["Private", "Acquired", "IPO"];

/// Value of one employee in the fallback heuristic, in USD.
pub const PER_HEAD_VALUE: f64 = 50_000.0;

/// Revenue multiplier for industries missing from [`INDUSTRY_MULTIPLIERS`].
pub const DEFAULT_MULTIPLIER: f64 = 3.0;

const INDUSTRY_MULTIPLIERS: &[(&str, f64)] = &[
    ("Technology", 8.0),
    ("FinTech", 10.0),
    ("Healthcare", 6.0),
    ("HealthTech", 7.0),
    ("E-commerce", 4.0),
    ("E-Commerce", 4.0),
    ("EdTech", 5.0),
    ("Cybersecurity", 9.0),
    ("Gaming", 5.0),
    ("IoT", 6.0),
    (OTHER_INDUSTRY, 3.0),
];

/// Historic integer codes used by the three-feature model when no fitted
/// label encoder is available.
const STATIC_INDUSTRY_CODES: &[(&str, u32)] = &[
    ("Technology", 0),
    ("Healthcare", 1),
    ("Finance", 2),
    ("FinTech", 2),
    ("E-commerce", 3),
    ("E-Commerce", 3),
    ("Manufacturing", 4),
    ("EdTech", 5),
    ("HealthTech", 1),
    ("Cybersecurity", 6),
    ("Gaming", 7),
    ("IoT", 8),
    (OTHER_INDUSTRY, 9),
];

/// A categorical field with a closed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    Industry,
    Region,
    ExitStatus,
}

impl CategoryField {
    pub const ALL: [CategoryField; 3] = [
        CategoryField::Industry,
        CategoryField::Region,
        CategoryField::ExitStatus,
    ];

    /// Column-name prefix used for the field's indicator columns.
    pub fn prefix(self) -> &'static str {
        match self {
            CategoryField::Industry => "Industry",
            CategoryField::Region => "Region",
            CategoryField::ExitStatus => "Exit Status",
        }
    }

    pub fn vocabulary(self) -> &'static [&'static str] {
        match self {
            CategoryField::Industry => INDUSTRIES,
            CategoryField::Region => REGIONS,
            CategoryField::ExitStatus => EXIT_STATUSES,
        }
    }

    pub fn indicator_column(self, value: &str) -> String {
        format!("{}_{}", self.prefix(), value)
    }

    /// All indicator columns for this field, in vocabulary order.
    pub fn indicator_columns(self) -> Vec<String> {
        self.vocabulary()
            .iter()
            .map(|value| self.indicator_column(value))
            .collect()
    }

    /// Strip this field's prefix from an indicator column name.
    pub fn value_of_indicator(self, column: &str) -> Option<&str> {
        column
            .strip_prefix(self.prefix())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|value| !value.is_empty())
    }

    pub fn contains(self, value: &str) -> bool {
        self.vocabulary().contains(&value)
    }
}

pub fn industry_multiplier(industry: &str) -> f64 {
    INDUSTRY_MULTIPLIERS
        .iter()
        .find(|(name, _)| *name == industry)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(DEFAULT_MULTIPLIER)
}

/// Code the static table assigns to industries it does not list.
pub const STATIC_FALLBACK_CODE: u32 = 9;

/// `None` when the industry is not in the static table; callers decide
/// whether to fall back to [`STATIC_FALLBACK_CODE`].
pub fn static_industry_code(industry: &str) -> Option<u32> {
    STATIC_INDUSTRY_CODES
        .iter()
        .find(|(name, _)| *name == industry)
        .map(|(_, code)| *code)
}

/// Closed vocabularies as returned by the options query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyOptions {
    pub industries: Vec<&'static str>,
    pub regions: Vec<&'static str>,
    pub exit_statuses: Vec<&'static str>,
}

pub fn options() -> VocabularyOptions {
    VocabularyOptions {
        industries: INDUSTRIES.to_vec(),
        regions: REGIONS.to_vec(),
        exit_statuses: EXIT_STATUSES.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_columns_follow_declaration_order() {
        let columns = CategoryField::Region.indicator_columns();
        assert_eq!(columns.first().map(String::as_str), Some("Region_North America"));
        assert_eq!(columns.len(), REGIONS.len());
    }

    #[test]
    fn value_of_indicator_requires_exact_prefix() {
        let field = CategoryField::ExitStatus;
        assert_eq!(field.value_of_indicator("Exit Status_IPO"), Some("IPO"));
        assert_eq!(field.value_of_indicator("Exit StatusIPO"), None);
        assert_eq!(field.value_of_indicator("Exit Status_"), None);
        assert_eq!(CategoryField::Industry.value_of_indicator("Region_Asia"), None);
    }

    #[test]
    fn multiplier_defaults_for_unknown_industry() {
        assert_eq!(industry_multiplier("FinTech"), 10.0);
        assert_eq!(industry_multiplier("E-Commerce"), 4.0);
        assert_eq!(industry_multiplier("Space Mining"), DEFAULT_MULTIPLIER);
    }

    #[test]
    fn static_codes_only_cover_listed_industries() {
        assert_eq!(static_industry_code("Healthcare"), Some(1));
        assert_eq!(static_industry_code(OTHER_INDUSTRY), Some(STATIC_FALLBACK_CODE));
        assert_eq!(static_industry_code("Quantum"), None);
    }
}
