//! The feature schema: ordered column names fixed at training time.
//!
//! Two shapes exist. The one-hot schema expands every closed vocabulary into
//! indicator columns and is what new training runs produce. The label-encoded
//! schema is the older three-column layout (`revenue`, `team_size`,
//! `industry_encoded`) whose industry code comes from a fitted
//! [`LabelEncoder`]. The persisted `kind` tag selects the variant at load
//! time.

use serde::{Deserialize, Serialize};

use crate::encoding::{Encoded, LabelEncoder};
use crate::vocabulary::{static_industry_code, CategoryField, STATIC_FALLBACK_CODE};
use crate::SchemaKind;

pub const REVENUE: &str = "revenue";
pub const TEAM_SIZE: &str = "team_size";
pub const FUNDING_ROUNDS: &str = "funding_rounds";
pub const FUNDING_AMOUNT: &str = "funding_amount";
pub const MARKET_SHARE: &str = "market_share";
pub const PROFITABLE: &str = "profitable";
pub const YEAR_FOUNDED: &str = "year_founded";
pub const INDUSTRY_ENCODED: &str = "industry_encoded";

/// Numeric columns of the one-hot schema, in order.
pub const NUMERIC_COLUMNS: [&str; 7] = [
    REVENUE,
    TEAM_SIZE,
    FUNDING_ROUNDS,
    FUNDING_AMOUNT,
    MARKET_SHARE,
    PROFITABLE,
    YEAR_FOUNDED,
];

pub const LEGACY_COLUMNS: [&str; 3] = [REVENUE, TEAM_SIZE, INDUSTRY_ENCODED];

/// Where the legacy schema gets its industry codes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum IndustryCodes {
    Fitted { encoder: LabelEncoder },
    /// Fixed historic table, used only when no fitted encoder survived.
    Static,
}

impl IndustryCodes {
    pub fn encode(&self, industry: &str) -> Encoded {
        match self {
            IndustryCodes::Fitted { encoder } => encoder.encode(industry),
            IndustryCodes::Static => static_industry_code(industry)
                .map_or(Encoded::Unseen(STATIC_FALLBACK_CODE), Encoded::Known),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSchema {
    OneHot {
        columns: Vec<String>,
    },
    LabelEncoded {
        columns: Vec<String>,
        industry: IndustryCodes,
    },
}

impl FeatureSchema {
    /// The canonical one-hot column list for the current vocabularies.
    pub fn one_hot() -> Self {
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
        for field in CategoryField::ALL {
            columns.extend(field.indicator_columns());
        }
        FeatureSchema::OneHot { columns }
    }

    pub fn label_encoded(encoder: LabelEncoder) -> Self {
        FeatureSchema::LabelEncoded {
            columns: LEGACY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            industry: IndustryCodes::Fitted { encoder },
        }
    }

    /// Legacy schema backed by the static industry table.
    pub fn label_encoded_static() -> Self {
        FeatureSchema::LabelEncoded {
            columns: LEGACY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            industry: IndustryCodes::Static,
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            FeatureSchema::OneHot { .. } => SchemaKind::OneHot,
            FeatureSchema::LabelEncoded { .. } => SchemaKind::Label,
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            FeatureSchema::OneHot { columns } | FeatureSchema::LabelEncoded { columns, .. } => {
                columns
            }
        }
    }

    pub fn len(&self) -> usize {
        self.columns().len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }

    /// Pick a built-in schema whose width matches a model, if exactly one does.
    pub fn infer_for_width(width: usize) -> Option<Self> {
        let one_hot = Self::one_hot();
        if one_hot.len() == width {
            Some(one_hot)
        } else if LEGACY_COLUMNS.len() == width {
            Some(Self::label_encoded_static())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{EXIT_STATUSES, INDUSTRIES, REGIONS};

    #[test]
    fn one_hot_columns_start_with_numeric_block() {
        let schema = FeatureSchema::one_hot();
        let columns = schema.columns();
        assert_eq!(&columns[..NUMERIC_COLUMNS.len()], &NUMERIC_COLUMNS);
        assert_eq!(columns[NUMERIC_COLUMNS.len()], "Industry_Technology");
        assert_eq!(
            schema.len(),
            NUMERIC_COLUMNS.len() + INDUSTRIES.len() + REGIONS.len() + EXIT_STATUSES.len()
        );
    }

    #[test]
    fn persisted_shape_selects_variant() {
        let encoder = LabelEncoder::fit(["FinTech", "IoT"]).expect("fit");
        let legacy = FeatureSchema::label_encoded(encoder);
        let json = serde_json::to_string(&legacy).expect("serialize");
        assert!(json.contains("\"kind\":\"label_encoded\""));

        let decoded: FeatureSchema = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.kind(), SchemaKind::Label);
        assert_eq!(decoded.columns(), &LEGACY_COLUMNS);
    }

    #[test]
    fn infer_for_width_matches_builtin_layouts() {
        let width = FeatureSchema::one_hot().len();
        assert_eq!(
            FeatureSchema::infer_for_width(width).map(|s| s.kind()),
            Some(SchemaKind::OneHot)
        );
        assert_eq!(
            FeatureSchema::infer_for_width(3),
            Some(FeatureSchema::label_encoded_static())
        );
        assert_eq!(FeatureSchema::infer_for_width(5), None);
    }

    #[test]
    fn static_codes_flag_unlisted_industries() {
        let codes = IndustryCodes::Static;
        assert_eq!(codes.encode("FinTech"), Encoded::Known(2));
        assert_eq!(codes.encode("Other"), Encoded::Known(STATIC_FALLBACK_CODE));
        assert_eq!(codes.encode("Biotech"), Encoded::Unseen(STATIC_FALLBACK_CODE));
    }
}
