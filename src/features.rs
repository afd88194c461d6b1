//! Feature vector construction against a fixed schema.
//!
//! The builder first produces a candidate row from a [`CompanyProfile`] using
//! the schema's encoding strategy, then reconciles that row with the schema:
//! schema columns absent from the row are added as 0, row columns absent from
//! the schema are dropped, and the result is laid out in schema order. The
//! trainer and the predictor both go through [`FeatureVectorBuilder::build`],
//! so the two halves cannot disagree on column position.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::encoding::{self, CategoryMatch, Encoded};
use crate::record::CompanyProfile;
use crate::schema::{
    FeatureSchema, FUNDING_AMOUNT, FUNDING_ROUNDS, INDUSTRY_ENCODED, MARKET_SHARE, PROFITABLE,
    REVENUE, TEAM_SIZE, YEAR_FOUNDED,
};
use crate::vocabulary::CategoryField;

/// A named, ordered feature vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What reconciliation had to change to fit the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Schema columns the candidate row lacked; filled with 0.
    pub added: Vec<String>,
    /// Candidate columns the schema does not know; discarded.
    pub dropped: Vec<String>,
}

impl Reconciliation {
    pub fn is_exact(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty()
    }
}

/// How one categorical input was encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOutcome {
    Matched,
    Unknown,
    Absent,
    /// Label-encoded category not seen during fit; the default code was used.
    DefaultCode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltFeatures {
    pub vector: FeatureVector,
    pub reconciliation: Reconciliation,
    pub industry: CategoryOutcome,
    pub region: CategoryOutcome,
    pub exit_status: CategoryOutcome,
}

pub struct FeatureVectorBuilder<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> FeatureVectorBuilder<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.schema
    }

    pub fn build(&self, profile: &CompanyProfile) -> BuiltFeatures {
        let candidate = self.candidate_row(profile);
        let (vector, reconciliation) = reconcile(candidate.row, self.schema.columns());

        BuiltFeatures {
            vector,
            reconciliation,
            industry: candidate.industry,
            region: candidate.region,
            exit_status: candidate.exit_status,
        }
    }

    fn candidate_row(&self, profile: &CompanyProfile) -> CandidateRow {
        match self.schema {
            FeatureSchema::OneHot { .. } => one_hot_row(profile),
            FeatureSchema::LabelEncoded { industry, .. } => {
                let code = industry.encode(&profile.industry);
                CandidateRow {
                    row: vec![
                        (REVENUE.to_string(), profile.revenue),
                        (TEAM_SIZE.to_string(), f64::from(profile.team_size)),
                        (INDUSTRY_ENCODED.to_string(), f64::from(code.code())),
                    ],
                    industry: match code {
                        Encoded::Known(_) => CategoryOutcome::Matched,
                        Encoded::Unseen(_) => CategoryOutcome::DefaultCode,
                    },
                    region: CategoryOutcome::Absent,
                    exit_status: CategoryOutcome::Absent,
                }
            }
        }
    }
}

struct CandidateRow {
    row: Vec<(String, f64)>,
    industry: CategoryOutcome,
    region: CategoryOutcome,
    exit_status: CategoryOutcome,
}

fn one_hot_row(profile: &CompanyProfile) -> CandidateRow {
    let mut row = vec![
        (REVENUE.to_string(), profile.revenue),
        (TEAM_SIZE.to_string(), f64::from(profile.team_size)),
        (FUNDING_ROUNDS.to_string(), f64::from(profile.funding_rounds)),
        (FUNDING_AMOUNT.to_string(), profile.funding_amount),
        (MARKET_SHARE.to_string(), profile.market_share),
        (PROFITABLE.to_string(), if profile.profitable { 1.0 } else { 0.0 }),
        (YEAR_FOUNDED.to_string(), f64::from(profile.year_founded)),
    ];

    let mut expand = |field: CategoryField, value: Option<&str>| {
        let (indicators, outcome) = encoding::expand(field, value);
        row.extend(indicators);
        match outcome {
            CategoryMatch::Matched => CategoryOutcome::Matched,
            CategoryMatch::Unknown(_) => CategoryOutcome::Unknown,
            CategoryMatch::Absent => CategoryOutcome::Absent,
        }
    };

    let industry = expand(CategoryField::Industry, Some(profile.industry.as_str()));
    let region = expand(CategoryField::Region, profile.region.as_deref());
    let exit_status = expand(CategoryField::ExitStatus, profile.exit_status.as_deref());

    CandidateRow {
        row,
        industry,
        region,
        exit_status,
    }
}

/// Lay `row` out exactly as `schema` orders it.
///
/// Missing schema columns become 0, unknown row columns are dropped. When a
/// column name repeats in `row`, the first value wins.
pub fn reconcile(row: Vec<(String, f64)>, schema: &[String]) -> (FeatureVector, Reconciliation) {
    let schema_set: HashSet<&str> = schema.iter().map(String::as_str).collect();

    let mut lookup: HashMap<String, f64> = HashMap::with_capacity(row.len());
    let mut dropped = Vec::new();
    for (name, value) in row {
        if !schema_set.contains(name.as_str()) {
            if !dropped.contains(&name) {
                dropped.push(name);
            }
            continue;
        }
        lookup.entry(name).or_insert(value);
    }

    let mut added = Vec::new();
    let values = schema
        .iter()
        .map(|column| match lookup.get(column) {
            Some(value) => *value,
            None => {
                added.push(column.clone());
                0.0
            }
        })
        .collect();

    (
        FeatureVector {
            columns: schema.to_vec(),
            values,
        },
        Reconciliation { added, dropped },
    )
}
