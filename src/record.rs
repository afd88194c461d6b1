use serde::{Deserialize, Serialize};

pub const DEFAULT_REVENUE: f64 = 0.0;
pub const DEFAULT_TEAM_SIZE: u32 = 1;
pub const DEFAULT_FUNDING_ROUNDS: u32 = 1;
pub const DEFAULT_FUNDING_AMOUNT: f64 = 0.0;
pub const DEFAULT_MARKET_SHARE: f64 = 0.0;
pub const DEFAULT_YEAR_FOUNDED: i32 = 2020;

/// Monetary amounts in the pipeline are carried in millions of USD.
pub const USD_PER_MILLION: f64 = 1_000_000.0;

/// Feature-bearing attributes of one company.
///
/// Training rows and validated requests both reduce to this shape so the
/// feature builder has a single input type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Revenue in millions of USD.
    pub revenue: f64,
    pub team_size: u32,
    pub industry: String,
    pub funding_rounds: u32,
    /// Total funding raised in millions of USD.
    pub funding_amount: f64,
    /// Market share in percent.
    pub market_share: f64,
    pub profitable: bool,
    pub year_founded: i32,
    pub region: Option<String>,
    pub exit_status: Option<String>,
}

impl CompanyProfile {
    /// A profile with every optional attribute at its default.
    pub fn new(revenue: f64, team_size: u32, industry: impl Into<String>) -> Self {
        Self {
            revenue,
            team_size: team_size.max(1),
            industry: industry.into(),
            funding_rounds: DEFAULT_FUNDING_ROUNDS,
            funding_amount: DEFAULT_FUNDING_AMOUNT,
            market_share: DEFAULT_MARKET_SHARE,
            profitable: false,
            year_founded: DEFAULT_YEAR_FOUNDED,
            region: None,
            exit_status: None,
        }
    }

    pub fn revenue_usd(&self) -> f64 {
        self.revenue * USD_PER_MILLION
    }
}

/// One cleaned training row: a profile plus its valuation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub profile: CompanyProfile,
    /// Valuation in millions of USD, always > 0.
    pub valuation: f64,
}
