//! Online inference over a loaded artifact triple.
//!
//! A [`ServingContext`] is assembled once at startup and is read-only
//! afterwards; request handlers share it by reference. Missing or
//! inconsistent artifacts never fail startup. They move the context into a
//! degraded state, and without a usable model every request is answered by
//! the revenue-multiple heuristic.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactStore, LoadedArtifacts};
use crate::error::{PredictError, ShapeMismatch};
use crate::features::{BuiltFeatures, FeatureVectorBuilder};
use crate::record::{CompanyProfile, USD_PER_MILLION};
use crate::regression::{LinearModel, StandardScaler};
use crate::request::{parse_payload, Diagnostics, InputSummary, ValuationResponse};
use crate::schema::FeatureSchema;
use crate::vocabulary::{self, industry_multiplier, VocabularyOptions, PER_HEAD_VALUE};
use crate::SchemaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Model, scaler and persisted schema all loaded and consistent.
    Full,
    /// Model usable, but the scaler or the persisted schema is not.
    Degraded,
    /// No usable model; the heuristic answers every request.
    Fallback,
}

impl HealthState {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Full => "full",
            HealthState::Degraded => "degraded",
            HealthState::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    Persisted,
    /// Built-in layout chosen because its width matches the model.
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingOutcome {
    Applied,
    /// No scaler loaded; raw features went to the model.
    SkippedMissing,
    /// Scaler rejected the vector; raw features went to the model.
    SkippedShape(ShapeMismatch),
}

impl ScalingOutcome {
    fn describe(&self) -> String {
        match self {
            ScalingOutcome::Applied => "applied".to_string(),
            ScalingOutcome::SkippedMissing => "skipped: scaler unavailable".to_string(),
            ScalingOutcome::SkippedShape(mismatch) => format!("skipped: {}", mismatch),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionPath {
    Model {
        features: BuiltFeatures,
        scaling: ScalingOutcome,
        /// Raw model output was negative and got clamped to 0.
        clamped: bool,
    },
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub valuation_usd: f64,
    pub valuation_millions: f64,
    pub path: PredictionPath,
}

impl Prediction {
    pub fn source(&self) -> &'static str {
        match self.path {
            PredictionPath::Model { .. } => "model",
            PredictionPath::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthState,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub schema_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_kind: Option<SchemaKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_source: Option<SchemaSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct LoadFlags {
    model: bool,
    scaler: bool,
    schema: bool,
}

/// Immutable serving state built once from the artifact triple.
#[derive(Debug, Clone)]
pub struct ServingContext {
    model: Option<LinearModel>,
    scaler: Option<StandardScaler>,
    schema: Option<(FeatureSchema, SchemaSource)>,
    run_id: Option<String>,
    loaded: LoadFlags,
    state: HealthState,
}

impl ServingContext {
    pub fn load(store: &ArtifactStore) -> Self {
        let context = Self::from_loaded(store.load());
        info!(
            dir = %store.dir().display(),
            state = context.state.as_str(),
            "serving context ready"
        );
        context
    }

    pub fn from_loaded(loaded: LoadedArtifacts) -> Self {
        let run_id = loaded.model.as_ref().ok().map(|e| e.run_id.clone());
        Self::assemble(
            loaded.model.ok().map(|e| e.payload),
            loaded.scaler.ok().map(|e| e.payload),
            loaded.schema.ok().map(|e| e.payload),
            run_id,
        )
    }

    pub fn new(
        model: Option<LinearModel>,
        scaler: Option<StandardScaler>,
        schema: Option<FeatureSchema>,
    ) -> Self {
        Self::assemble(model, scaler, schema, None)
    }

    fn assemble(
        model: Option<LinearModel>,
        scaler: Option<StandardScaler>,
        schema: Option<FeatureSchema>,
        run_id: Option<String>,
    ) -> Self {
        let loaded = LoadFlags {
            model: model.is_some(),
            scaler: scaler.is_some(),
            schema: schema.is_some(),
        };

        let Some(model) = model else {
            return Self {
                model: None,
                scaler,
                schema: schema.map(|s| (s, SchemaSource::Persisted)),
                run_id,
                loaded,
                state: HealthState::Fallback,
            };
        };

        let width = model.width();
        let persisted = match schema {
            Some(schema) if schema.len() == width => Some((schema, SchemaSource::Persisted)),
            Some(schema) => {
                warn!(
                    schema_columns = schema.len(),
                    model_features = width,
                    "feature schema does not match model width; ignoring it"
                );
                None
            }
            None => None,
        };

        let schema = persisted.or_else(|| {
            FeatureSchema::infer_for_width(width).map(|schema| {
                warn!(
                    kind = %schema.kind(),
                    "no usable persisted schema; using built-in layout"
                );
                (schema, SchemaSource::Inferred)
            })
        });

        let Some(schema) = schema else {
            warn!(
                model_features = width,
                "model width matches no known schema; serving heuristic valuations"
            );
            return Self {
                model: None,
                scaler,
                schema: None,
                run_id,
                loaded,
                state: HealthState::Fallback,
            };
        };

        if let Some(scaler) = &scaler {
            if scaler.width() != width {
                warn!(
                    scaler_features = scaler.width(),
                    model_features = width,
                    "scaler width differs from model; requests will skip scaling"
                );
            }
        }

        let consistent_scaler = scaler.as_ref().is_some_and(|s| s.width() == width);
        let state = if consistent_scaler && schema.1 == SchemaSource::Persisted {
            HealthState::Full
        } else {
            HealthState::Degraded
        };

        Self {
            model: Some(model),
            scaler,
            schema: Some(schema),
            run_id,
            loaded,
            state,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref().map(|(schema, _)| schema)
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: self.state,
            model_loaded: self.loaded.model,
            scaler_loaded: self.loaded.scaler,
            schema_loaded: self.loaded.schema,
            schema_kind: self.schema().map(FeatureSchema::kind),
            schema_source: self.schema.as_ref().map(|(_, source)| *source),
            feature_count: self.model.as_ref().map(LinearModel::width),
            run_id: self.run_id.clone(),
        }
    }

    pub fn options(&self) -> VocabularyOptions {
        vocabulary::options()
    }

    /// Validate a JSON payload and predict its valuation.
    pub fn predict(&self, payload: &Value) -> Result<ValuationResponse, PredictError> {
        let profile = parse_payload(payload)?;
        let prediction = self.predict_profile(&profile)?;

        let diagnostics = match &prediction.path {
            PredictionPath::Model {
                features,
                scaling,
                clamped,
            } => Diagnostics {
                scaling: scaling.describe(),
                reconciliation: Some(features.reconciliation.clone()),
                industry: Some(features.industry.clone()),
                clamped: *clamped,
            },
            PredictionPath::Heuristic => Diagnostics {
                scaling: "not applicable".to_string(),
                reconciliation: None,
                industry: None,
                clamped: false,
            },
        };

        info!(
            revenue = profile.revenue,
            team_size = profile.team_size,
            industry = %profile.industry,
            source = prediction.source(),
            valuation = prediction.valuation_usd,
            "prediction served"
        );

        Ok(ValuationResponse {
            valuation: round_to_cents(prediction.valuation_usd),
            valuation_millions: prediction.valuation_millions,
            currency: "USD",
            source: prediction.source(),
            health: self.state.as_str(),
            input: InputSummary::from(&profile),
            diagnostics,
        })
    }

    /// Predict for an already validated profile.
    pub fn predict_profile(&self, profile: &CompanyProfile) -> Result<Prediction, PredictError> {
        match (&self.model, &self.schema) {
            (Some(model), Some((schema, _))) => self.model_prediction(model, schema, profile),
            _ => heuristic_prediction(profile),
        }
    }

    fn model_prediction(
        &self,
        model: &LinearModel,
        schema: &FeatureSchema,
        profile: &CompanyProfile,
    ) -> Result<Prediction, PredictError> {
        let features = FeatureVectorBuilder::new(schema).build(profile);
        if !features.reconciliation.is_exact() {
            debug!(
                added = ?features.reconciliation.added,
                dropped = ?features.reconciliation.dropped,
                "feature row reconciled against schema"
            );
        }

        let raw = features.vector.values();
        let (input, scaling) = match &self.scaler {
            Some(scaler) => match scaler.transform(raw) {
                Ok(scaled) => (scaled, ScalingOutcome::Applied),
                Err(mismatch) => {
                    warn!(error = %mismatch, "scaler rejected feature vector; using raw features");
                    (raw.to_vec(), ScalingOutcome::SkippedShape(mismatch))
                }
            },
            None => (raw.to_vec(), ScalingOutcome::SkippedMissing),
        };

        let output = model
            .predict(&input)
            .map_err(|err| PredictError::Internal(err.to_string()))?;
        if !output.is_finite() {
            return Err(PredictError::Internal(format!(
                "model produced a non-finite valuation ({})",
                output
            )));
        }

        let clamped = output < 0.0;
        let valuation_millions = output.max(0.0);

        Ok(Prediction {
            valuation_usd: valuation_millions * USD_PER_MILLION,
            valuation_millions,
            path: PredictionPath::Model {
                features,
                scaling,
                clamped,
            },
        })
    }
}

/// Revenue multiple plus a fixed value per employee, in USD.
pub fn heuristic_valuation(profile: &CompanyProfile) -> f64 {
    profile.revenue_usd() * industry_multiplier(&profile.industry)
        + f64::from(profile.team_size) * PER_HEAD_VALUE
}

fn heuristic_prediction(profile: &CompanyProfile) -> Result<Prediction, PredictError> {
    let valuation_usd = heuristic_valuation(profile);
    if !valuation_usd.is_finite() {
        return Err(PredictError::Internal(format!(
            "heuristic produced a non-finite valuation ({})",
            valuation_usd
        )));
    }

    Ok(Prediction {
        valuation_usd,
        valuation_millions: valuation_usd / USD_PER_MILLION,
        path: PredictionPath::Heuristic,
    })
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::features::CategoryOutcome;
    use crate::ModelKind;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn scenario_payload() -> Value {
        json!({
            "revenue": 25,
            "employees": 100,
            "industry": "FinTech",
            "region": "North America",
            "exit_status": "Private",
            "funding_amount": 50,
            "funding_rounds": 3,
            "market_share": 5,
            "profitable": false,
            "year_founded": 2018
        })
    }

    fn one_hot_model(schema: &FeatureSchema) -> LinearModel {
        let weights = (0..schema.len()).map(|i| 0.1 * (i as f64 + 1.0)).collect();
        LinearModel::new(ModelKind::Linear, None, 40.0, weights)
    }

    fn one_hot_scaler(schema: &FeatureSchema) -> StandardScaler {
        let low: Vec<f64> = (0..schema.len()).map(|i| i as f64).collect();
        let high: Vec<f64> = (0..schema.len()).map(|i| 3.0 * i as f64 + 2.0).collect();
        StandardScaler::fit(&[low, high], schema.columns()).expect("scaler")
    }

    fn full_context() -> ServingContext {
        let schema = FeatureSchema::one_hot();
        ServingContext::new(
            Some(one_hot_model(&schema)),
            Some(one_hot_scaler(&schema)),
            Some(schema),
        )
    }

    #[test]
    fn fallback_matches_fixed_formula_exactly() {
        let context = ServingContext::new(None, None, None);
        assert_eq!(context.state(), HealthState::Fallback);

        let response = context.predict(&scenario_payload()).expect("prediction");
        let expected = 25_000_000.0 * 10.0 + 100.0 * 50_000.0;
        assert_eq!(response.valuation, expected);
        assert_eq!(response.valuation, 255_000_000.0);
        assert_eq!(response.source, "heuristic");
        assert_abs_diff_eq!(response.valuation_millions, 255.0);
    }

    #[test]
    fn fallback_uses_default_multiplier_for_unknown_industry() {
        let profile = CompanyProfile::new(2.0, 10, "Space Mining");
        assert_eq!(heuristic_valuation(&profile), 2_000_000.0 * 3.0 + 500_000.0);
    }

    #[test]
    fn largest_accepted_revenue_still_yields_a_number() {
        let context = ServingContext::new(None, None, None);
        let response = context
            .predict(&json!({
                "revenue": crate::request::MAX_AMOUNT_MILLIONS,
                "employees": u32::MAX,
                "industry": "FinTech"
            }))
            .expect("prediction");
        assert!(response.valuation.is_finite());
        assert!(response.valuation_millions.is_finite());

        let err = context
            .predict(&json!({"revenue": 1e303, "employees": 5, "industry": "IoT"}))
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn overflowing_heuristic_is_an_internal_error() {
        let context = ServingContext::new(None, None, None);
        let profile = CompanyProfile::new(f64::MAX, 5, "FinTech");
        let err = context.predict_profile(&profile).unwrap_err();
        assert!(matches!(err, PredictError::Internal(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn inferred_legacy_layout_reports_unlisted_industry_as_default() {
        let model = LinearModel::new(ModelKind::Linear, None, 1.0, vec![0.5, 0.01, 2.0]);
        let context = ServingContext::new(Some(model), None, None);
        assert_eq!(context.state(), HealthState::Degraded);
        assert_eq!(context.health().schema_kind, Some(SchemaKind::Label));

        let mut payload = scenario_payload();
        payload["industry"] = json!("Space Mining");
        let response = context.predict(&payload).expect("prediction");
        assert_eq!(response.source, "model");
        assert_eq!(response.diagnostics.industry, Some(CategoryOutcome::DefaultCode));

        let listed = context.predict(&scenario_payload()).expect("prediction");
        assert_eq!(listed.diagnostics.industry, Some(CategoryOutcome::Matched));
    }

    #[test]
    fn full_context_scales_before_predicting() {
        let context = full_context();
        assert_eq!(context.state(), HealthState::Full);

        let profile = parse_payload(&scenario_payload()).expect("payload");
        let prediction = context.predict_profile(&profile).expect("prediction");
        let PredictionPath::Model {
            features, scaling, ..
        } = &prediction.path
        else {
            panic!("expected model path");
        };
        assert_eq!(*scaling, ScalingOutcome::Applied);
        assert_eq!(features.vector.columns(), FeatureSchema::one_hot().columns());

        let schema = FeatureSchema::one_hot();
        let scaled = one_hot_scaler(&schema)
            .transform(features.vector.values())
            .expect("transform");
        let expected = one_hot_model(&schema).predict(&scaled).expect("predict").max(0.0);
        assert_abs_diff_eq!(prediction.valuation_millions, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(prediction.valuation_usd, expected * USD_PER_MILLION, epsilon = 1e-3);
    }

    #[test]
    fn missing_scaler_passes_raw_features_to_model() {
        let schema = FeatureSchema::one_hot();
        let model = one_hot_model(&schema);
        let context = ServingContext::new(Some(model.clone()), None, Some(schema.clone()));
        assert_eq!(context.state(), HealthState::Degraded);

        let profile = parse_payload(&scenario_payload()).expect("payload");
        let prediction = context.predict_profile(&profile).expect("prediction");

        let raw = FeatureVectorBuilder::new(&schema).build(&profile).vector;
        let expected = model.predict(raw.values()).expect("predict").max(0.0);
        assert_eq!(prediction.valuation_millions, expected);
        assert!(matches!(
            prediction.path,
            PredictionPath::Model {
                scaling: ScalingOutcome::SkippedMissing,
                ..
            }
        ));
    }

    #[test]
    fn scaler_shape_mismatch_recovers_with_raw_features() {
        let schema = FeatureSchema::one_hot();
        let names = ["a".to_string(), "b".to_string()];
        let narrow = StandardScaler::fit(&[vec![1.0, 2.0]], &names).expect("scaler");
        let context = ServingContext::new(Some(one_hot_model(&schema)), Some(narrow), Some(schema));
        assert_eq!(context.state(), HealthState::Degraded);

        let response = context.predict(&scenario_payload()).expect("prediction");
        assert!(response.diagnostics.scaling.contains("expected 2 features"));
        assert_eq!(response.source, "model");
    }

    #[test]
    fn missing_schema_is_inferred_from_model_width() {
        let schema = FeatureSchema::one_hot();
        let context = ServingContext::new(
            Some(one_hot_model(&schema)),
            Some(one_hot_scaler(&schema)),
            None,
        );
        let health = context.health();
        assert_eq!(health.status, HealthState::Degraded);
        assert_eq!(health.schema_source, Some(SchemaSource::Inferred));
        assert!(!health.schema_loaded);
    }

    #[test]
    fn model_of_unknown_width_falls_back_to_heuristic() {
        let model = LinearModel::new(ModelKind::Linear, None, 0.0, vec![1.0; 5]);
        let context = ServingContext::new(Some(model), None, None);
        assert_eq!(context.state(), HealthState::Fallback);
        assert!(context.health().model_loaded);

        let response = context.predict(&scenario_payload()).expect("prediction");
        assert_eq!(response.valuation, 255_000_000.0);
    }

    #[test]
    fn negative_model_output_is_clamped() {
        let schema = FeatureSchema::label_encoded_static();
        let model = LinearModel::new(ModelKind::Linear, None, -1_000.0, vec![0.0, 0.0, 0.0]);
        let context = ServingContext::new(Some(model), None, Some(schema));

        let response = context.predict(&scenario_payload()).expect("prediction");
        assert_eq!(response.valuation, 0.0);
        assert!(response.diagnostics.clamped);
    }

    #[test]
    fn unknown_category_is_not_an_error() {
        let context = full_context();
        let mut payload = scenario_payload();
        payload["industry"] = json!("Space Mining");

        let response = context.predict(&payload).expect("prediction");
        assert_eq!(response.diagnostics.industry, Some(CategoryOutcome::Unknown));
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let context = full_context();
        let first = context.predict(&scenario_payload()).expect("first");
        let second = context.predict(&scenario_payload()).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn missing_required_field_is_a_client_error() {
        let context = full_context();
        let err = context
            .predict(&json!({"revenue": 25, "employees": 100}))
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(matches!(
            err,
            PredictError::Request(RequestError::MissingField("industry"))
        ));
    }

    #[test]
    fn health_reports_loaded_artifacts() {
        let health = full_context().health();
        assert_eq!(health.status, HealthState::Full);
        assert!(health.model_loaded && health.scaler_loaded && health.schema_loaded);
        assert_eq!(health.schema_kind, Some(SchemaKind::OneHot));
        assert_eq!(health.feature_count, Some(FeatureSchema::one_hot().len()));
    }

    #[test]
    fn options_list_closed_vocabularies_in_every_state() {
        for context in [full_context(), ServingContext::new(None, None, None)] {
            let options = context.options();
            assert_eq!(options.industries, vocabulary::INDUSTRIES.to_vec());
            assert_eq!(options.regions, vocabulary::REGIONS.to_vec());
            assert_eq!(options.exit_statuses, vocabulary::EXIT_STATUSES.to_vec());
        }
    }

    #[test]
    fn context_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServingContext>();
    }
}
