use super::classifier::NutrientClassifier;
use super::fusion::FusionResolver;
use super::health_index::HealthIndexScorer;
use super::normalizer::{normalize, parse_crop};
use super::predictor::{Prediction, Predictor};
use super::rules::RulesEngine;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{CropTarget, FinalRecommendation, RecommendationRequest, SoilSample};
use std::sync::Arc;
use tracing::{debug, warn};

const RULES_ONLY_NOTE: &str = "No trained model is loaded; the recommendation comes from the \
                               rule engine alone.";

/// Runs one request through the whole pipeline. Built once, shared
/// read-only between callers.
pub struct Recommender {
    config: Arc<EngineConfig>,
    classifier: NutrientClassifier,
    scorer: HealthIndexScorer,
    rules: RulesEngine,
    predictor: Predictor,
    fusion: FusionResolver,
}

impl Recommender {
    pub fn new(config: EngineConfig, predictor: Predictor) -> Result<Self> {
        let config = Arc::new(config);
        let rules = RulesEngine::new(Arc::clone(&config))?;
        let classifier = NutrientClassifier::new(&config)?;
        let scorer = HealthIndexScorer::new(config.health_index.clone());
        let fusion = FusionResolver::new(config.fusion.mode);

        Ok(Self {
            config,
            classifier,
            scorer,
            rules,
            predictor,
            fusion,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &RulesEngine {
        &self.rules
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn handle(&self, request: &RecommendationRequest) -> Result<FinalRecommendation> {
        self.recommend(&request.sample, &request.crop)
    }

    pub fn recommend(&self, sample: &SoilSample, crop: &str) -> Result<FinalRecommendation> {
        let crop = parse_crop(crop)?;
        self.recommend_for(sample, crop)
    }

    pub fn recommend_for(
        &self,
        sample: &SoilSample,
        crop: CropTarget,
    ) -> Result<FinalRecommendation> {
        let record = normalize(sample, crop)?;
        let health = self.scorer.score(&record);
        let (npk, ph_band) = self.classifier.classify(&record);
        let verdict = self.rules.derive(&record, npk, ph_band, &health);

        let (model, note) = match self.predictor.predict(&record) {
            Ok(Prediction::Available(model)) => (Some(model), None),
            Ok(Prediction::Unavailable) => (None, Some(RULES_ONLY_NOTE.to_string())),
            Err(e) if e.is_recoverable() => {
                warn!(crop = %crop, "{}", e);
                (
                    None,
                    Some(format!("{}; the recommendation comes from the rule engine alone.", e)),
                )
            }
            Err(e) => return Err(e),
        };

        let mut recommendation = self.fusion.resolve(&health, &verdict, model.as_ref());
        if let Some(note) = note {
            // The soil-health line stays last.
            let at = recommendation.rationale.len().saturating_sub(1);
            recommendation.rationale.insert(at, note);
        }

        debug!(
            crop = %crop,
            fertilizer = %recommendation.fertilizer,
            provenance = %recommendation.provenance,
            "Recommendation ready"
        );

        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisorError;
    use crate::logic::predictor::tests::{forest_artifact, softmax_artifact};
    use crate::logic::rules::test_support::balanced;
    use crate::models::Provenance;

    fn rules_only() -> Recommender {
        Recommender::new(EngineConfig::default(), Predictor::unavailable()).unwrap()
    }

    fn hybrid() -> Recommender {
        let predictor = Predictor::from_artifact(softmax_artifact()).unwrap();
        Recommender::new(EngineConfig::default(), predictor).unwrap()
    }

    #[test]
    fn recommender_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Recommender>();
    }

    #[test]
    fn rice_with_low_nitrogen_gets_urea() {
        let sample = SoilSample::new("Loam")
            .with_ph(6.5)
            .with_organic_carbon(0.8)
            .with_npk(80.0, 25.0, 150.0)
            .with_ec(0.5)
            .with_climate(1200.0, 28.0);
        let rec = rules_only().recommend(&sample, "rice").unwrap();

        assert_eq!(rec.fertilizer, "Urea");
        assert_eq!(rec.provenance, Provenance::RulesOnly);
        assert!(rec.model_verdict.is_none());
        assert!(rec.rationale.iter().any(|l| l == RULES_ONLY_NOTE));
        assert!(rec.rationale.last().unwrap().starts_with("Soil health index"));
    }

    #[test]
    fn acidic_wheat_with_low_phosphorus_gets_ssp() {
        let sample = balanced().with_ph(5.2).with_npk(130.0, 10.0, 150.0);
        let rec = rules_only().recommend(&sample, "Wheat").unwrap();
        assert_eq!(rec.fertilizer, "SSP");
        let text = rec.rationale_text();
        assert!(text.contains("acidic"));
    }

    #[test]
    fn alkaline_wheat_with_low_phosphorus_gets_dap() {
        let sample = balanced().with_ph(7.8).with_npk(130.0, 10.0, 150.0);
        let rec = rules_only().recommend(&sample, "wheat").unwrap();
        assert_eq!(rec.fertilizer, "DAP");
    }

    #[test]
    fn low_carbon_lists_organics_as_alternates() {
        let sample = balanced().with_organic_carbon(0.2);
        let rec = rules_only().recommend(&sample, "Maize").unwrap();
        let alternates = rec.rule_verdict.alternate_names();
        assert!(alternates.contains(&"FYM"));
        assert!(alternates.contains(&"Vermicompost"));
        assert_ne!(rec.fertilizer, "FYM");
    }

    #[test]
    fn excess_nitrogen_never_recommends_an_n_source() {
        let rec = rules_only()
            .recommend(&balanced().with_npk(400.0, 30.0, 150.0), "Wheat")
            .unwrap();
        let primary = &rec.rule_verdict.primary;
        assert_eq!(rec.fertilizer, primary.name);
        assert_ne!(rec.fertilizer, "NPK_17_17_17");
        assert_eq!(primary.class, crate::models::FertilizerClass::OrganicManure);
        assert!(rec.rule_verdict.warnings[0].contains("Avoid further N"));
    }

    #[test]
    fn pulses_rationale_keeps_biofertilizer_emphasis() {
        let rec = rules_only()
            .recommend(&balanced().with_npk(20.0, 8.0, 150.0), "Pulses")
            .unwrap();
        assert_eq!(rec.fertilizer, "DAP");
        let text = rec.rationale_text();
        assert!(text.contains("biofertilizer"));
        assert!(text.contains("Rhizobium"));
        let urea = rec.rule_verdict.options().position(|o| o.name == "Urea");
        let bio = rec.rule_verdict.options().position(|o| o.name == "Biofertilizer");
        assert!(bio.is_some() && bio < urea);
    }

    #[test]
    fn sugarcane_rationale_carries_split_n_and_potash_advice() {
        let rec = rules_only()
            .recommend(&balanced().with_npk(150.0, 30.0, 150.0), "Sugarcane")
            .unwrap();
        assert_eq!(rec.fertilizer, "NPK_17_17_17");
        let text = rec.rationale_text();
        assert!(text.contains("grand growth"));
        assert!(text.contains("maintenance potash"));
        assert!(rec.rationale.last().unwrap().starts_with("Soil health index"));
    }

    #[test]
    fn model_disagreement_is_disclosed() {
        let sample = balanced().with_ph(5.2).with_npk(130.0, 10.0, 150.0);
        let rec = hybrid().recommend(&sample, "Wheat").unwrap();

        assert_eq!(rec.provenance, Provenance::RulesAndModelDisagree);
        assert_eq!(rec.fertilizer, "SSP");
        assert_eq!(rec.model_verdict.as_ref().unwrap().label, "DAP");
        let text = rec.rationale_text();
        assert!(text.contains("SSP"));
        assert!(text.contains("DAP"));
    }

    #[test]
    fn model_agreement_is_reported() {
        let sample = balanced().with_npk(80.0, 25.0, 150.0);
        let rec = hybrid().recommend(&sample, "Rice").unwrap();
        assert_eq!(rec.fertilizer, "Urea");
        assert_eq!(rec.provenance, Provenance::RulesAndModelAgree);
        assert!(!rec.rationale.iter().any(|l| l == RULES_ONLY_NOTE));
    }

    #[test]
    fn unseen_crop_skips_the_model() {
        let sample = balanced().with_npk(60.0, 30.0, 150.0);
        let rec = hybrid().recommend(&sample, "Cotton").unwrap();

        assert_eq!(rec.provenance, Provenance::RulesOnly);
        assert_eq!(rec.fertilizer, "Urea");
        assert!(rec.model_verdict.is_none());
        let n = rec.rationale.len();
        assert!(rec.rationale[n - 2].starts_with("Prediction skipped"));
        assert!(rec.rationale[n - 1].starts_with("Soil health index"));
    }

    #[test]
    fn forest_model_is_used_too() {
        let predictor = Predictor::from_artifact(forest_artifact()).unwrap();
        let recommender = Recommender::new(EngineConfig::default(), predictor).unwrap();
        let rec = recommender
            .recommend(&balanced().with_npk(60.0, 30.0, 150.0), "Rice")
            .unwrap();
        assert_eq!(rec.provenance, Provenance::RulesAndModelAgree);
        assert_eq!(rec.fertilizer, "Urea");
    }

    #[test]
    fn unknown_crop_is_an_error() {
        let err = rules_only().recommend(&balanced(), "Barley").unwrap_err();
        assert!(matches!(err, AdvisorError::UnknownCrop(_)));
    }

    #[test]
    fn invalid_sample_is_an_error() {
        let err = rules_only()
            .recommend(&balanced().with_ph(15.0), "Rice")
            .unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidInput { field: "pH", .. }));
    }

    #[test]
    fn request_deserialises_and_serialises_camel_case() {
        let yaml = "crop: Wheat\npH: 5.2\norganicCarbon: 1.0\nnitrogen: 130\nphosphorus: 10\n\
                    potassium: 150\nec: 0.5\nsoilType: Loam\nrainfall: 900\ntemperature: 26\n";
        let request: RecommendationRequest = serde_yaml::from_str(yaml).unwrap();
        let rec = rules_only().handle(&request).unwrap();
        assert_eq!(rec.fertilizer, "SSP");

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["fertilizer"], "SSP");
        assert!(json.get("soilHealth").is_some());
        assert!(json.get("ruleVerdict").is_some());
        assert!(json.get("modelVerdict").is_none());
    }
}
