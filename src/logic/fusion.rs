use crate::config::FusionMode;
use crate::models::{
    labels_match, FinalRecommendation, ModelVerdict, Provenance, RuleVerdict, SoilHealthIndex,
};

/// Reconciles the rule verdict with an optional model verdict.
///
/// In hybrid mode the rule primary is always the actionable answer; the
/// model only changes the provenance and the rationale. Model-only mode is
/// a diagnostic that lets the model label through whenever there is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FusionResolver {
    mode: FusionMode,
}

impl FusionResolver {
    pub fn new(mode: FusionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FusionMode {
        self.mode
    }

    pub fn resolve(
        &self,
        soil_health: &SoilHealthIndex,
        rule_verdict: &RuleVerdict,
        model_verdict: Option<&ModelVerdict>,
    ) -> FinalRecommendation {
        let primary = &rule_verdict.primary;
        let mut rationale: Vec<String> = Vec::new();

        let (fertilizer, provenance) = match (self.mode, model_verdict) {
            (_, None) => {
                rationale.push(format!(
                    "Rule engine recommends {} ({}).",
                    primary.name,
                    primary.grade()
                ));
                rationale.extend(primary.reasons.iter().cloned());
                (primary.name.clone(), Provenance::RulesOnly)
            }
            (FusionMode::ModelOnly, Some(model)) => {
                rationale.push(format!(
                    "Model-only mode: the model predicts {} with {}.",
                    model.label,
                    percent(model.confidence())
                ));
                if !labels_match(&model.label, &primary.name) {
                    rationale.push(format!(
                        "For comparison, the rule engine would recommend {}.",
                        primary.name
                    ));
                }
                (model.label.clone(), Provenance::ModelOnly)
            }
            (FusionMode::Hybrid, Some(model)) if labels_match(&model.label, &primary.name) => {
                rationale.push(format!(
                    "Rule engine and model agree on {}; the model gives it {}.",
                    primary.name,
                    percent(model.confidence())
                ));
                rationale.extend(primary.reasons.iter().cloned());
                (primary.name.clone(), Provenance::RulesAndModelAgree)
            }
            (FusionMode::Hybrid, Some(model)) => {
                rationale.push(format!(
                    "Rule engine recommends {}; the model predicts {} ({}). The rule choice is \
                     kept because it follows the measured nutrient bands.",
                    primary.name,
                    model.label,
                    percent(model.confidence())
                ));
                if let Some(p) = model.probability_of(&primary.name) {
                    rationale.push(format!(
                        "The model gives {} a probability of {}.",
                        primary.name,
                        percent(p)
                    ));
                }
                rationale.extend(primary.reasons.iter().cloned());
                (primary.name.clone(), Provenance::RulesAndModelDisagree)
            }
        };

        for note in &rule_verdict.crop_notes {
            if !rationale.contains(note) {
                rationale.push(note.clone());
            }
        }
        rationale.push(soil_health_line(soil_health));

        FinalRecommendation {
            fertilizer,
            provenance,
            rationale,
            soil_health: soil_health.clone(),
            rule_verdict: rule_verdict.clone(),
            model_verdict: model_verdict.cloned(),
        }
    }
}

fn percent(p: f64) -> String {
    format!("{:.0}% probability", p * 100.0)
}

fn soil_health_line(health: &SoilHealthIndex) -> String {
    let mut line = format!(
        "Soil health index {:.2} ({}).",
        health.score, health.category
    );
    if !health.per_factor_notes.is_empty() {
        let flagged: Vec<String> = health
            .per_factor_notes
            .iter()
            .map(|n| format!("{} {}", n.factor, n.deviation.as_str()))
            .collect();
        line.push_str(&format!(" Flagged: {}.", flagged.join(", ")));
    }
    line
}
