use super::fertilizer::FertilizerOption;
use super::health::SoilHealthIndex;
use super::nutrient::{NpkStatus, PhBand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    RulesOnly,
    ModelOnly,
    RulesAndModelAgree,
    RulesAndModelDisagree,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::RulesOnly => "Rules only",
            Provenance::ModelOnly => "Model only",
            Provenance::RulesAndModelAgree => "Rules + model agree",
            Provenance::RulesAndModelDisagree => "Rules + model disagree",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Provenance::RulesOnly => "§",
            Provenance::ModelOnly => "≈",
            Provenance::RulesAndModelAgree => "✓",
            Provenance::RulesAndModelDisagree => "⚠",
        }
    }

    pub fn used_model(&self) -> bool {
        !matches!(self, Provenance::RulesOnly)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleVerdict {
    pub primary: FertilizerOption,
    pub alternates: Vec<FertilizerOption>,
    pub npk_status: NpkStatus,
    pub ph_band: PhBand,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
    /// Crop-specific advice that belongs in the rationale whichever product
    /// ends up primary.
    pub crop_notes: Vec<String>,
    /// Decision-table rows that fired, in evaluation order.
    pub fired_rules: Vec<String>,
}

impl RuleVerdict {
    pub fn new(primary: FertilizerOption, npk_status: NpkStatus, ph_band: PhBand) -> Self {
        Self {
            primary,
            alternates: Vec::new(),
            npk_status,
            ph_band,
            warnings: Vec::new(),
            notes: Vec::new(),
            crop_notes: Vec::new(),
            fired_rules: Vec::new(),
        }
    }

    pub fn with_alternate(mut self, option: FertilizerOption) -> Self {
        self.alternates.push(option);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_crop_note(mut self, note: impl Into<String>) -> Self {
        self.crop_notes.push(note.into());
        self
    }

    pub fn with_fired_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.fired_rules.push(rule_id.into());
        self
    }

    pub fn alternate_names(&self) -> Vec<&str> {
        self.alternates.iter().map(|o| o.name.as_str()).collect()
    }

    /// Primary first, then alternates.
    pub fn options(&self) -> impl Iterator<Item = &FertilizerOption> {
        std::iter::once(&self.primary).chain(self.alternates.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVerdict {
    pub label: String,
    pub class_probabilities: BTreeMap<String, f64>,
}

impl ModelVerdict {
    pub fn new(label: impl Into<String>, class_probabilities: BTreeMap<String, f64>) -> Self {
        Self {
            label: label.into(),
            class_probabilities,
        }
    }

    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.class_probabilities
            .iter()
            .find(|(name, _)| labels_match(name, label))
            .map(|(_, p)| *p)
    }

    pub fn confidence(&self) -> f64 {
        self.probability_of(&self.label).unwrap_or(0.0)
    }
}

/// Fertilizer names compare trimmed and ASCII case-insensitive.
pub fn labels_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalRecommendation {
    pub fertilizer: String,
    pub provenance: Provenance,
    pub rationale: Vec<String>,
    pub soil_health: SoilHealthIndex,
    pub rule_verdict: RuleVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_verdict: Option<ModelVerdict>,
}

impl FinalRecommendation {
    pub fn rationale_text(&self) -> String {
        self.rationale.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(label: &str, pairs: &[(&str, f64)]) -> ModelVerdict {
        ModelVerdict::new(
            label,
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        )
    }

    #[test]
    fn labels_match_ignores_case_and_padding() {
        assert!(labels_match("Urea", "urea"));
        assert!(labels_match(" DAP ", "DAP"));
        assert!(!labels_match("DAP", "SSP"));
    }

    #[test]
    fn model_verdict_confidence() {
        let v = verdict("DAP", &[("DAP", 0.7), ("Urea", 0.2), ("SSP", 0.1)]);
        assert_eq!(v.confidence(), 0.7);
        assert_eq!(v.probability_of("urea"), Some(0.2));
        assert_eq!(v.probability_of("MOP"), None);
    }

    #[test]
    fn provenance_model_usage() {
        assert!(!Provenance::RulesOnly.used_model());
        assert!(Provenance::ModelOnly.used_model());
        assert!(Provenance::RulesAndModelAgree.used_model());
        assert!(Provenance::RulesAndModelDisagree.used_model());
    }
}
