use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthFactor {
    #[serde(rename = "pH")]
    Ph,
    OrganicCarbon,
    Nitrogen,
    Phosphorus,
    Potassium,
    Ec,
}

impl HealthFactor {
    pub fn all() -> &'static [HealthFactor] {
        &[
            HealthFactor::Ph,
            HealthFactor::OrganicCarbon,
            HealthFactor::Nitrogen,
            HealthFactor::Phosphorus,
            HealthFactor::Potassium,
            HealthFactor::Ec,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthFactor::Ph => "pH",
            HealthFactor::OrganicCarbon => "Organic carbon",
            HealthFactor::Nitrogen => "Available nitrogen",
            HealthFactor::Phosphorus => "Available phosphorus",
            HealthFactor::Potassium => "Available potassium",
            HealthFactor::Ec => "Electrical conductivity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            HealthFactor::Ph => "",
            HealthFactor::OrganicCarbon => "%",
            HealthFactor::Nitrogen | HealthFactor::Phosphorus | HealthFactor::Potassium => {
                " kg/ha"
            }
            HealthFactor::Ec => " dS/m",
        }
    }
}

impl std::fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deviation {
    TooLow,
    TooHigh,
}

impl Deviation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Deviation::TooLow => "too low",
            Deviation::TooHigh => "too high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub excellent: f64,
    pub good: f64,
    pub moderate: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            excellent: 0.8,
            good: 0.6,
            moderate: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCategory {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl HealthCategory {
    /// Boundaries belong to the higher category.
    pub fn from_score(score: f64, thresholds: &CategoryThresholds) -> Self {
        if score >= thresholds.excellent {
            HealthCategory::Excellent
        } else if score >= thresholds.good {
            HealthCategory::Good
        } else if score >= thresholds.moderate {
            HealthCategory::Moderate
        } else {
            HealthCategory::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthCategory::Excellent => "Excellent",
            HealthCategory::Good => "Good",
            HealthCategory::Moderate => "Moderate",
            HealthCategory::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScore {
    pub factor: HealthFactor,
    pub value: f64,
    pub sub_score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorNote {
    pub factor: HealthFactor,
    pub deviation: Deviation,
    pub observation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilHealthIndex {
    pub score: f64,
    pub category: HealthCategory,
    pub per_factor_notes: Vec<FactorNote>,
    pub factor_scores: Vec<FactorScore>,
}

impl SoilHealthIndex {
    pub fn sub_score(&self, factor: HealthFactor) -> Option<f64> {
        self.factor_scores
            .iter()
            .find(|s| s.factor == factor)
            .map(|s| s.sub_score)
    }

    pub fn is_flagged(&self, factor: HealthFactor) -> bool {
        self.per_factor_notes.iter().any(|n| n.factor == factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_boundaries_go_to_higher_band() {
        let t = CategoryThresholds::default();
        assert_eq!(HealthCategory::from_score(0.8, &t), HealthCategory::Excellent);
        assert_eq!(HealthCategory::from_score(0.79999, &t), HealthCategory::Good);
        assert_eq!(HealthCategory::from_score(0.6, &t), HealthCategory::Good);
        assert_eq!(
            HealthCategory::from_score(0.59999, &t),
            HealthCategory::Moderate
        );
        assert_eq!(HealthCategory::from_score(0.4, &t), HealthCategory::Moderate);
        assert_eq!(HealthCategory::from_score(0.39999, &t), HealthCategory::Poor);
        assert_eq!(HealthCategory::from_score(0.0, &t), HealthCategory::Poor);
        assert_eq!(HealthCategory::from_score(1.0, &t), HealthCategory::Excellent);
    }

    #[test]
    fn ph_factor_serializes_as_ph() {
        let json = serde_json::to_value(HealthFactor::Ph).unwrap();
        assert_eq!(json, "pH");
    }
}
