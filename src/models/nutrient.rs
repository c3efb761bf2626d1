use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
}

impl Nutrient {
    pub fn all() -> &'static [Nutrient] {
        &[Nutrient::Nitrogen, Nutrient::Phosphorus, Nutrient::Potassium]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "Nitrogen",
            Nutrient::Phosphorus => "Phosphorus",
            Nutrient::Potassium => "Potassium",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Nutrient::Nitrogen => "N",
            Nutrient::Phosphorus => "P",
            Nutrient::Potassium => "K",
        }
    }

    pub fn element(&self) -> Element {
        match self {
            Nutrient::Nitrogen => Element::N,
            Nutrient::Phosphorus => Element::P,
            Nutrient::Potassium => Element::K,
        }
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keys of a fertilizer's nutrient composition. P and K are the nominal
/// P₂O₅ / K₂O grades printed on the bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Element {
    N,
    P,
    K,
    S,
    Ca,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NutrientStatus {
    Low,
    Adequate,
    High,
}

impl NutrientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutrientStatus::Low => "Low",
            NutrientStatus::Adequate => "Adequate",
            NutrientStatus::High => "High",
        }
    }
}

impl std::fmt::Display for NutrientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpkStatus {
    #[serde(rename = "N")]
    pub nitrogen: NutrientStatus,
    #[serde(rename = "P")]
    pub phosphorus: NutrientStatus,
    #[serde(rename = "K")]
    pub potassium: NutrientStatus,
}

impl NpkStatus {
    pub fn new(
        nitrogen: NutrientStatus,
        phosphorus: NutrientStatus,
        potassium: NutrientStatus,
    ) -> Self {
        Self {
            nitrogen,
            phosphorus,
            potassium,
        }
    }

    pub fn get(&self, nutrient: Nutrient) -> NutrientStatus {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
        }
    }

    pub fn with_status(&self, status: NutrientStatus) -> Vec<Nutrient> {
        Nutrient::all()
            .iter()
            .copied()
            .filter(|n| self.get(*n) == status)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhBand {
    Acidic,
    Neutral,
    Alkaline,
}

impl PhBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhBand::Acidic => "Acidic",
            PhBand::Neutral => "Neutral",
            PhBand::Alkaline => "Alkaline",
        }
    }
}

impl std::fmt::Display for PhBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
