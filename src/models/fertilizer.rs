use super::nutrient::Element;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FertilizerClass {
    Nitrogenous,
    Phosphatic,
    Potassic,
    NpkComplex,
    OrganicManure,
    Biofertilizer,
}

impl FertilizerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FertilizerClass::Nitrogenous => "Nitrogenous",
            FertilizerClass::Phosphatic => "Phosphatic",
            FertilizerClass::Potassic => "Potassic",
            FertilizerClass::NpkComplex => "NPK Complex",
            FertilizerClass::OrganicManure => "Organic Manure",
            FertilizerClass::Biofertilizer => "Biofertilizer",
        }
    }
}

impl std::fmt::Display for FertilizerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog entry: what a fertilizer is, independent of any request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerSpec {
    pub name: String,
    pub class: FertilizerClass,
    #[serde(default)]
    pub composition: BTreeMap<Element, f64>,
}

impl FertilizerSpec {
    pub fn new(name: &str, class: FertilizerClass, composition: &[(Element, f64)]) -> Self {
        Self {
            name: name.to_string(),
            class,
            composition: composition.iter().copied().collect(),
        }
    }

    pub fn content(&self, element: Element) -> f64 {
        self.composition.get(&element).copied().unwrap_or(0.0)
    }

    pub fn supplies(&self, element: Element) -> bool {
        self.content(element) > 0.0
    }
}

/// A fertilizer as proposed for one request, carrying the reasons the
/// rules gave for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FertilizerOption {
    pub name: String,
    pub class: FertilizerClass,
    pub nutrient_composition: BTreeMap<Element, f64>,
    pub reasons: Vec<String>,
}

impl FertilizerOption {
    pub fn from_spec(spec: &FertilizerSpec, reasons: Vec<String>) -> Self {
        Self {
            name: spec.name.clone(),
            class: spec.class,
            nutrient_composition: spec.composition.clone(),
            reasons,
        }
    }

    /// "18-46-0" style grade string.
    pub fn grade(&self) -> String {
        let pct = |e: Element| self.nutrient_composition.get(&e).copied().unwrap_or(0.0);
        format!("{}-{}-{}", pct(Element::N), pct(Element::P), pct(Element::K))
    }
}
