//! Fertilizer chemistry reference used by `explain` and the text output.

use crate::config::EngineConfig;
use crate::models::{canonical_key, Element, FertilizerClass, FertilizerSpec};
use serde::Serialize;
use std::collections::BTreeMap;

struct Card {
    name: &'static str,
    full_name: &'static str,
    formula: &'static str,
    nutrient_form: &'static str,
    key_points: &'static [&'static str],
}

const CARDS: &[Card] = &[
    Card {
        name: "Urea",
        full_name: "Urea",
        formula: "CO(NH₂)₂",
        nutrient_form: "Hydrolyses to NH₄⁺, which nitrifies to NO₃⁻",
        key_points: &[
            "The most concentrated solid N source, about 46% N.",
            "Urease turns it into ammonium carbonate within days of application.",
            "Left on hot, dry or alkaline surfaces it loses N as ammonia gas.",
            "Split the dose and incorporate it or irrigate it in.",
        ],
    },
    Card {
        name: "Ammonium Sulphate",
        full_name: "Ammonium sulphate",
        formula: "(NH₄)₂SO₄",
        nutrient_form: "NH₄⁺ plus plant-available SO₄²⁻",
        key_points: &[
            "About 21% N and 24% S.",
            "Nitrification of the ammonium releases acidity; the strongest acid-former among common N sources.",
            "Well suited to sulphur-deficient, neutral to alkaline soils.",
        ],
    },
    Card {
        name: "DAP",
        full_name: "DAP (diammonium phosphate)",
        formula: "(NH₄)₂HPO₄",
        nutrient_form: "NH₄⁺ and orthophosphate (HPO₄²⁻ / H₂PO₄⁻)",
        key_points: &[
            "Grade 18-46-0, so it carries N as well as P.",
            "A common basal or starter fertilizer.",
            "Raises pH around the granule as it dissolves; use with care on very acid soil.",
        ],
    },
    Card {
        name: "SSP",
        full_name: "SSP (single superphosphate)",
        formula: "Ca(H₂PO₄)₂ + CaSO₄",
        nutrient_form: "Water-soluble phosphate with Ca²⁺ and SO₄²⁻",
        key_points: &[
            "About 16% P₂O₅ with roughly 12% S and 19% Ca.",
            "Does not raise pH near the granule, which suits acid soils.",
            "Useful wherever the crop also needs sulphur or calcium.",
        ],
    },
    Card {
        name: "MOP",
        full_name: "MOP (muriate of potash)",
        formula: "KCl",
        nutrient_form: "K⁺",
        key_points: &[
            "About 60% K₂O equivalent, the cheapest K source.",
            "K⁺ regulates stomata, enzyme activation and osmotic balance.",
            "Carries chloride; chloride-sensitive crops may need sulphate of potash instead.",
        ],
    },
    Card {
        name: "NPK_17_17_17",
        full_name: "NPK 17-17-17",
        formula: "Compound granule",
        nutrient_form: "N, P₂O₅ and K₂O in equal shares",
        key_points: &[
            "Every granule carries N, P and K at a fixed 1:1:1 ratio.",
            "Convenient when several nutrients are short at once, as in vegetables.",
            "Less flexible than straight fertilizers for fine-tuning one nutrient.",
        ],
    },
    Card {
        name: "NPK_20_20_0",
        full_name: "NPK 20-20-0",
        formula: "Ammonium phosphate complex",
        nutrient_form: "NH₄⁺ and orthophosphate, no potash",
        key_points: &[
            "Supplies N and P together without adding K.",
            "Fits soils where N and P are low but potassium is already ample.",
        ],
    },
    Card {
        name: "FYM",
        full_name: "FYM (farmyard manure)",
        formula: "Decomposed dung, urine and bedding",
        nutrient_form: "Slow-release organic N, P and K",
        key_points: &[
            "Low nutrient content, roughly 0.5-0.2-0.5, but large structural benefits.",
            "Raises organic carbon, cation exchange capacity and microbial activity.",
            "Buffers pH swings caused by mineral fertilizers.",
        ],
    },
    Card {
        name: "Vermicompost",
        full_name: "Vermicompost",
        formula: "Earthworm-processed organic matter",
        nutrient_form: "Humus-rich material with moderate N, P and K",
        key_points: &[
            "Richer than FYM, roughly 1.5-0.9-1.2.",
            "Improves root growth and seedling vigour.",
            "Common in nurseries and high-value crops.",
        ],
    },
    Card {
        name: "Biofertilizer",
        full_name: "Biofertilizer (microbial inoculant)",
        formula: "Live cultures: Rhizobium, Azotobacter, Azospirillum, PSB",
        nutrient_form: "Biologically fixed N and solubilised soil P",
        key_points: &[
            "Rhizobium nodulates legumes and fixes atmospheric nitrogen.",
            "Phosphate-solubilising bacteria release organic acids that free fixed P.",
            "Applied as seed treatment or with organics; lowers the mineral N and P needed.",
        ],
    },
];

/// Background notes for the topics the recommendations refer to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Topic {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub bullets: &'static [&'static str],
}

pub const TOPICS: &[Topic] = &[
    Topic {
        id: "nitrogenous",
        title: "Nitrogenous fertilizers",
        summary: "Plants take N up as ammonium (NH₄⁺) and nitrate (NO₃⁻).",
        bullets: &[
            "Urea hydrolyses to ammonium, which nitrifies to nitrate.",
            "Ammonium sulphate adds sulphur and acidifies the soil.",
            "Excess N causes lodging, soft growth and nitrate pollution.",
        ],
    },
    Topic {
        id: "phosphatic",
        title: "Phosphatic fertilizers",
        summary: "P moves little in soil and is easily fixed.",
        bullets: &[
            "DAP and SSP supply orthophosphate.",
            "P drives root growth, early vigour and energy transfer (ATP).",
            "Fe/Al fix P in acid soil; Ca fixes it in alkaline soil.",
        ],
    },
    Topic {
        id: "potassic",
        title: "Potassic fertilizers",
        summary: "K⁺ governs water relations and stress tolerance.",
        bullets: &[
            "MOP (KCl) is the standard K source.",
            "K regulates stomata and osmotic adjustment.",
            "Adequate K improves grain filling and disease resistance.",
        ],
    },
    Topic {
        id: "organics",
        title: "Organic manures",
        summary: "Organic matter is the soil's long-term nutrient buffer.",
        bullets: &[
            "FYM and vermicompost release nutrients slowly.",
            "They raise cation exchange capacity and improve structure.",
            "Combining organics with mineral fertilizer works best.",
        ],
    },
    Topic {
        id: "biofertilizers",
        title: "Biofertilizers",
        summary: "Microbes that fix N or unlock soil P.",
        bullets: &[
            "Rhizobium, Azotobacter and Azospirillum fix nitrogen.",
            "Phosphate-solubilising bacteria release fixed P.",
            "They reduce the mineral N and P a crop needs.",
        ],
    },
    Topic {
        id: "ph",
        title: "Soil pH and availability",
        summary: "pH decides which nutrient forms are soluble.",
        bullets: &[
            "Acid soils risk Al and Mn toxicity and fix P with Fe/Al.",
            "Alkaline soils lock up Fe, Zn and Mn and fix P with Ca.",
            "Lime raises pH; gypsum and acid-forming fertilizers lower it.",
        ],
    },
    Topic {
        id: "soil_health",
        title: "Soil health and NPK balance",
        summary: "Fertility is chemical, physical and biological at once.",
        bullets: &[
            "Soil health covers pH, organic matter, nutrients and soil life.",
            "Overusing one nutrient upsets the others and the environment.",
            "Fertilize to the soil test and rebuild organic matter.",
        ],
    },
];

/// Chemistry explanation for one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub name: String,
    pub full_name: String,
    pub class: FertilizerClass,
    pub formula: String,
    pub nutrient_form: String,
    pub composition: BTreeMap<Element, f64>,
    pub key_points: Vec<String>,
}

fn card(name: &str) -> Option<&'static Card> {
    let key = canonical_key(name);
    CARDS.iter().find(|c| canonical_key(c.name) == key)
}

/// Explain a catalog fertilizer. Products without a reference card get a
/// description built from their composition.
pub fn explain(name: &str, config: &EngineConfig) -> Option<Explanation> {
    let spec = config.fertilizer(name).or_else(|| {
        let key = canonical_key(name);
        config
            .fertilizers
            .iter()
            .find(|f| canonical_key(&f.name) == key)
    })?;

    Some(match card(&spec.name) {
        Some(card) => Explanation {
            name: spec.name.clone(),
            full_name: card.full_name.to_string(),
            class: spec.class,
            formula: card.formula.to_string(),
            nutrient_form: card.nutrient_form.to_string(),
            composition: spec.composition.clone(),
            key_points: card.key_points.iter().map(|p| p.to_string()).collect(),
        },
        None => from_composition(spec),
    })
}

fn from_composition(spec: &FertilizerSpec) -> Explanation {
    let supplied: Vec<String> = spec
        .composition
        .iter()
        .filter(|(_, pct)| **pct > 0.0)
        .map(|(element, pct)| format!("{:?} {}%", element, pct))
        .collect();

    let key_points = if supplied.is_empty() {
        vec!["No nutrient composition recorded in the catalog.".to_string()]
    } else {
        vec![format!("Supplies {}.", supplied.join(", "))]
    };

    Explanation {
        name: spec.name.clone(),
        full_name: spec.name.clone(),
        class: spec.class,
        formula: spec.class.as_str().to_string(),
        nutrient_form: "See composition".to_string(),
        composition: spec.composition.clone(),
        key_points,
    }
}

pub fn topic(id: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|t| t.id.eq_ignore_ascii_case(id.trim()))
}
