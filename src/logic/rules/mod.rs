pub mod crop_override;
pub mod engine;
pub mod nitrogen;
pub mod phosphorus;
pub mod potassium;
pub mod soil_health;

pub use engine::RulesEngine;

use crate::config::EngineConfig;
use crate::models::{FertilizerClass, NormalizedRecord, NpkStatus, PhBand, SoilHealthIndex};

pub const UREA: &str = "Urea";
pub const AMMONIUM_SULPHATE: &str = "Ammonium Sulphate";
pub const DAP: &str = "DAP";
pub const SSP: &str = "SSP";
pub const MOP: &str = "MOP";
pub const BIOFERTILIZER: &str = "Biofertilizer";

/// Products the decision table names directly. The catalog must carry all
/// of them.
pub const REFERENCED_PRODUCTS: &[&str] = &[UREA, AMMONIUM_SULPHATE, DAP, SSP, MOP, BIOFERTILIZER];

/// Evaluation tiers, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Nitrogen,
    Phosphorus,
    Potassium,
    CropOverride,
    SoilHealthOverlay,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Nitrogen => "Nitrogen",
            Tier::Phosphorus => "Phosphorus",
            Tier::Potassium => "Potassium",
            Tier::CropOverride => "Crop override",
            Tier::SoilHealthOverlay => "Soil health overlay",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a rule may look at for one request.
pub struct RuleContext<'a> {
    pub record: &'a NormalizedRecord,
    pub npk: NpkStatus,
    pub ph_band: PhBand,
    pub health: &'a SoilHealthIndex,
    pub config: &'a EngineConfig,
}

/// A fertilizer proposed by a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub reasons: Vec<String>,
    /// Complementary options sit beside the primary and never become it.
    pub complementary: bool,
}

impl Candidate {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reasons: vec![reason.into()],
            complementary: false,
        }
    }

    pub fn complementary(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            complementary: true,
            ..Self::new(name, reason)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

/// What a fired rule contributes to the verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub candidates: Vec<Candidate>,
    /// Classes removed from the verdict entirely.
    pub suppress: Vec<FertilizerClass>,
    /// Classes pushed behind every non-demoted candidate.
    pub demote: Vec<FertilizerClass>,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
    /// Advice carried into the final rationale.
    pub crop_notes: Vec<String>,
}

impl RuleOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidate(mut self, candidate: Candidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn suppress(mut self, class: FertilizerClass) -> Self {
        self.suppress.push(class);
        self
    }

    pub fn demote(mut self, class: FertilizerClass) -> Self {
        self.demote.push(class);
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

    pub fn proposes(&self, name: &str) -> bool {
        self.candidates
            .iter()
            .any(|c| crate::models::labels_match(&c.name, name))
    }
}

/// One row of the decision table.
pub trait Rule: Send + Sync {
    /// Unique identifier for this rule
    fn id(&self) -> &'static str;

    /// Human-readable name
    fn name(&self) -> &'static str;

    fn tier(&self) -> Tier;

    /// Returns an outcome when the rule's conditions hold
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome>;
}
