use super::{Candidate, Rule, RuleContext, RuleOutcome, Tier, MOP};
use crate::models::{FertilizerClass, NutrientStatus};

pub struct PotassiumLowRule;

impl Rule for PotassiumLowRule {
    fn id(&self) -> &'static str {
        "potassium_low"
    }

    fn name(&self) -> &'static str {
        "Low Potassium"
    }

    fn tier(&self) -> Tier {
        Tier::Potassium
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.potassium != NutrientStatus::Low {
            return None;
        }

        Some(RuleOutcome::new().with_candidate(Candidate::new(
            MOP,
            format!(
                "Available potassium is low ({:.0} kg/ha). Muriate of potash is the standard \
                 K source and matters for grain filling, disease resistance and drought \
                 tolerance.",
                ctx.record.potassium
            ),
        )))
    }
}

/// High K is a note, not a warning: excess K rarely harms the crop directly.
pub struct PotassiumHighRule;

impl Rule for PotassiumHighRule {
    fn id(&self) -> &'static str {
        "potassium_high"
    }

    fn name(&self) -> &'static str {
        "Excess Potassium"
    }

    fn tier(&self) -> Tier {
        Tier::Potassium
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.potassium != NutrientStatus::High {
            return None;
        }

        Some(
            RuleOutcome::new()
                .with_note(format!(
                    "Soil potassium is high ({:.0} kg/ha). Focus on balanced N and P with \
                     organics rather than further potash.",
                    ctx.record.potassium
                ))
                .suppress(FertilizerClass::Potassic),
        )
    }
}
