use super::{Candidate, Rule, RuleContext, RuleOutcome, Tier, DAP, SSP};
use crate::models::{FertilizerClass, NutrientStatus, PhBand};

/// Low P on acidic soil: single superphosphate.
///
/// SSP is monocalcium phosphate with gypsum, so it carries Ca and S along
/// with P and does not raise pH around the granule the way DAP does.
pub struct PhosphorusAcidicRule;

impl Rule for PhosphorusAcidicRule {
    fn id(&self) -> &'static str {
        "phosphorus_low_acidic"
    }

    fn name(&self) -> &'static str {
        "Low Phosphorus, Acidic Soil"
    }

    fn tier(&self) -> Tier {
        Tier::Phosphorus
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.phosphorus != NutrientStatus::Low || ctx.ph_band != PhBand::Acidic {
            return None;
        }

        Some(RuleOutcome::new().with_candidate(Candidate::new(
            SSP,
            format!(
                "Available phosphorus is low ({:.0} kg/ha) and the soil is acidic (pH {:.1}). \
                 Single superphosphate works well in acid soils and also supplies calcium \
                 and sulphur.",
                ctx.record.phosphorus, ctx.record.ph
            ),
        )))
    }
}

/// Low P on neutral or alkaline soil: DAP, placed rather than broadcast.
pub struct PhosphorusLowRule;

impl Rule for PhosphorusLowRule {
    fn id(&self) -> &'static str {
        "phosphorus_low"
    }

    fn name(&self) -> &'static str {
        "Low Phosphorus"
    }

    fn tier(&self) -> Tier {
        Tier::Phosphorus
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.phosphorus != NutrientStatus::Low {
            return None;
        }

        let reason = if ctx.ph_band == PhBand::Alkaline {
            format!(
                "Available phosphorus is low ({:.0} kg/ha) on alkaline soil (pH {:.1}). DAP is \
                 a concentrated P source; band it near the seed to limit calcium phosphate \
                 fixation.",
                ctx.record.phosphorus, ctx.record.ph
            )
        } else {
            format!(
                "Available phosphorus is low ({:.0} kg/ha) and pH is near neutral. DAP gives \
                 readily available P plus some N, which suits a basal dose.",
                ctx.record.phosphorus
            )
        };

        Some(RuleOutcome::new().with_candidate(Candidate::new(DAP, reason)))
    }
}

pub struct PhosphorusHighRule;

impl Rule for PhosphorusHighRule {
    fn id(&self) -> &'static str {
        "phosphorus_high"
    }

    fn name(&self) -> &'static str {
        "Excess Phosphorus"
    }

    fn tier(&self) -> Tier {
        Tier::Phosphorus
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.phosphorus != NutrientStatus::High {
            return None;
        }

        Some(
            RuleOutcome::new()
                .with_warning(format!(
                    "Soil phosphorus is high ({:.0} kg/ha). More P is unlikely to pay off; most \
                     of it will be fixed, and surplus P can aggravate zinc and iron deficiency.",
                    ctx.record.phosphorus
                ))
                .suppress(FertilizerClass::Phosphatic),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::rules::test_support::{balanced, Fixture};
    use crate::models::CropTarget;

    #[test]
    fn acidic_low_p_gets_ssp() {
        let fx = Fixture::new(
            balanced().with_ph(5.2).with_npk(130.0, 10.0, 150.0),
            CropTarget::Wheat,
        );
        let outcome = PhosphorusAcidicRule.evaluate(&fx.ctx()).unwrap();
        assert!(outcome.proposes(SSP));
        assert!(outcome.candidates[0].reasons[0].contains("acidic"));
    }

    #[test]
    fn acidic_rule_ignores_neutral_soil() {
        let fx = Fixture::new(balanced().with_npk(130.0, 10.0, 150.0), CropTarget::Wheat);
        assert!(PhosphorusAcidicRule.evaluate(&fx.ctx()).is_none());
        let outcome = PhosphorusLowRule.evaluate(&fx.ctx()).unwrap();
        assert!(outcome.proposes(DAP));
        assert!(outcome.candidates[0].reasons[0].contains("near neutral"));
    }

    #[test]
    fn alkaline_low_p_gets_placed_dap() {
        let fx = Fixture::new(
            balanced().with_ph(7.8).with_npk(130.0, 10.0, 150.0),
            CropTarget::Wheat,
        );
        let outcome = PhosphorusLowRule.evaluate(&fx.ctx()).unwrap();
        assert!(outcome.proposes(DAP));
        assert!(outcome.candidates[0].reasons[0].contains("alkaline"));
    }

    #[test]
    fn high_p_suppresses_phosphatic() {
        let fx = Fixture::new(balanced().with_npk(130.0, 85.0, 150.0), CropTarget::Cotton);
        let outcome = PhosphorusHighRule.evaluate(&fx.ctx()).unwrap();
        assert_eq!(outcome.suppress, vec![FertilizerClass::Phosphatic]);
        assert_eq!(outcome.warnings.len(), 1);
    }
}
