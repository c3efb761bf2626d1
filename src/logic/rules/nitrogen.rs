use super::{Candidate, Rule, RuleContext, RuleOutcome, Tier, AMMONIUM_SULPHATE, UREA};
use crate::models::{FertilizerClass, NutrientStatus, PhBand};

/// Low N on a sulphur-deficient, non-acidic soil.
///
/// Ammonium sulphate covers both shortfalls in one product. It is acid
/// forming, so it is held back on soils that are already acidic and urea
/// stays on the list as the cheaper straight N source.
pub struct NitrogenSulphurRule;

impl Rule for NitrogenSulphurRule {
    fn id(&self) -> &'static str {
        "nitrogen_low_sulphur"
    }

    fn name(&self) -> &'static str {
        "Low Nitrogen, Sulphur Deficient"
    }

    fn tier(&self) -> Tier {
        Tier::Nitrogen
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.nitrogen != NutrientStatus::Low || ctx.ph_band == PhBand::Acidic {
            return None;
        }

        let sulphur = ctx.record.sulphur?;
        let limit = ctx.config.rules.sulphur_deficient_below;
        if sulphur >= limit {
            return None;
        }

        Some(
            RuleOutcome::new()
                .with_candidate(Candidate::new(
                    AMMONIUM_SULPHATE,
                    format!(
                        "Nitrogen is low and available sulphur ({:.1} mg/kg) is below {:.0} mg/kg. \
                         Ammonium sulphate supplies both N and S; its mild acidifying effect is \
                         acceptable at {} pH.",
                        sulphur,
                        limit,
                        ctx.ph_band.as_str().to_lowercase()
                    ),
                ))
                .with_candidate(Candidate::new(
                    UREA,
                    "Urea remains the most concentrated N source if sulphur is supplied separately \
                     (gypsum or SSP).",
                )),
        )
    }
}

/// Low N: urea, with handling advice that depends on soil reaction.
pub struct NitrogenLowRule;

impl Rule for NitrogenLowRule {
    fn id(&self) -> &'static str {
        "nitrogen_low"
    }

    fn name(&self) -> &'static str {
        "Low Nitrogen"
    }

    fn tier(&self) -> Tier {
        Tier::Nitrogen
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.nitrogen != NutrientStatus::Low {
            return None;
        }

        let reason = match ctx.ph_band {
            PhBand::Acidic => {
                "Nitrogen is low on an acidic soil. Urea gives a high N dose and is close to \
                 neutral in reaction once hydrolysed; pair it with liming or organics."
            }
            PhBand::Neutral => {
                "Nitrogen is low and pH is near neutral. Urea is the most cost-effective \
                 high-N source under these conditions."
            }
            PhBand::Alkaline => {
                "Nitrogen is low. On alkaline soil surface-applied urea loses N as ammonia, \
                 so incorporate it or irrigate right after application."
            }
        };

        let measured = ctx
            .config
            .nutrient_thresholds
            .get(&ctx.record.crop)
            .map(|t| {
                format!(
                    " Measured {:.0} kg/ha against a {} threshold of {:.0} kg/ha.",
                    ctx.record.nitrogen, ctx.record.crop, t.nitrogen.low_below
                )
            })
            .unwrap_or_default();

        Some(
            RuleOutcome::new()
                .with_candidate(Candidate::new(UREA, format!("{}{}", reason, measured))),
        )
    }
}

/// High N: no mineral N this season.
pub struct NitrogenHighRule;

impl Rule for NitrogenHighRule {
    fn id(&self) -> &'static str {
        "nitrogen_high"
    }

    fn name(&self) -> &'static str {
        "Excess Nitrogen"
    }

    fn tier(&self) -> Tier {
        Tier::Nitrogen
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        if ctx.npk.nitrogen != NutrientStatus::High {
            return None;
        }

        Some(
            RuleOutcome::new()
                .with_warning(format!(
                    "Soil nitrogen is high ({:.0} kg/ha). Avoid further N doses to limit \
                     lodging, nitrate leaching and greenhouse gas losses.",
                    ctx.record.nitrogen
                ))
                .suppress(FertilizerClass::Nitrogenous),
        )
    }
}
