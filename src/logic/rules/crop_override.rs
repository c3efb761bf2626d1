use super::{Candidate, Rule, RuleContext, RuleOutcome, Tier, BIOFERTILIZER, MOP, UREA};
use crate::config::CropBehavior;
use crate::models::{CropTarget, FertilizerClass, Nutrient, NutrientStatus};

/// Legumes fix their own nitrogen.
///
/// Biofertilizer is always offered; it competes for primary only when soil N
/// is actually low. Mineral N sources are demoted either way.
pub struct LegumeRule;

impl Rule for LegumeRule {
    fn id(&self) -> &'static str {
        "legume_fixation"
    }

    fn name(&self) -> &'static str {
        "Legume Nitrogen Fixation"
    }

    fn tier(&self) -> Tier {
        Tier::CropOverride
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        let crop = ctx.record.crop;
        if ctx.config.crop_override(crop).behavior != CropBehavior::Legume {
            return None;
        }

        let reason = format!(
            "{} form nodules with Rhizobium and fix atmospheric nitrogen. Seed treatment and \
             soil application of biofertilizer cut the need for mineral N.",
            crop
        );

        let candidate = if ctx.npk.nitrogen == NutrientStatus::Low {
            Candidate::new(BIOFERTILIZER, reason).with_reason(
                "Soil N is low, so inoculation comes first; any mineral N should be a small \
                 starter dose only.",
            )
        } else {
            Candidate::complementary(BIOFERTILIZER, reason)
        };

        let mut outcome = RuleOutcome::new()
            .with_candidate(candidate)
            .demote(FertilizerClass::Nitrogenous)
            .with_crop_note(format!(
                "{} rely on biological N fixation: inoculate seed with Rhizobium biofertilizer \
                 and keep mineral N to a small starter dose.",
                crop
            ));

        if ctx.npk.phosphorus == NutrientStatus::Low {
            outcome = outcome.with_crop_note(
                "Phosphorus drives nodulation and N fixation in legumes; do not skip the basal \
                 P dose on this soil.",
            );
        }

        Some(outcome)
    }
}

/// Several nutrients short at once: one NPK complex instead of stacking
/// straight fertilizers.
pub struct BalancedComplexRule;

impl Rule for BalancedComplexRule {
    fn id(&self) -> &'static str {
        "balanced_complex"
    }

    fn name(&self) -> &'static str {
        "Balanced Complex for Multiple Deficiencies"
    }

    fn tier(&self) -> Tier {
        Tier::CropOverride
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        let crop = ctx.record.crop;
        if ctx.config.crop_override(crop).behavior != CropBehavior::BalancedComplex {
            return None;
        }

        let low = ctx.npk.with_status(NutrientStatus::Low);
        if low.len() < 2 {
            return None;
        }
        let high = ctx.npk.with_status(NutrientStatus::High);

        let complex = ctx
            .config
            .rules
            .complex_options
            .iter()
            .filter_map(|name| ctx.config.fertilizer(name))
            .find(|spec| {
                low.iter().all(|n| spec.supplies(n.element()))
                    && high.iter().all(|n| !spec.supplies(n.element()))
            })?;

        let mut reason = format!(
            "{} are low together. {} are nutrient-intensive, and {} covers {} in a single \
             application.",
            join_nutrients(&low),
            crop,
            complex.name,
            if low.len() == Nutrient::all().len() {
                "all three".to_string()
            } else {
                "both".to_string()
            }
        );
        if !high.is_empty() {
            reason.push_str(&format!(
                " It adds no {}, which is already high.",
                join_nutrients(&high).to_lowercase()
            ));
        }

        Some(
            RuleOutcome::new()
                .with_candidate(Candidate::new(complex.name.clone(), reason))
                .demote(FertilizerClass::Nitrogenous)
                .demote(FertilizerClass::Phosphatic)
                .demote(FertilizerClass::Potassic),
        )
    }
}

/// Heavy feeders: nitrogen goes on in splits timed to the crop's growth
/// stages, and potassium gets extra weight.
pub struct HighDemandRule;

struct DemandProfile {
    split_stages: &'static str,
    potassium_role: &'static str,
    /// Removal is large enough to keep potash going on adequate soils.
    potash_every_season: bool,
}

fn demand_profile(crop: CropTarget) -> DemandProfile {
    match crop {
        CropTarget::Rice => DemandProfile {
            split_stages: "tillering and panicle initiation",
            potassium_role: "lodging resistance and grain quality",
            potash_every_season: false,
        },
        CropTarget::Sugarcane => DemandProfile {
            split_stages: "the formative and grand growth stages",
            potassium_role: "cane yield and juice quality",
            potash_every_season: true,
        },
        _ => DemandProfile {
            split_stages: "early vegetative growth and peak demand",
            potassium_role: "stress tolerance and yield quality",
            potash_every_season: false,
        },
    }
}

impl Rule for HighDemandRule {
    fn id(&self) -> &'static str {
        "high_demand_split"
    }

    fn name(&self) -> &'static str {
        "High-Demand Crop Scheduling"
    }

    fn tier(&self) -> Tier {
        Tier::CropOverride
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        let crop = ctx.record.crop;
        if ctx.config.crop_override(crop).behavior != CropBehavior::HighDemand {
            return None;
        }
        let profile = demand_profile(crop);
        let mut outcome = RuleOutcome::new();

        match ctx.npk.nitrogen {
            NutrientStatus::Low => {
                outcome = outcome.with_candidate(Candidate::new(
                    UREA,
                    format!(
                        "{} is a high N-demand crop; split the urea between {}.",
                        crop, profile.split_stages
                    ),
                ));
            }
            NutrientStatus::Adequate => {
                outcome = outcome.with_crop_note(format!(
                    "{} takes up N heavily; any top-up N is best split between {}.",
                    crop, profile.split_stages
                ));
            }
            NutrientStatus::High => {}
        }

        match ctx.npk.potassium {
            NutrientStatus::Low => {
                outcome = outcome.with_candidate(Candidate::new(
                    MOP,
                    format!(
                        "Potassium strongly influences {} in {}; K application matters on this \
                         soil.",
                        profile.potassium_role, crop
                    ),
                ));
            }
            NutrientStatus::Adequate if profile.potash_every_season => {
                outcome = outcome.with_crop_note(format!(
                    "{} removes large amounts of potassium; keep a maintenance potash dose for {} \
                     even though soil K tests adequate.",
                    crop, profile.potassium_role
                ));
            }
            _ => {}
        }

        if outcome.candidates.is_empty() && outcome.crop_notes.is_empty() {
            return None;
        }
        Some(outcome)
    }
}

fn join_nutrients(nutrients: &[Nutrient]) -> String {
    let names: Vec<&str> = nutrients.iter().map(|n| n.as_str()).collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
        Some((last, _)) => last.to_string(),
        None => String::new(),
    }
}
