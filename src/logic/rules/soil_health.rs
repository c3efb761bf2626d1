use super::{Candidate, Rule, RuleContext, RuleOutcome, Tier, BIOFERTILIZER};
use crate::models::{Deviation, HealthCategory, HealthFactor};

/// Poor soils and carbon-starved soils get organic amendments next to the
/// mineral recommendation. They are complementary, never the primary.
pub struct OrganicAmendmentRule;

impl Rule for OrganicAmendmentRule {
    fn id(&self) -> &'static str {
        "organic_amendment"
    }

    fn name(&self) -> &'static str {
        "Organic Matter Rebuild"
    }

    fn tier(&self) -> Tier {
        Tier::SoilHealthOverlay
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        let carbon_low = ctx.health.per_factor_notes.iter().any(|n| {
            n.factor == HealthFactor::OrganicCarbon && n.deviation == Deviation::TooLow
        });
        let poor = ctx.health.category == HealthCategory::Poor;

        if !carbon_low && !poor {
            return None;
        }

        let cause = if carbon_low {
            format!(
                "Organic carbon is low ({:.2}%).",
                ctx.record.organic_carbon
            )
        } else {
            format!(
                "Overall soil health is poor (index {:.2}).",
                ctx.health.score
            )
        };

        let outcome = ctx
            .config
            .rules
            .organic_amendments
            .iter()
            .fold(RuleOutcome::new(), |outcome, name| {
                outcome.with_candidate(Candidate::complementary(
                    name.clone(),
                    format!(
                        "{} {} rebuilds organic matter, improves structure and feeds microbial \
                         activity, buffering nutrients over the long term.",
                        cause, name
                    ),
                ))
            });

        Some(outcome)
    }
}

/// Soils with a healthy carbon stock get biofertilizer beside the mineral
/// programme instead of bulk organics.
pub struct BiofertilizerComplementRule;

impl Rule for BiofertilizerComplementRule {
    fn id(&self) -> &'static str {
        "biofertilizer_complement"
    }

    fn name(&self) -> &'static str {
        "Biofertilizer Complement"
    }

    fn tier(&self) -> Tier {
        Tier::SoilHealthOverlay
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        let carbon_floor = ctx.config.health_index.bands.organic_carbon.optimal_min;
        if ctx.record.organic_carbon < carbon_floor
            || ctx.health.category == HealthCategory::Poor
        {
            return None;
        }

        Some(RuleOutcome::new().with_candidate(Candidate::complementary(
            BIOFERTILIZER,
            format!(
                "Organic carbon is reasonably good ({:.2}%). Biofertilizers (Rhizobium, \
                 Azotobacter, PSB) complement mineral fertilizers and improve nutrient-use \
                 efficiency.",
                ctx.record.organic_carbon
            ),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::rules::test_support::{balanced, Fixture};
    use crate::models::CropTarget;

    #[test]
    fn healthy_soil_gets_no_overlay() {
        let fx = Fixture::new(balanced(), CropTarget::Rice);
        assert!(OrganicAmendmentRule.evaluate(&fx.ctx()).is_none());
    }

    #[test]
    fn low_carbon_adds_complementary_amendments() {
        let fx = Fixture::new(balanced().with_organic_carbon(0.2), CropTarget::Rice);
        let outcome = OrganicAmendmentRule.evaluate(&fx.ctx()).unwrap();
        let names: Vec<&str> = outcome.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["FYM", "Vermicompost"]);
        assert!(outcome.candidates.iter().all(|c| c.complementary));
        assert!(outcome.candidates[0].reasons[0].starts_with("Organic carbon is low (0.20%)"));
    }

    #[test]
    fn excess_carbon_is_not_a_trigger() {
        let fx = Fixture::new(balanced().with_organic_carbon(4.5), CropTarget::Rice);
        assert!(fx.health.is_flagged(HealthFactor::OrganicCarbon));
        assert!(OrganicAmendmentRule.evaluate(&fx.ctx()).is_none());
    }

    #[test]
    fn good_carbon_offers_biofertilizer() {
        let fx = Fixture::new(balanced(), CropTarget::Wheat);
        let outcome = BiofertilizerComplementRule.evaluate(&fx.ctx()).unwrap();
        assert!(outcome.proposes(BIOFERTILIZER));
        assert!(outcome.candidates[0].complementary);
        assert!(outcome.candidates[0].reasons[0].contains("1.00%"));
    }

    #[test]
    fn low_carbon_gets_no_biofertilizer_complement() {
        let fx = Fixture::new(balanced().with_organic_carbon(0.5), CropTarget::Wheat);
        assert!(BiofertilizerComplementRule.evaluate(&fx.ctx()).is_none());
    }

    #[test]
    fn poor_soil_triggers_even_with_fair_carbon() {
        let fx = Fixture::new(
            balanced()
                .with_ph(4.1)
                .with_organic_carbon(0.6)
                .with_npk(5.0, 1.0, 5.0)
                .with_ec(3.9),
            CropTarget::Maize,
        );
        assert_eq!(fx.health.category, HealthCategory::Poor);
        assert!(!fx.health.is_flagged(HealthFactor::OrganicCarbon));
        let outcome = OrganicAmendmentRule.evaluate(&fx.ctx()).unwrap();
        assert!(outcome.candidates[0].reasons[0].starts_with("Overall soil health is poor"));
    }
}
