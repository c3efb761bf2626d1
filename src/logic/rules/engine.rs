use super::{
    crop_override::{BalancedComplexRule, HighDemandRule, LegumeRule},
    nitrogen::{NitrogenHighRule, NitrogenLowRule, NitrogenSulphurRule},
    phosphorus::{PhosphorusAcidicRule, PhosphorusHighRule, PhosphorusLowRule},
    potassium::{PotassiumHighRule, PotassiumLowRule},
    soil_health::{BiofertilizerComplementRule, OrganicAmendmentRule},
    Candidate, Rule, RuleContext, RuleOutcome, Tier,
};
use crate::config::EngineConfig;
use crate::error::{AdvisorError, Result};
use crate::models::{
    labels_match, FertilizerClass, FertilizerOption, NormalizedRecord, NpkStatus, Nutrient,
    NutrientStatus, PhBand, RuleVerdict, SoilHealthIndex,
};
use std::sync::Arc;

pub const FALLBACK_RULE_ID: &str = "maintenance_fallback";

const ACIDIC_NOTE: &str = "Soil is acidic. Liming with agricultural lime or dolomite is usually \
                           advisable before intensive fertilization.";
const ALKALINE_NOTE: &str = "Soil is alkaline. Avoid carbonate-rich or strongly basic \
                             materials; organic matter and acid-forming fertilizers help \
                             where appropriate.";
const CLOSING_NOTE: &str = "These recommendations are generic; fine-tune doses and timing \
                            with local soil-test reports and crop fertilizer schedules.";

/// Ordered decision table plus the evaluator that turns fired rows into a
/// single verdict.
pub struct RulesEngine {
    rules: Vec<Box<dyn Rule>>,
    config: Arc<EngineConfig>,
}

/// A candidate after merging, with its sort position.
struct Entry {
    name: String,
    class: FertilizerClass,
    reasons: Vec<String>,
    complementary: bool,
    tier: Tier,
    seq: usize,
}

impl RulesEngine {
    pub fn new(config: Arc<EngineConfig>) -> Result<Self> {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(NitrogenSulphurRule),
            Box::new(NitrogenLowRule),
            Box::new(NitrogenHighRule),
            Box::new(PhosphorusAcidicRule),
            Box::new(PhosphorusLowRule),
            Box::new(PhosphorusHighRule),
            Box::new(PotassiumLowRule),
            Box::new(PotassiumHighRule),
            Box::new(LegumeRule),
            Box::new(BalancedComplexRule),
            Box::new(HighDemandRule),
            Box::new(OrganicAmendmentRule),
            Box::new(BiofertilizerComplementRule),
        ];

        config.validate()?;

        if rules.windows(2).any(|w| w[0].tier() > w[1].tier()) {
            return Err(AdvisorError::Config(
                "decision table rows are out of tier order".into(),
            ));
        }

        Ok(Self { rules, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the table for one request. Within a tier only the first matching
    /// row contributes.
    pub fn derive(
        &self,
        record: &NormalizedRecord,
        npk: NpkStatus,
        ph_band: PhBand,
        health: &SoilHealthIndex,
    ) -> RuleVerdict {
        let ctx = RuleContext {
            record,
            npk,
            ph_band,
            health,
            config: &self.config,
        };

        let mut entries: Vec<Entry> = Vec::new();
        let mut suppressed: Vec<FertilizerClass> = Vec::new();
        let mut demoted: Vec<FertilizerClass> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut notes: Vec<String> = Vec::new();
        let mut crop_notes: Vec<String> = Vec::new();
        let mut fired: Vec<&'static str> = Vec::new();
        let mut fired_tiers: Vec<Tier> = Vec::new();

        for (seq, rule) in self.rules.iter().enumerate() {
            if fired_tiers.contains(&rule.tier()) {
                continue;
            }

            let Some(outcome) = rule.evaluate(&ctx) else {
                continue;
            };

            tracing::debug!(
                rule = rule.id(),
                tier = rule.tier().as_str(),
                candidates = outcome.candidates.len(),
                "Rule fired"
            );

            fired_tiers.push(rule.tier());
            fired.push(rule.id());

            let RuleOutcome {
                candidates,
                suppress,
                demote,
                warnings: rule_warnings,
                notes: rule_notes,
                crop_notes: rule_crop_notes,
            } = outcome;

            for candidate in candidates {
                self.merge(&mut entries, candidate, rule.tier(), seq);
            }
            suppressed.extend(suppress);
            demoted.extend(demote);
            warnings.extend(rule_warnings);
            notes.extend(rule_notes);
            crop_notes.extend(rule_crop_notes);
        }

        entries.retain(|e| !suppressed.contains(&e.class));
        entries.sort_by_key(|e| (e.complementary, demoted.contains(&e.class), e.tier, e.seq));

        let primary = match entries.iter().position(|e| !e.complementary) {
            Some(idx) => entries.remove(idx),
            None => {
                fired.push(FALLBACK_RULE_ID);
                self.maintenance_entry(record, npk, &mut entries, &suppressed)
            }
        };

        match ph_band {
            PhBand::Acidic => notes.push(ACIDIC_NOTE.to_string()),
            PhBand::Alkaline => notes.push(ALKALINE_NOTE.to_string()),
            PhBand::Neutral => {}
        }
        notes.push(CLOSING_NOTE.to_string());

        let mut verdict = RuleVerdict::new(self.to_option(primary), npk, ph_band);
        for entry in entries {
            verdict = verdict.with_alternate(self.to_option(entry));
        }
        for warning in warnings {
            verdict = verdict.with_warning(warning);
        }
        for note in notes {
            verdict = verdict.with_note(note);
        }
        for note in crop_notes {
            verdict = verdict.with_crop_note(note);
        }
        for rule_id in fired {
            verdict = verdict.with_fired_rule(rule_id);
        }

        tracing::debug!(
            primary = verdict.primary.name.as_str(),
            alternates = verdict.alternates.len(),
            "Rule verdict"
        );

        verdict
    }

    fn merge(&self, entries: &mut Vec<Entry>, candidate: Candidate, tier: Tier, seq: usize) {
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| labels_match(&e.name, &candidate.name))
        {
            existing.reasons.extend(candidate.reasons);
            existing.complementary &= candidate.complementary;
            if (tier, seq) < (existing.tier, existing.seq) {
                existing.tier = tier;
                existing.seq = seq;
            }
            return;
        }

        let Some(spec) = self.config.fertilizer(&candidate.name) else {
            tracing::warn!(
                fertilizer = candidate.name.as_str(),
                "Candidate not in catalog, dropped"
            );
            return;
        };

        entries.push(Entry {
            name: spec.name.clone(),
            class: spec.class,
            reasons: candidate.reasons,
            complementary: candidate.complementary,
            tier,
            seq,
        });
    }

    /// Nothing primary-eligible fired: fall back to the crop's maintenance
    /// product, then the default and the complexes. None of them may carry a
    /// nutrient the soil already has in excess; when none qualifies the
    /// organics take over.
    fn maintenance_entry(
        &self,
        record: &NormalizedRecord,
        npk: NpkStatus,
        entries: &mut Vec<Entry>,
        suppressed: &[FertilizerClass],
    ) -> Entry {
        let high = npk.with_status(NutrientStatus::High);
        let preferred = self.config.maintenance_for(record.crop);
        let mineral = std::iter::once(preferred)
            .chain(std::iter::once(self.config.rules.default_maintenance.as_str()))
            .chain(self.config.rules.complex_options.iter().map(String::as_str));

        let maintenance = mineral
            .filter_map(|name| self.config.fertilizer(name))
            .find(|spec| {
                !suppressed.contains(&spec.class)
                    && high.iter().all(|n| !spec.supplies(n.element()))
            });

        let reason = match maintenance {
            Some(spec) => format!(
                "No deficiency detected for {}; {} as a maintenance dose keeps supply in step \
                 with crop removal.",
                record.crop, spec.name
            ),
            None => format!(
                "No deficiency detected for {}. {}, so only organic matter is advised.",
                record.crop,
                excess_clause(&high)
            ),
        };

        let name = maintenance
            .or_else(|| {
                self.config
                    .rules
                    .organic_amendments
                    .iter()
                    .filter_map(|name| self.config.fertilizer(name))
                    .find(|spec| !suppressed.contains(&spec.class))
            })
            .map(|spec| spec.name.clone())
            .unwrap_or_else(|| preferred.to_string());

        // An overlay may already have proposed the same product.
        let mut reasons = vec![reason];
        if let Some(idx) = entries.iter().position(|e| labels_match(&e.name, &name)) {
            reasons.extend(entries.remove(idx).reasons);
        }

        let class = self
            .config
            .fertilizer(&name)
            .map(|spec| spec.class)
            .unwrap_or(FertilizerClass::NpkComplex);

        Entry {
            name,
            class,
            reasons,
            complementary: false,
            tier: Tier::SoilHealthOverlay,
            seq: self.rules.len(),
        }
    }

    fn to_option(&self, entry: Entry) -> FertilizerOption {
        match self.config.fertilizer(&entry.name) {
            Some(spec) => FertilizerOption::from_spec(spec, entry.reasons),
            None => FertilizerOption {
                name: entry.name,
                class: entry.class,
                nutrient_composition: Default::default(),
                reasons: entry.reasons,
            },
        }
    }

    /// Evaluate a single row in isolation.
    pub fn evaluate_rule(&self, rule_id: &str, ctx: &RuleContext<'_>) -> Option<RuleOutcome> {
        self.rules
            .iter()
            .find(|r| r.id() == rule_id)
            .and_then(|rule| rule.evaluate(ctx))
    }

    pub fn list_rules(&self) -> Vec<(&'static str, &'static str, Tier)> {
        self.rules
            .iter()
            .map(|r| (r.id(), r.name(), r.tier()))
            .collect()
    }
}

fn excess_clause(high: &[Nutrient]) -> String {
    let names: Vec<String> = high.iter().map(|n| n.as_str().to_lowercase()).collect();
    match names.split_last() {
        None => "No mineral maintenance product is usable".to_string(),
        Some((only, [])) => format!(
            "Soil {} is already high and every mineral maintenance product adds more",
            only
        ),
        Some((last, rest)) => format!(
            "Soil {} and {} are already high and every mineral maintenance product adds more",
            rest.join(", "),
            last
        ),
    }
}
