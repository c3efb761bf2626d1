use crate::config::{HealthIndexConfig, OptimalBand};
use crate::models::{
    Deviation, FactorNote, FactorScore, HealthCategory, HealthFactor, NormalizedRecord,
    SoilHealthIndex,
};

/// Weighted composite of per-factor sub-scores.
///
/// Each factor scores 1.0 inside its optimal band and falls linearly to 0.0
/// at the configured zero points. Factors scoring below `flag_below` get a
/// note naming the direction of the problem.
#[derive(Debug, Clone)]
pub struct HealthIndexScorer {
    config: HealthIndexConfig,
}

impl HealthIndexScorer {
    pub fn new(config: HealthIndexConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, record: &NormalizedRecord) -> SoilHealthIndex {
        let mut factor_scores = Vec::with_capacity(HealthFactor::all().len());
        let mut per_factor_notes = Vec::new();
        let mut composite = 0.0;

        for factor in HealthFactor::all() {
            let value = factor_value(record, *factor);
            let band = self.config.bands.get(*factor);
            let weight = self.config.weights.get(*factor);
            let sub = sub_score(value, &band);

            composite += weight * sub;

            if sub < self.config.flag_below {
                let deviation = if value < band.optimal_min {
                    Deviation::TooLow
                } else {
                    Deviation::TooHigh
                };
                per_factor_notes.push(FactorNote {
                    factor: *factor,
                    deviation,
                    observation: format!(
                        "{} {} ({}{}): {}",
                        factor,
                        deviation.as_str(),
                        format_value(value),
                        factor.unit(),
                        observation(*factor, deviation)
                    ),
                });
            }

            factor_scores.push(FactorScore {
                factor: *factor,
                value,
                sub_score: sub,
                weight,
            });
        }

        let score = composite.clamp(0.0, 1.0);
        let category = HealthCategory::from_score(score, &self.config.categories);

        tracing::debug!(
            score = format!("{:.3}", score),
            category = category.as_str(),
            flagged = per_factor_notes.len(),
            "Soil health index"
        );

        SoilHealthIndex {
            score,
            category,
            per_factor_notes,
            factor_scores,
        }
    }
}

/// Piecewise-linear desirability of `value` against `band`, in [0, 1].
pub fn sub_score(value: f64, band: &OptimalBand) -> f64 {
    let raw = if value < band.optimal_min {
        match band.zero_below {
            Some(zero) if value <= zero => 0.0,
            Some(zero) => (value - zero) / (band.optimal_min - zero),
            None => 1.0,
        }
    } else if value > band.optimal_max {
        match band.zero_above {
            Some(zero) if value >= zero => 0.0,
            Some(zero) => (zero - value) / (zero - band.optimal_max),
            None => 1.0,
        }
    } else {
        1.0
    };

    raw.clamp(0.0, 1.0)
}

fn factor_value(record: &NormalizedRecord, factor: HealthFactor) -> f64 {
    match factor {
        HealthFactor::Ph => record.ph,
        HealthFactor::OrganicCarbon => record.organic_carbon,
        HealthFactor::Nitrogen => record.nitrogen,
        HealthFactor::Phosphorus => record.phosphorus,
        HealthFactor::Potassium => record.potassium,
        HealthFactor::Ec => record.ec,
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn observation(factor: HealthFactor, deviation: Deviation) -> &'static str {
    use Deviation::{TooHigh, TooLow};

    match (factor, deviation) {
        (HealthFactor::Ph, TooLow) => {
            "acidic soil; lime with agricultural lime or dolomite to raise pH and free up phosphorus"
        }
        (HealthFactor::Ph, TooHigh) => {
            "alkaline soil; gypsum, acid-forming fertilizers and organic matter help, watch for Zn and Fe deficiency"
        }
        (HealthFactor::OrganicCarbon, TooLow) => {
            "low organic matter; add FYM, compost or green manure to rebuild structure and microbial activity"
        }
        (HealthFactor::OrganicCarbon, TooHigh) => {
            "very high organic carbon; check drainage, waterlogged soils mineralise slowly"
        }
        (HealthFactor::Nitrogen, TooLow) => {
            "nitrogen reserves are short of crop demand; split applications to limit losses"
        }
        (HealthFactor::Nitrogen, TooHigh) => {
            "excess nitrogen risks lodging, pest pressure and nitrate leaching"
        }
        (HealthFactor::Phosphorus, TooLow) => {
            "phosphorus is limiting; place P close to the root zone"
        }
        (HealthFactor::Phosphorus, TooHigh) => {
            "phosphorus has built up; skip P this season to avoid runoff and Zn antagonism"
        }
        (HealthFactor::Potassium, TooLow) => {
            "potassium is limiting; expect weak stems and poor water regulation"
        }
        (HealthFactor::Potassium, TooHigh) => {
            "excess potassium can suppress Mg and Ca uptake"
        }
        (HealthFactor::Ec, TooLow) => {
            "very low salt content suggests leached nutrient reserves"
        }
        (HealthFactor::Ec, TooHigh) => {
            "salinity is elevated; leach salts with good-quality water and improve drainage"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::logic::normalizer::normalize;
    use crate::models::{CropTarget, SoilSample};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn scorer() -> HealthIndexScorer {
        HealthIndexScorer::new(EngineConfig::default().health_index)
    }

    fn healthy() -> SoilSample {
        SoilSample::new("Loam")
            .with_ph(7.0)
            .with_organic_carbon(1.0)
            .with_npk(100.0, 30.0, 120.0)
            .with_ec(0.5)
            .with_climate(900.0, 26.0)
    }

    fn index(sample: SoilSample) -> SoilHealthIndex {
        scorer().score(&normalize(&sample, CropTarget::Wheat).unwrap())
    }

    #[test]
    fn optimal_soil_scores_one() {
        let idx = index(healthy());
        assert_relative_eq!(idx.score, 1.0, epsilon = 1e-12);
        assert_eq!(idx.category, HealthCategory::Excellent);
        assert!(idx.per_factor_notes.is_empty());
        assert_eq!(idx.factor_scores.len(), 6);
    }

    #[test]
    fn sub_score_ramps_linearly() {
        let band = OptimalBand::new(6.5, 7.5, 4.0, 9.5);
        assert_relative_eq!(sub_score(5.25, &band), 0.5, epsilon = 1e-12);
        assert_relative_eq!(sub_score(8.5, &band), 0.5, epsilon = 1e-12);
        assert_eq!(sub_score(6.5, &band), 1.0);
        assert_eq!(sub_score(7.5, &band), 1.0);
        assert_eq!(sub_score(4.0, &band), 0.0);
        assert_eq!(sub_score(2.0, &band), 0.0);
        assert_eq!(sub_score(12.0, &band), 0.0);
    }

    #[test]
    fn open_band_edge_never_penalises() {
        let band = OptimalBand {
            optimal_min: 0.2,
            optimal_max: 0.8,
            zero_below: None,
            zero_above: Some(4.0),
        };
        assert_eq!(sub_score(0.0, &band), 1.0);
        assert!(sub_score(2.0, &band) < 1.0);
    }

    #[test]
    fn acidic_low_carbon_soil_is_flagged() {
        let idx = index(healthy().with_ph(4.8).with_organic_carbon(0.2));

        assert!(idx.is_flagged(HealthFactor::Ph));
        assert!(idx.is_flagged(HealthFactor::OrganicCarbon));
        assert!(!idx.is_flagged(HealthFactor::Nitrogen));

        let ph_note = &idx.per_factor_notes[0];
        assert_eq!(ph_note.factor, HealthFactor::Ph);
        assert_eq!(ph_note.deviation, Deviation::TooLow);
        assert!(ph_note.observation.contains("lime"));
        assert!(ph_note.observation.starts_with("pH too low (4.80)"));
    }

    #[test]
    fn saline_soil_flagged_too_high() {
        let idx = index(healthy().with_ec(3.5));
        let note = idx
            .per_factor_notes
            .iter()
            .find(|n| n.factor == HealthFactor::Ec)
            .unwrap();
        assert_eq!(note.deviation, Deviation::TooHigh);
        assert!(note.observation.contains("salinity"));
    }

    #[test]
    fn flag_threshold_is_strict() {
        // pH 5.25 sits exactly on the 0.5 sub-score line.
        let idx = index(healthy().with_ph(5.25));
        assert_relative_eq!(idx.sub_score(HealthFactor::Ph).unwrap(), 0.5, epsilon = 1e-12);
        assert!(!idx.is_flagged(HealthFactor::Ph));
    }

    #[test]
    fn depleted_soil_is_poor() {
        let idx = index(
            SoilSample::new("Sandy")
                .with_ph(4.2)
                .with_organic_carbon(0.05)
                .with_npk(5.0, 1.0, 5.0)
                .with_ec(3.8),
        );
        assert_eq!(idx.category, HealthCategory::Poor);
        assert!(idx.score < 0.4);
    }

    proptest! {
        #[test]
        fn score_stays_in_unit_interval(
            ph in 0.0f64..=14.0,
            oc in 0.0f64..=100.0,
            n in 0.0f64..2000.0,
            p in 0.0f64..500.0,
            k in 0.0f64..2000.0,
            ec in 0.0f64..20.0,
        ) {
            let sample = SoilSample::new("Clay")
                .with_ph(ph)
                .with_organic_carbon(oc)
                .with_npk(n, p, k)
                .with_ec(ec);
            let idx = index(sample);
            prop_assert!((0.0..=1.0).contains(&idx.score));
            for fs in &idx.factor_scores {
                prop_assert!((0.0..=1.0).contains(&fs.sub_score));
            }
        }

        #[test]
        fn sub_score_monotone_on_each_side(a in 0.0f64..14.0, b in 0.0f64..14.0) {
            let band = OptimalBand::new(6.5, 7.5, 4.0, 9.5);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if hi <= 6.5 {
                prop_assert!(sub_score(lo, &band) <= sub_score(hi, &band));
            }
            if lo >= 7.5 {
                prop_assert!(sub_score(lo, &band) >= sub_score(hi, &band));
            }
        }
    }
}
