use crate::config::{Band, EngineConfig, NutrientThresholds, PhBandCuts};
use crate::error::{AdvisorError, Result};
use crate::models::{
    CropTarget, NormalizedRecord, NpkStatus, Nutrient, NutrientStatus, PhBand,
};
use std::collections::BTreeMap;

/// Buckets nutrients per crop and pH globally.
#[derive(Debug, Clone)]
pub struct NutrientClassifier {
    ph_bands: PhBandCuts,
    thresholds: BTreeMap<CropTarget, NutrientThresholds>,
}

impl NutrientClassifier {
    /// Fails unless every crop has a threshold table.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if let Some(missing) = CropTarget::all()
            .iter()
            .find(|c| !config.nutrient_thresholds.contains_key(c))
        {
            return Err(AdvisorError::Config(format!(
                "nutrient_thresholds has no entry for {}",
                missing
            )));
        }

        Ok(Self {
            ph_bands: config.ph_bands,
            thresholds: config.nutrient_thresholds.clone(),
        })
    }

    pub fn classify(&self, record: &NormalizedRecord) -> (NpkStatus, PhBand) {
        let thresholds = &self.thresholds[&record.crop];

        let npk = NpkStatus::new(
            nutrient_status(record.nitrogen, thresholds.band(Nutrient::Nitrogen)),
            nutrient_status(record.phosphorus, thresholds.band(Nutrient::Phosphorus)),
            nutrient_status(record.potassium, thresholds.band(Nutrient::Potassium)),
        );

        (npk, self.ph_band(record.ph))
    }

    pub fn ph_band(&self, ph: f64) -> PhBand {
        if ph < self.ph_bands.acidic_below {
            PhBand::Acidic
        } else if ph > self.ph_bands.alkaline_above {
            PhBand::Alkaline
        } else {
            PhBand::Neutral
        }
    }

    pub fn thresholds(&self, crop: CropTarget) -> &NutrientThresholds {
        &self.thresholds[&crop]
    }
}

pub fn nutrient_status(value: f64, band: Band) -> NutrientStatus {
    if value < band.low_below {
        NutrientStatus::Low
    } else if value >= band.high_from {
        NutrientStatus::High
    } else {
        NutrientStatus::Adequate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::normalizer::normalize;
    use crate::models::SoilSample;
    use proptest::prelude::*;

    fn classifier() -> NutrientClassifier {
        NutrientClassifier::new(&EngineConfig::default()).unwrap()
    }

    fn classify(sample: SoilSample, crop: CropTarget) -> (NpkStatus, PhBand) {
        classifier().classify(&normalize(&sample, crop).unwrap())
    }

    #[test]
    fn band_edges() {
        let band = Band::new(100.0, 250.0);
        assert_eq!(nutrient_status(99.9, band), NutrientStatus::Low);
        assert_eq!(nutrient_status(100.0, band), NutrientStatus::Adequate);
        assert_eq!(nutrient_status(249.9, band), NutrientStatus::Adequate);
        assert_eq!(nutrient_status(250.0, band), NutrientStatus::High);
    }

    #[test]
    fn ph_cut_points_are_neutral() {
        let c = classifier();
        assert_eq!(c.ph_band(6.49), PhBand::Acidic);
        assert_eq!(c.ph_band(6.5), PhBand::Neutral);
        assert_eq!(c.ph_band(7.5), PhBand::Neutral);
        assert_eq!(c.ph_band(7.51), PhBand::Alkaline);
    }

    #[test]
    fn thresholds_are_crop_specific() {
        // 90 kg/ha N is short for rice but fine for wheat.
        let sample = SoilSample::new("Loam").with_npk(90.0, 30.0, 150.0);
        let (rice, _) = classify(sample.clone(), CropTarget::Rice);
        let (wheat, _) = classify(sample, CropTarget::Wheat);
        assert_eq!(rice.nitrogen, NutrientStatus::Low);
        assert_eq!(wheat.nitrogen, NutrientStatus::Adequate);
    }

    #[test]
    fn classifies_all_three_nutrients() {
        let (npk, band) = classify(
            SoilSample::new("Clay").with_ph(8.1).with_npk(300.0, 10.0, 120.0),
            CropTarget::Maize,
        );
        assert_eq!(npk.nitrogen, NutrientStatus::High);
        assert_eq!(npk.phosphorus, NutrientStatus::Low);
        assert_eq!(npk.potassium, NutrientStatus::Adequate);
        assert_eq!(band, PhBand::Alkaline);
    }

    #[test]
    fn refuses_partial_coverage() {
        let mut config = EngineConfig::default();
        config.nutrient_thresholds.remove(&CropTarget::Fruits);
        assert!(matches!(
            NutrientClassifier::new(&config),
            Err(AdvisorError::Config(_))
        ));
    }

    proptest! {
        #[test]
        fn status_is_monotone_in_value(
            crop_idx in 0usize..8,
            a in 0.0f64..600.0,
            b in 0.0f64..600.0,
        ) {
            let crop = CropTarget::all()[crop_idx];
            let c = classifier();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for nutrient in Nutrient::all() {
                let band = c.thresholds(crop).band(*nutrient);
                prop_assert!(nutrient_status(lo, band) <= nutrient_status(hi, band));
            }
        }
    }
}
