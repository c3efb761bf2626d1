use crate::error::{AdvisorError, Result};
use crate::logic::rules::REFERENCED_PRODUCTS;
use crate::models::{
    labels_match, CategoryThresholds, CropTarget, Element, FertilizerClass, FertilizerSpec,
    HealthFactor, Nutrient,
};
use dialoguer::{Confirm, Input};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Every table the engine decides with. Loaded once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    pub ph_bands: PhBandCuts,
    pub nutrient_thresholds: BTreeMap<CropTarget, NutrientThresholds>,
    pub health_index: HealthIndexConfig,
    #[serde(default)]
    pub crop_overrides: BTreeMap<CropTarget, CropOverride>,
    pub rules: RuleSettings,
    pub fertilizers: Vec<FertilizerSpec>,
    #[serde(default)]
    pub fusion: FusionSettings,
    #[serde(default)]
    pub model: ModelSettings,
}

/// pH below `acidic_below` is Acidic, above `alkaline_above` is Alkaline.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PhBandCuts {
    pub acidic_below: f64,
    pub alkaline_above: f64,
}

/// Value < `low_below` is Low, value >= `high_from` is High.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Band {
    pub low_below: f64,
    pub high_from: f64,
}

impl Band {
    pub const fn new(low_below: f64, high_from: f64) -> Self {
        Self {
            low_below,
            high_from,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NutrientThresholds {
    pub nitrogen: Band,
    pub phosphorus: Band,
    pub potassium: Band,
}

impl NutrientThresholds {
    pub fn band(&self, nutrient: Nutrient) -> Band {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthIndexConfig {
    pub weights: FactorWeights,
    pub bands: FactorBands,
    #[serde(default)]
    pub categories: CategoryThresholds,
    /// Sub-scores below this get a per-factor note.
    #[serde(default = "default_flag_below")]
    pub flag_below: f64,
}

fn default_flag_below() -> f64 {
    0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FactorWeights {
    pub ph: f64,
    pub organic_carbon: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ec: f64,
}

impl FactorWeights {
    pub fn get(&self, factor: HealthFactor) -> f64 {
        match factor {
            HealthFactor::Ph => self.ph,
            HealthFactor::OrganicCarbon => self.organic_carbon,
            HealthFactor::Nitrogen => self.nitrogen,
            HealthFactor::Phosphorus => self.phosphorus,
            HealthFactor::Potassium => self.potassium,
            HealthFactor::Ec => self.ec,
        }
    }

    pub fn sum(&self) -> f64 {
        HealthFactor::all().iter().map(|f| self.get(*f)).sum()
    }
}

/// Piecewise-linear sub-score: 1.0 inside `[optimal_min, optimal_max]`,
/// falling to 0.0 at `zero_below` / `zero_above`. A missing edge means no
/// penalty on that side.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct OptimalBand {
    pub optimal_min: f64,
    pub optimal_max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_below: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_above: Option<f64>,
}

impl OptimalBand {
    pub const fn new(optimal_min: f64, optimal_max: f64, zero_below: f64, zero_above: f64) -> Self {
        Self {
            optimal_min,
            optimal_max,
            zero_below: Some(zero_below),
            zero_above: Some(zero_above),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FactorBands {
    pub ph: OptimalBand,
    pub organic_carbon: OptimalBand,
    pub nitrogen: OptimalBand,
    pub phosphorus: OptimalBand,
    pub potassium: OptimalBand,
    pub ec: OptimalBand,
}

impl FactorBands {
    pub fn get(&self, factor: HealthFactor) -> OptimalBand {
        match factor {
            HealthFactor::Ph => self.ph,
            HealthFactor::OrganicCarbon => self.organic_carbon,
            HealthFactor::Nitrogen => self.nitrogen,
            HealthFactor::Phosphorus => self.phosphorus,
            HealthFactor::Potassium => self.potassium,
            HealthFactor::Ec => self.ec,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CropBehavior {
    #[default]
    Standard,
    /// Biological N fixation: favour biofertilizer over mineral N.
    Legume,
    /// Prefer one NPK complex when several nutrients are short at once.
    BalancedComplex,
    /// Heavy feeder: split N by growth stage, extra weight on potassium.
    HighDemand,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CropOverride {
    #[serde(default)]
    pub behavior: CropBehavior,
    /// Replaces `rules.default_maintenance` for this crop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleSettings {
    pub default_maintenance: String,
    /// Tried in order by the balanced-complex override.
    pub complex_options: Vec<String>,
    /// Appended by the soil-health overlay.
    pub organic_amendments: Vec<String>,
    /// Available S (mg/kg) below which a soil counts as sulphur deficient.
    pub sulphur_deficient_below: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    #[default]
    Hybrid,
    /// Diagnostic mode: the model label is final whenever a model answers.
    ModelOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct FusionSettings {
    #[serde(default)]
    pub mode: FusionMode,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ModelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Load from an explicit path, or search the standard locations and fall
    /// back to the built-in tables when nothing is found.
    pub fn load(config_override: Option<&Path>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => {
                if !p.exists() {
                    return Err(AdvisorError::Config(format!(
                        "Config file not found at {:?}. Run `fertadvisor init` to create one.",
                        p
                    )));
                }
                p.to_path_buf()
            }
            None => match Self::find_config_path() {
                Some(p) => p,
                None => {
                    tracing::info!("No configuration file found - using built-in tables");
                    let config = Self::default();
                    config.validate()?;
                    return Ok(config);
                }
            },
        };

        tracing::info!("Loading configuration from {}", config_path.display());
        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| AdvisorError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content)?;

        let config: EngineConfig = serde_yaml::from_str(&content)
            .map_err(|e| AdvisorError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AdvisorError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Search for advisor.yaml: ./config first, then the XDG config dir.
    pub fn find_config_path() -> Option<PathBuf> {
        let local_config = PathBuf::from("config/advisor.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir()
            .map(|dir| dir.join("fertadvisor").join("advisor.yaml"))
            .filter(|p| p.exists())
    }

    /// Default path for writing new config files (~/.config/fertadvisor/advisor.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AdvisorError::Config("Cannot determine config directory".into()))?
            .join("fertadvisor");
        Ok(config_dir.join("advisor.yaml"))
    }

    /// Prompt for the few settings that differ per installation and write
    /// the default tables to disk.
    pub fn setup_interactive() -> Result<(Self, PathBuf)> {
        let config_path = Self::default_config_path()?;

        println!();
        println!("fertadvisor setup");
        println!();

        if config_path.exists() {
            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "  {} already exists. Overwrite it?",
                    config_path.display()
                ))
                .default(false)
                .interact()
                .map_err(|e| AdvisorError::Config(format!("Input error: {}", e)))?;
            if !overwrite {
                let existing = Self::load(Some(&config_path))?;
                return Ok((existing, config_path));
            }
        }

        let mut config = Self::default();

        println!("Statistical model (leave blank to run rules-only)");
        let artifact: String = Input::new()
            .with_prompt("  Model artifact path (.json)")
            .default(String::new())
            .allow_empty(true)
            .interact_text()
            .map_err(|e| AdvisorError::Config(format!("Input error: {}", e)))?;

        if !artifact.trim().is_empty() {
            config.model.artifact_path = Some(PathBuf::from(artifact.trim()));

            let model_only = Confirm::new()
                .with_prompt("  Diagnostic model-only mode (bypass rules)?")
                .default(false)
                .interact()
                .map_err(|e| AdvisorError::Config(format!("Input error: {}", e)))?;
            if model_only {
                config.fusion.mode = FusionMode::ModelOnly;
            }
        }

        println!();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = config.to_yaml_string()?;
        let content = format!(
            "# fertadvisor configuration\n# Generated by `fertadvisor init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(&config_path, content)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let mut result = content.to_string();

        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| AdvisorError::Config(format!("Bad substitution pattern: {}", e)))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        Ok(result)
    }

    pub fn fertilizer(&self, name: &str) -> Option<&FertilizerSpec> {
        self.fertilizers.iter().find(|f| labels_match(&f.name, name))
    }

    pub fn crop_override(&self, crop: CropTarget) -> CropOverride {
        self.crop_overrides.get(&crop).cloned().unwrap_or_default()
    }

    pub fn maintenance_for(&self, crop: CropTarget) -> &str {
        self.crop_overrides
            .get(&crop)
            .and_then(|o| o.maintenance.as_deref())
            .unwrap_or(&self.rules.default_maintenance)
    }

    /// Refuse anything that would leave the engine with partial coverage.
    pub fn validate(&self) -> Result<()> {
        let cuts = &self.ph_bands;
        if !(cuts.acidic_below.is_finite() && cuts.alkaline_above.is_finite())
            || cuts.acidic_below < 0.0
            || cuts.alkaline_above > 14.0
            || cuts.acidic_below > cuts.alkaline_above
        {
            return Err(AdvisorError::Config(format!(
                "ph_bands must satisfy 0 <= acidic_below <= alkaline_above <= 14, got {} / {}",
                cuts.acidic_below, cuts.alkaline_above
            )));
        }

        for crop in CropTarget::all() {
            let thresholds = self.nutrient_thresholds.get(crop).ok_or_else(|| {
                AdvisorError::Config(format!("nutrient_thresholds has no entry for {}", crop))
            })?;
            for nutrient in Nutrient::all() {
                let band = thresholds.band(*nutrient);
                if !(band.low_below.is_finite() && band.high_from.is_finite())
                    || band.low_below < 0.0
                    || band.low_below > band.high_from
                {
                    return Err(AdvisorError::Config(format!(
                        "{} {} band must satisfy 0 <= low_below <= high_from, got {} / {}",
                        crop, nutrient, band.low_below, band.high_from
                    )));
                }
            }
        }

        self.validate_health_index()?;
        self.validate_fertilizers()?;

        if !self.rules.sulphur_deficient_below.is_finite() || self.rules.sulphur_deficient_below < 0.0
        {
            return Err(AdvisorError::Config(
                "rules.sulphur_deficient_below must be a non-negative number".into(),
            ));
        }

        Ok(())
    }

    fn validate_health_index(&self) -> Result<()> {
        let health = &self.health_index;

        for factor in HealthFactor::all() {
            let w = health.weights.get(*factor);
            if !w.is_finite() || w < 0.0 {
                return Err(AdvisorError::Config(format!(
                    "health_index weight for {} must be non-negative, got {}",
                    factor, w
                )));
            }

            let band = health.bands.get(*factor);
            let ordered = band.optimal_min.is_finite()
                && band.optimal_max.is_finite()
                && band.optimal_min <= band.optimal_max
                && band.zero_below.map_or(true, |z| z.is_finite() && z < band.optimal_min)
                && band.zero_above.map_or(true, |z| z.is_finite() && z > band.optimal_max);
            if !ordered {
                return Err(AdvisorError::Config(format!(
                    "health_index band for {} must satisfy zero_below < optimal_min <= optimal_max < zero_above",
                    factor
                )));
            }
        }

        let sum = health.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(AdvisorError::Config(format!(
                "health_index weights must sum to 1.0, got {:.6}",
                sum
            )));
        }

        let c = &health.categories;
        if !(0.0 <= c.moderate && c.moderate <= c.good && c.good <= c.excellent && c.excellent <= 1.0) {
            return Err(AdvisorError::Config(format!(
                "health_index categories must satisfy 0 <= moderate <= good <= excellent <= 1, got {} / {} / {}",
                c.moderate, c.good, c.excellent
            )));
        }

        if !(health.flag_below > 0.0 && health.flag_below <= 1.0) {
            return Err(AdvisorError::Config(format!(
                "health_index.flag_below must be in (0, 1], got {}",
                health.flag_below
            )));
        }

        Ok(())
    }

    fn validate_fertilizers(&self) -> Result<()> {
        for (i, spec) in self.fertilizers.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(AdvisorError::Config(format!(
                    "fertilizers[{}] has an empty name",
                    i
                )));
            }
            if self.fertilizers[..i]
                .iter()
                .any(|other| labels_match(&other.name, &spec.name))
            {
                return Err(AdvisorError::Config(format!(
                    "fertilizer '{}' is listed twice",
                    spec.name
                )));
            }
            if spec
                .composition
                .values()
                .any(|pct| !pct.is_finite() || !(0.0..=100.0).contains(pct))
            {
                return Err(AdvisorError::Config(format!(
                    "fertilizer '{}' has a composition outside 0-100%",
                    spec.name
                )));
            }
        }

        let mut referenced: Vec<(&str, &str)> = REFERENCED_PRODUCTS
            .iter()
            .map(|name| ("decision table", *name))
            .collect();
        referenced.push((
            "rules.default_maintenance",
            self.rules.default_maintenance.as_str(),
        ));
        referenced.extend(
            self.rules
                .organic_amendments
                .iter()
                .map(|n| ("rules.organic_amendments", n.as_str())),
        );
        referenced.extend(
            self.crop_overrides
                .values()
                .filter_map(|o| o.maintenance.as_deref())
                .map(|n| ("crop_overrides.maintenance", n)),
        );

        for (source, name) in referenced {
            if self.fertilizer(name).is_none() {
                return Err(AdvisorError::Config(format!(
                    "{} references '{}', which is not in the fertilizer catalog",
                    source, name
                )));
            }
        }

        for name in &self.rules.complex_options {
            match self.fertilizer(name) {
                Some(spec) if spec.class == FertilizerClass::NpkComplex => {}
                Some(spec) => {
                    return Err(AdvisorError::Config(format!(
                        "rules.complex_options entry '{}' is {}, not an NPK complex",
                        name, spec.class
                    )))
                }
                None => {
                    return Err(AdvisorError::Config(format!(
                        "rules.complex_options references '{}', which is not in the fertilizer catalog",
                        name
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        use CropTarget::*;

        let thresholds = |n: (f64, f64), p: (f64, f64), k: (f64, f64)| NutrientThresholds {
            nitrogen: Band::new(n.0, n.1),
            phosphorus: Band::new(p.0, p.1),
            potassium: Band::new(k.0, k.1),
        };

        // kg/ha available nutrient; high-demand crops sit higher on N and K
        let nutrient_thresholds = BTreeMap::from([
            (Rice, thresholds((100.0, 250.0), (15.0, 60.0), (60.0, 220.0))),
            (Wheat, thresholds((80.0, 220.0), (15.0, 60.0), (50.0, 200.0))),
            (Maize, thresholds((100.0, 250.0), (15.0, 60.0), (50.0, 200.0))),
            (Sugarcane, thresholds((120.0, 280.0), (20.0, 70.0), (80.0, 280.0))),
            (Cotton, thresholds((80.0, 220.0), (15.0, 60.0), (60.0, 220.0))),
            (Pulses, thresholds((40.0, 150.0), (15.0, 60.0), (40.0, 180.0))),
            (Vegetables, thresholds((90.0, 240.0), (20.0, 70.0), (70.0, 240.0))),
            (Fruits, thresholds((70.0, 220.0), (15.0, 60.0), (70.0, 240.0))),
        ]);

        let crop_overrides = BTreeMap::from([
            (
                Rice,
                CropOverride {
                    behavior: CropBehavior::HighDemand,
                    maintenance: None,
                },
            ),
            (
                Sugarcane,
                CropOverride {
                    behavior: CropBehavior::HighDemand,
                    maintenance: None,
                },
            ),
            (
                Pulses,
                CropOverride {
                    behavior: CropBehavior::Legume,
                    maintenance: Some("DAP".into()),
                },
            ),
            (
                Vegetables,
                CropOverride {
                    behavior: CropBehavior::BalancedComplex,
                    maintenance: None,
                },
            ),
        ]);

        let fertilizers = vec![
            FertilizerSpec::new("Urea", FertilizerClass::Nitrogenous, &[(Element::N, 46.0)]),
            FertilizerSpec::new(
                "Ammonium Sulphate",
                FertilizerClass::Nitrogenous,
                &[(Element::N, 21.0), (Element::S, 24.0)],
            ),
            FertilizerSpec::new(
                "DAP",
                FertilizerClass::Phosphatic,
                &[(Element::N, 18.0), (Element::P, 46.0)],
            ),
            FertilizerSpec::new(
                "SSP",
                FertilizerClass::Phosphatic,
                &[(Element::P, 16.0), (Element::S, 12.0), (Element::Ca, 19.0)],
            ),
            FertilizerSpec::new("MOP", FertilizerClass::Potassic, &[(Element::K, 60.0)]),
            FertilizerSpec::new(
                "NPK_17_17_17",
                FertilizerClass::NpkComplex,
                &[(Element::N, 17.0), (Element::P, 17.0), (Element::K, 17.0)],
            ),
            FertilizerSpec::new(
                "NPK_20_20_0",
                FertilizerClass::NpkComplex,
                &[(Element::N, 20.0), (Element::P, 20.0)],
            ),
            FertilizerSpec::new(
                "FYM",
                FertilizerClass::OrganicManure,
                &[(Element::N, 0.5), (Element::P, 0.2), (Element::K, 0.5)],
            ),
            FertilizerSpec::new(
                "Vermicompost",
                FertilizerClass::OrganicManure,
                &[(Element::N, 1.5), (Element::P, 0.9), (Element::K, 1.2)],
            ),
            FertilizerSpec::new("Biofertilizer", FertilizerClass::Biofertilizer, &[]),
        ];

        Self {
            ph_bands: PhBandCuts {
                acidic_below: 6.5,
                alkaline_above: 7.5,
            },
            nutrient_thresholds,
            health_index: HealthIndexConfig {
                weights: FactorWeights {
                    ph: 0.20,
                    organic_carbon: 0.20,
                    nitrogen: 0.15,
                    phosphorus: 0.15,
                    potassium: 0.15,
                    ec: 0.15,
                },
                bands: FactorBands {
                    ph: OptimalBand::new(6.5, 7.5, 4.0, 9.5),
                    organic_carbon: OptimalBand::new(0.75, 1.5, 0.0, 5.0),
                    nitrogen: OptimalBand::new(50.0, 150.0, 0.0, 400.0),
                    phosphorus: OptimalBand::new(15.0, 60.0, 0.0, 150.0),
                    potassium: OptimalBand::new(50.0, 200.0, 0.0, 500.0),
                    ec: OptimalBand::new(0.2, 0.8, 0.0, 4.0),
                },
                categories: CategoryThresholds::default(),
                flag_below: default_flag_below(),
            },
            crop_overrides,
            rules: RuleSettings {
                default_maintenance: "NPK_17_17_17".into(),
                complex_options: vec!["NPK_17_17_17".into(), "NPK_20_20_0".into()],
                organic_amendments: vec!["FYM".into(), "Vermicompost".into()],
                sulphur_deficient_below: 10.0,
            },
            fertilizers,
            fusion: FusionSettings::default(),
            model: ModelSettings::default(),
        }
    }
}
