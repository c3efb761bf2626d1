use super::crop::CropTarget;
use serde::{Deserialize, Serialize};

/// Lowercases and strips whitespace, hyphens and underscores so that
/// "Silt Loam", "silt-loam" and "SILT_LOAM" share one key.
pub fn canonical_key(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoilType {
    Clay,
    Loam,
    Sandy,
    SiltLoam,
    ClayLoam,
    SandyLoam,
    Black,
    Red,
    Alluvial,
    Laterite,
}

impl SoilType {
    pub fn all() -> &'static [SoilType] {
        &[
            SoilType::Clay,
            SoilType::Loam,
            SoilType::Sandy,
            SoilType::SiltLoam,
            SoilType::ClayLoam,
            SoilType::SandyLoam,
            SoilType::Black,
            SoilType::Red,
            SoilType::Alluvial,
            SoilType::Laterite,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Clay => "Clay",
            SoilType::Loam => "Loam",
            SoilType::Sandy => "Sandy",
            SoilType::SiltLoam => "Silt Loam",
            SoilType::ClayLoam => "Clay Loam",
            SoilType::SandyLoam => "Sandy Loam",
            SoilType::Black => "Black",
            SoilType::Red => "Red",
            SoilType::Alluvial => "Alluvial",
            SoilType::Laterite => "Laterite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match canonical_key(s).as_str() {
            "clay" => Some(SoilType::Clay),
            "loam" => Some(SoilType::Loam),
            "sandy" => Some(SoilType::Sandy),
            "siltloam" => Some(SoilType::SiltLoam),
            "clayloam" => Some(SoilType::ClayLoam),
            "sandyloam" => Some(SoilType::SandyLoam),
            "black" => Some(SoilType::Black),
            "red" => Some(SoilType::Red),
            "alluvial" => Some(SoilType::Alluvial),
            "laterite" => Some(SoilType::Laterite),
            _ => None,
        }
    }
}

impl std::fmt::Display for SoilType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw soil-test report as supplied by the caller. Nothing here is trusted
/// until it has been through the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilSample {
    #[serde(rename = "pH", alias = "ph")]
    pub ph: f64,
    /// Percent.
    #[serde(alias = "organic_carbon")]
    pub organic_carbon: f64,
    /// Available N, kg/ha.
    pub nitrogen: f64,
    /// Available P, kg/ha.
    pub phosphorus: f64,
    /// Available K, kg/ha.
    pub potassium: f64,
    /// Electrical conductivity, dS/m.
    pub ec: f64,
    #[serde(alias = "soil_type")]
    pub soil_type: String,
    /// mm
    pub rainfall: f64,
    /// °C
    pub temperature: f64,
    /// Available S, mg/kg. Optional on most soil-test cards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sulphur: Option<f64>,
}

impl SoilSample {
    pub fn new(soil_type: impl Into<String>) -> Self {
        Self {
            ph: 7.0,
            organic_carbon: 0.8,
            nitrogen: 0.0,
            phosphorus: 0.0,
            potassium: 0.0,
            ec: 0.5,
            soil_type: soil_type.into(),
            rainfall: 0.0,
            temperature: 25.0,
            sulphur: None,
        }
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = ph;
        self
    }

    pub fn with_organic_carbon(mut self, organic_carbon: f64) -> Self {
        self.organic_carbon = organic_carbon;
        self
    }

    pub fn with_npk(mut self, nitrogen: f64, phosphorus: f64, potassium: f64) -> Self {
        self.nitrogen = nitrogen;
        self.phosphorus = phosphorus;
        self.potassium = potassium;
        self
    }

    pub fn with_ec(mut self, ec: f64) -> Self {
        self.ec = ec;
        self
    }

    pub fn with_climate(mut self, rainfall: f64, temperature: f64) -> Self {
        self.rainfall = rainfall;
        self.temperature = temperature;
        self
    }

    pub fn with_sulphur(mut self, sulphur: f64) -> Self {
        self.sulphur = Some(sulphur);
        self
    }
}

/// A soil sample plus the crop it is being assessed for, in the shape the
/// command line and other front-ends hand over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// May be left out when the front-end supplies the crop separately.
    #[serde(default)]
    pub crop: String,
    #[serde(flatten)]
    pub sample: SoilSample,
}

/// Validated, canonical view of one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    #[serde(rename = "pH")]
    pub ph: f64,
    pub organic_carbon: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub ec: f64,
    pub soil_type: SoilType,
    pub rainfall: f64,
    pub temperature: f64,
    pub sulphur: Option<f64>,
    pub crop: CropTarget,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Category(&'static str),
}

impl NormalizedRecord {
    /// Looks a feature up by the column names used in the training data.
    pub fn feature(&self, name: &str) -> Option<FeatureValue> {
        use FeatureValue::{Category, Numeric};

        match canonical_key(name).as_str() {
            "ph" => Some(Numeric(self.ph)),
            "organiccarbon" => Some(Numeric(self.organic_carbon)),
            "nitrogen" | "n" => Some(Numeric(self.nitrogen)),
            "phosphorus" | "p" => Some(Numeric(self.phosphorus)),
            "potassium" | "k" => Some(Numeric(self.potassium)),
            "ec" => Some(Numeric(self.ec)),
            "rainfall" => Some(Numeric(self.rainfall)),
            "temperature" => Some(Numeric(self.temperature)),
            "sulphur" | "sulfur" | "s" => self.sulphur.map(Numeric),
            "soiltype" => Some(Category(self.soil_type.as_str())),
            "crop" => Some(Category(self.crop.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NormalizedRecord {
        NormalizedRecord {
            ph: 6.8,
            organic_carbon: 0.9,
            nitrogen: 120.0,
            phosphorus: 35.0,
            potassium: 160.0,
            ec: 0.6,
            soil_type: SoilType::SiltLoam,
            rainfall: 800.0,
            temperature: 27.0,
            sulphur: None,
            crop: CropTarget::Wheat,
        }
    }

    #[test]
    fn canonical_key_ignores_case_and_separators() {
        assert_eq!(canonical_key("Silt Loam"), "siltloam");
        assert_eq!(canonical_key("  silt-loam "), "siltloam");
        assert_eq!(canonical_key("SILT_LOAM"), "siltloam");
    }

    #[test]
    fn soil_type_from_str_valid() {
        assert_eq!(SoilType::from_str("clay"), Some(SoilType::Clay));
        assert_eq!(SoilType::from_str("Loam"), Some(SoilType::Loam));
        assert_eq!(SoilType::from_str(" SANDY "), Some(SoilType::Sandy));
        assert_eq!(SoilType::from_str("silt loam"), Some(SoilType::SiltLoam));
        assert_eq!(SoilType::from_str("Sandy-Loam"), Some(SoilType::SandyLoam));
        assert_eq!(SoilType::from_str("alluvial"), Some(SoilType::Alluvial));
    }

    #[test]
    fn soil_type_from_str_invalid() {
        assert_eq!(SoilType::from_str("dirt"), None);
        assert_eq!(SoilType::from_str(""), None);
        assert_eq!(SoilType::from_str("sand"), None);
    }

    #[test]
    fn soil_type_round_trip() {
        for soil_type in SoilType::all() {
            assert_eq!(SoilType::from_str(soil_type.as_str()), Some(*soil_type));
            let debug_str = format!("{:?}", soil_type);
            assert_eq!(SoilType::from_str(&debug_str), Some(*soil_type));
        }
    }

    #[test]
    fn sample_deserializes_training_column_names() {
        let json = r#"{
            "pH": 6.4, "organic_carbon": 0.7, "nitrogen": 55, "phosphorus": 18,
            "potassium": 120, "soil_type": "Loam", "rainfall": 800,
            "temperature": 27, "ec": 0.6
        }"#;
        let sample: SoilSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.ph, 6.4);
        assert_eq!(sample.organic_carbon, 0.7);
        assert_eq!(sample.soil_type, "Loam");
        assert!(sample.sulphur.is_none());
    }

    #[test]
    fn request_flattens_sample_fields() {
        let yaml = "crop: Rice\npH: 6.5\norganicCarbon: 0.8\nnitrogen: 80\nphosphorus: 25\n\
                    potassium: 150\nec: 0.4\nsoilType: Loam\nrainfall: 1200\ntemperature: 28\n";
        let request: RecommendationRequest = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.crop, "Rice");
        assert_eq!(request.sample.nitrogen, 80.0);
        assert_eq!(request.sample.soil_type, "Loam");
    }

    #[test]
    fn feature_lookup_uses_training_names() {
        let rec = record();
        assert_eq!(rec.feature("pH"), Some(FeatureValue::Numeric(6.8)));
        assert_eq!(
            rec.feature("organic_carbon"),
            Some(FeatureValue::Numeric(0.9))
        );
        assert_eq!(
            rec.feature("soil_type"),
            Some(FeatureValue::Category("Silt Loam"))
        );
        assert_eq!(rec.feature("crop"), Some(FeatureValue::Category("Wheat")));
        // sulphur was not measured
        assert_eq!(rec.feature("sulphur"), None);
        assert_eq!(rec.feature("zinc"), None);
    }
}
