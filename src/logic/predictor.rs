use crate::error::{AdvisorError, Result};
use crate::models::{canonical_key, FeatureValue, ModelVerdict, NormalizedRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const FORMAT_VERSION: u32 = 1;

const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Outcome of asking the statistical model. Having no model is a normal
/// state, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Available(ModelVerdict),
    Unavailable,
}

/// Versioned bundle written by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub encoder: FeatureEncoder,
    pub classifier: Classifier,
}

/// Standard scaling for numeric columns followed by one-hot columns, in
/// that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    #[serde(default)]
    pub numeric: Vec<NumericFeature>,
    #[serde(default)]
    pub categorical: Vec<CategoricalFeature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFeature {
    pub name: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFeature {
    pub name: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    /// Multinomial logistic regression; one coefficient row per class.
    Softmax {
        classes: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    /// Probabilities are the mean of the per-tree leaf distributions.
    Forest {
        classes: Vec<String>,
        trees: Vec<TreeNode>,
    },
}

/// Binary decision tree. Samples with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

impl TreeNode {
    /// `None` when a split refers to a column the row does not have.
    fn leaf<'a>(&'a self, x: &[f64]) -> Option<&'a [f64]> {
        let mut node = self;
        loop {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if *x.get(*feature)? <= *threshold {
                        left
                    } else {
                        right
                    };
                }
                TreeNode::Leaf { distribution } => return Some(distribution),
            }
        }
    }

    fn check(&self, dimension: usize, classes: usize) -> std::result::Result<(), String> {
        match self {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= dimension {
                    return Err(format!(
                        "split on feature {} but the encoder produces {} columns",
                        feature, dimension
                    ));
                }
                if !threshold.is_finite() {
                    return Err("split threshold is not finite".into());
                }
                left.check(dimension, classes)?;
                right.check(dimension, classes)
            }
            TreeNode::Leaf { distribution } => {
                if distribution.len() != classes {
                    return Err(format!(
                        "leaf has {} probabilities for {} classes",
                        distribution.len(),
                        classes
                    ));
                }
                if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err("leaf distribution has a negative or non-finite entry".into());
                }
                Ok(())
            }
        }
    }
}

impl FeatureEncoder {
    pub fn dimension(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    pub fn encode(&self, record: &NormalizedRecord) -> Result<Vec<f64>> {
        let mut x = Vec::with_capacity(self.dimension());

        for feature in &self.numeric {
            match record.feature(&feature.name) {
                Some(FeatureValue::Numeric(v)) => x.push((v - feature.mean) / feature.scale),
                Some(FeatureValue::Category(_)) => {
                    return Err(AdvisorError::PredictionSkipped(format!(
                        "feature '{}' is categorical but the model expects a number",
                        feature.name
                    )))
                }
                None => {
                    return Err(AdvisorError::PredictionSkipped(format!(
                        "record has no value for model feature '{}'",
                        feature.name
                    )))
                }
            }
        }

        for feature in &self.categorical {
            let value = match record.feature(&feature.name) {
                Some(FeatureValue::Category(c)) => c,
                Some(FeatureValue::Numeric(_)) => {
                    return Err(AdvisorError::PredictionSkipped(format!(
                        "feature '{}' is numeric but the model expects a category",
                        feature.name
                    )))
                }
                None => {
                    return Err(AdvisorError::PredictionSkipped(format!(
                        "record has no value for model feature '{}'",
                        feature.name
                    )))
                }
            };

            let key = canonical_key(value);
            let hot = feature
                .categories
                .iter()
                .position(|c| canonical_key(c) == key)
                .ok_or_else(|| {
                    AdvisorError::PredictionSkipped(format!(
                        "category '{}' of '{}' was not seen in training",
                        value, feature.name
                    ))
                })?;

            x.extend((0..feature.categories.len()).map(|i| if i == hot { 1.0 } else { 0.0 }));
        }

        Ok(x)
    }

    fn check(&self) -> std::result::Result<(), String> {
        for f in &self.numeric {
            if !f.mean.is_finite() || !f.scale.is_finite() || f.scale <= 0.0 {
                return Err(format!(
                    "numeric feature '{}' needs a finite mean and a positive scale",
                    f.name
                ));
            }
        }
        for f in &self.categorical {
            if f.categories.is_empty() {
                return Err(format!("categorical feature '{}' has no categories", f.name));
            }
        }
        Ok(())
    }
}

impl Classifier {
    pub fn classes(&self) -> &[String] {
        match self {
            Classifier::Softmax { classes, .. } | Classifier::Forest { classes, .. } => classes,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::Softmax { .. } => "softmax",
            Classifier::Forest { .. } => "forest",
        }
    }

    /// Raw, unnormalised class scores for one encoded row.
    fn scores(&self, x: &[f64]) -> Result<Vec<f64>> {
        match self {
            Classifier::Softmax {
                coefficients,
                intercepts,
                ..
            } => {
                if coefficients.iter().any(|row| row.len() != x.len()) {
                    return Err(AdvisorError::PredictionSkipped(format!(
                        "model expects a different feature count than the {} encoded",
                        x.len()
                    )));
                }

                let logits: Vec<f64> = coefficients
                    .iter()
                    .zip(intercepts)
                    .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
                    .collect();

                let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Ok(logits.iter().map(|l| (l - max).exp()).collect())
            }
            Classifier::Forest { classes, trees } => {
                let mut totals = vec![0.0; classes.len()];
                for tree in trees {
                    let leaf = tree.leaf(x).ok_or_else(|| {
                        AdvisorError::PredictionSkipped(format!(
                            "tree splits on a column beyond the {} encoded",
                            x.len()
                        ))
                    })?;
                    if leaf.len() != totals.len() {
                        return Err(AdvisorError::PredictionSkipped(
                            "leaf distribution does not match the class list".into(),
                        ));
                    }
                    let mass: f64 = leaf.iter().sum();
                    if mass > 0.0 {
                        for (t, p) in totals.iter_mut().zip(leaf) {
                            *t += p / mass;
                        }
                    }
                }
                Ok(totals)
            }
        }
    }

    fn check(&self, dimension: usize) -> std::result::Result<(), String> {
        let classes = self.classes();
        if classes.is_empty() {
            return Err("classifier has no classes".into());
        }
        for (i, c) in classes.iter().enumerate() {
            if classes[..i].iter().any(|o| canonical_key(o) == canonical_key(c)) {
                return Err(format!("class '{}' is listed twice", c));
            }
        }

        match self {
            Classifier::Softmax {
                coefficients,
                intercepts,
                ..
            } => {
                if coefficients.len() != classes.len() || intercepts.len() != classes.len() {
                    return Err(format!(
                        "softmax needs one coefficient row and intercept per class ({}), got {} / {}",
                        classes.len(),
                        coefficients.len(),
                        intercepts.len()
                    ));
                }
                if let Some(row) = coefficients.iter().find(|r| r.len() != dimension) {
                    return Err(format!(
                        "coefficient row has {} weights but the encoder produces {} columns",
                        row.len(),
                        dimension
                    ));
                }
                if coefficients.iter().flatten().chain(intercepts).any(|w| !w.is_finite()) {
                    return Err("softmax weights must be finite".into());
                }
                Ok(())
            }
            Classifier::Forest { trees, .. } => {
                if trees.is_empty() {
                    return Err("forest has no trees".into());
                }
                trees
                    .iter()
                    .try_for_each(|t| t.check(dimension, classes.len()))
            }
        }
    }
}

impl ModelArtifact {
    pub fn from_json(content: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(content)
            .map_err(|e| AdvisorError::Artifact(format!("Failed to parse artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(AdvisorError::Artifact(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }

        self.encoder
            .check()
            .and_then(|_| self.classifier.check(self.encoder.dimension()))
            .map_err(AdvisorError::Artifact)
    }

    pub fn predict(&self, record: &NormalizedRecord) -> Result<ModelVerdict> {
        let x = self.encoder.encode(record)?;
        let scores = self.classifier.scores(&x)?;
        let classes = self.classifier.classes();
        if scores.is_empty() || scores.len() != classes.len() {
            return Err(AdvisorError::PredictionSkipped(format!(
                "model scored {} classes but lists {}",
                scores.len(),
                classes.len()
            )));
        }

        let total: f64 = scores.iter().sum();
        if !total.is_finite() || total <= PROBABILITY_TOLERANCE {
            return Err(AdvisorError::PredictionSkipped(
                "model produced a degenerate probability distribution".into(),
            ));
        }
        let probabilities: Vec<f64> = scores.iter().map(|s| s / total).collect();

        // First class wins ties.
        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate().skip(1) {
            if *p > probabilities[best] {
                best = i;
            }
        }

        let distribution: BTreeMap<String, f64> = classes
            .iter()
            .cloned()
            .zip(probabilities.iter().copied())
            .collect();

        Ok(ModelVerdict::new(classes[best].clone(), distribution))
    }
}

/// Adapter over an optional trained model. Loaded once and shared
/// read-only across requests.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    artifact: Option<ModelArtifact>,
}

impl Predictor {
    pub fn unavailable() -> Self {
        Self { artifact: None }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.validate()?;
        Ok(Self {
            artifact: Some(artifact),
        })
    }

    /// A missing file leaves the predictor unavailable; a file that exists
    /// but cannot be used is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                "No model artifact at {} - running rules-only",
                path.display()
            );
            return Ok(Self::unavailable());
        }

        let content = std::fs::read_to_string(path)?;
        let artifact = ModelArtifact::from_json(&content)?;

        tracing::info!(
            kind = artifact.classifier.kind(),
            classes = artifact.classifier.classes().len(),
            trained_at = %artifact.trained_at,
            "Loaded model artifact from {}",
            path.display()
        );

        Ok(Self {
            artifact: Some(artifact),
        })
    }

    pub fn is_available(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    pub fn predict(&self, record: &NormalizedRecord) -> Result<Prediction> {
        match &self.artifact {
            None => Ok(Prediction::Unavailable),
            Some(artifact) => artifact.predict(record).map(Prediction::Available),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logic::normalizer::normalize;
    use crate::models::{CropTarget, SoilSample};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn encoder() -> FeatureEncoder {
        FeatureEncoder {
            numeric: vec![
                NumericFeature {
                    name: "Nitrogen".into(),
                    mean: 100.0,
                    scale: 50.0,
                },
                NumericFeature {
                    name: "Phosphorus".into(),
                    mean: 30.0,
                    scale: 15.0,
                },
            ],
            categorical: vec![CategoricalFeature {
                name: "Crop".into(),
                categories: vec!["Rice".into(), "Wheat".into(), "Pulses".into()],
            }],
        }
    }

    fn artifact(classifier: Classifier) -> ModelArtifact {
        ModelArtifact {
            format_version: FORMAT_VERSION,
            trained_at: Utc.with_ymd_and_hms(2025, 11, 2, 9, 30, 0).unwrap(),
            description: "test model".into(),
            encoder: encoder(),
            classifier,
        }
    }

    /// Favours Urea when N is below the mean and DAP when P is below it.
    pub(crate) fn softmax_artifact() -> ModelArtifact {
        artifact(Classifier::Softmax {
            classes: vec!["Urea".into(), "DAP".into(), "MOP".into()],
            coefficients: vec![
                vec![-3.0, 0.0, 0.0, 0.0, 0.0],
                vec![0.0, -3.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0, 0.0],
            ],
            intercepts: vec![0.0, 0.0, 0.5],
        })
    }

    /// Two stumps on scaled nitrogen.
    pub(crate) fn forest_artifact() -> ModelArtifact {
        let stump = |left: Vec<f64>, right: Vec<f64>| TreeNode::Split {
            feature: 0,
            threshold: 0.0,
            left: Box::new(TreeNode::Leaf { distribution: left }),
            right: Box::new(TreeNode::Leaf {
                distribution: right,
            }),
        };
        artifact(Classifier::Forest {
            classes: vec!["Urea".into(), "DAP".into()],
            trees: vec![
                stump(vec![8.0, 2.0], vec![1.0, 9.0]),
                stump(vec![0.6, 0.4], vec![0.0, 1.0]),
            ],
        })
    }

    fn record(n: f64, p: f64, crop: CropTarget) -> NormalizedRecord {
        normalize(&SoilSample::new("Loam").with_npk(n, p, 150.0), crop).unwrap()
    }

    #[test]
    fn encoder_scales_and_one_hots() {
        let x = encoder().encode(&record(150.0, 15.0, CropTarget::Wheat)).unwrap();
        assert_eq!(x, vec![1.0, -1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn unseen_category_skips_prediction() {
        let err = encoder()
            .encode(&record(150.0, 15.0, CropTarget::Cotton))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Cotton"));
    }

    #[test]
    fn missing_feature_skips_prediction() {
        let mut enc = encoder();
        enc.numeric.push(NumericFeature {
            name: "Zinc".into(),
            mean: 1.0,
            scale: 1.0,
        });
        let err = enc.encode(&record(150.0, 15.0, CropTarget::Rice)).unwrap_err();
        assert!(matches!(err, AdvisorError::PredictionSkipped(_)));
    }

    #[test]
    fn optional_sulphur_is_missing_until_measured() {
        let mut enc = encoder();
        enc.numeric.push(NumericFeature {
            name: "sulphur".into(),
            mean: 10.0,
            scale: 5.0,
        });
        assert!(enc.encode(&record(150.0, 15.0, CropTarget::Rice)).is_err());

        let with_s = normalize(
            &SoilSample::new("Loam").with_npk(150.0, 15.0, 150.0).with_sulphur(15.0),
            CropTarget::Rice,
        )
        .unwrap();
        assert_eq!(enc.encode(&with_s).unwrap()[2], 1.0);
    }

    #[test]
    fn softmax_distribution_is_normalised() {
        let model = softmax_artifact();
        let verdict = model.predict(&record(20.0, 30.0, CropTarget::Rice)).unwrap();
        assert_eq!(verdict.label, "Urea");
        let total: f64 = verdict.class_probabilities.values().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
        assert!(verdict.confidence() > 0.9);
    }

    #[test]
    fn softmax_ties_go_to_first_class() {
        let model = artifact(Classifier::Softmax {
            classes: vec!["DAP".into(), "Urea".into()],
            coefficients: vec![vec![0.0; 5], vec![0.0; 5]],
            intercepts: vec![1.0, 1.0],
        });
        let verdict = model.predict(&record(100.0, 30.0, CropTarget::Rice)).unwrap();
        assert_eq!(verdict.label, "DAP");
        assert_relative_eq!(verdict.confidence(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn forest_averages_normalised_leaves() {
        let model = forest_artifact();
        let verdict = model.predict(&record(50.0, 30.0, CropTarget::Wheat)).unwrap();
        assert_eq!(verdict.label, "Urea");
        assert_relative_eq!(verdict.confidence(), 0.7, epsilon = 1e-12);

        let verdict = model.predict(&record(180.0, 30.0, CropTarget::Wheat)).unwrap();
        assert_eq!(verdict.label, "DAP");
        assert_relative_eq!(verdict.confidence(), 0.95, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_forest_output_is_skipped() {
        let model = artifact(Classifier::Forest {
            classes: vec!["Urea".into(), "DAP".into()],
            trees: vec![TreeNode::Leaf {
                distribution: vec![0.0, 0.0],
            }],
        });
        let err = model
            .predict(&record(50.0, 30.0, CropTarget::Rice))
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn validation_rejects_shape_errors() {
        let mut bad = softmax_artifact();
        if let Classifier::Softmax { coefficients, .. } = &mut bad.classifier {
            coefficients[1].pop();
        }
        assert!(matches!(bad.validate(), Err(AdvisorError::Artifact(_))));

        let mut bad = forest_artifact();
        if let Classifier::Forest { trees, .. } = &mut bad.classifier {
            trees.push(TreeNode::Split {
                feature: 9,
                threshold: 0.0,
                left: Box::new(TreeNode::Leaf {
                    distribution: vec![1.0, 0.0],
                }),
                right: Box::new(TreeNode::Leaf {
                    distribution: vec![0.0, 1.0],
                }),
            });
        }
        assert!(matches!(bad.validate(), Err(AdvisorError::Artifact(_))));

        let mut bad = softmax_artifact();
        bad.encoder.numeric[0].scale = 0.0;
        assert!(matches!(bad.validate(), Err(AdvisorError::Artifact(_))));

        let mut bad = softmax_artifact();
        bad.format_version = 7;
        assert!(matches!(bad.validate(), Err(AdvisorError::Artifact(_))));
    }

    #[test]
    fn json_bundle_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string_pretty(&forest_artifact()).unwrap()).unwrap();

        let predictor = Predictor::load(&path).unwrap();
        assert!(predictor.is_available());
        assert_eq!(predictor.artifact(), Some(&forest_artifact()));
    }

    #[test]
    fn classifier_json_is_tagged() {
        let json = serde_json::to_value(&forest_artifact()).unwrap();
        assert_eq!(json["classifier"]["kind"], "forest");
        assert_eq!(json["classifier"]["trees"][0]["node"], "split");
        assert_eq!(json["trained_at"], "2025-11-02T09:30:00Z");
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = Predictor::load(&dir.path().join("absent.json")).unwrap();
        assert!(!predictor.is_available());
        let prediction = predictor
            .predict(&record(50.0, 30.0, CropTarget::Rice))
            .unwrap();
        assert_eq!(prediction, Prediction::Unavailable);
    }

    #[test]
    fn malformed_file_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{\"format_version\": 1, \"classifier\": ").unwrap();
        assert!(matches!(
            Predictor::load(&path),
            Err(AdvisorError::Artifact(_))
        ));
    }
}
