pub mod classifier;
pub mod fusion;
pub mod health_index;
pub mod normalizer;
pub mod predictor;
pub mod recommender;
pub mod rules;

pub use classifier::NutrientClassifier;
pub use fusion::FusionResolver;
pub use health_index::HealthIndexScorer;
pub use predictor::{ModelArtifact, Prediction, Predictor};
pub use recommender::Recommender;
pub use rules::RulesEngine;
