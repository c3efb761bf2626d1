//! Fertilizer advice from a soil-test report: a soil health index, a
//! crop-aware decision table and an optional trained model, reconciled into
//! one recommendation with its provenance spelled out.

pub mod chemistry;
pub mod config;
pub mod error;
pub mod logic;
pub mod models;

pub use config::EngineConfig;
pub use error::{AdvisorError, Result};
pub use logic::{Predictor, Recommender};
pub use models::{FinalRecommendation, Provenance, RecommendationRequest, SoilSample};
