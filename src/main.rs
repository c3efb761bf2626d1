mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fertadvisor::chemistry;
use fertadvisor::logic::RulesEngine;
use fertadvisor::{EngineConfig, FinalRecommendation, Predictor, RecommendationRequest, Recommender};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let load_config =
        || EngineConfig::load(cli.config.as_deref()).context("Configuration error");

    match cli.command {
        Commands::Init => {
            let (_, path) = EngineConfig::setup_interactive()?;
            println!("Run `fertadvisor check --config {}` to verify it.", path.display());
        }
        Commands::Recommend { file, crop, json } => {
            let config = load_config()?;
            let predictor = load_predictor(cli.model.as_deref(), &config);
            let recommender = Recommender::new(config, predictor)?;

            let mut request = read_request(&file)?;
            if let Some(crop) = crop {
                request.crop = crop;
            }

            let recommendation = recommender.handle(&request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                print_recommendation(&recommendation);
            }
        }
        Commands::Check => {
            run_check(cli.config.as_deref(), cli.model.as_deref(), load_config()?)?
        }
        Commands::Rules => {
            let engine = RulesEngine::new(Arc::new(load_config()?))?;
            println!("{:<22} {:<20} Rule", "Id", "Tier");
            for (id, name, tier) in engine.list_rules() {
                println!("{:<22} {:<20} {}", id, tier.as_str(), name);
            }
        }
        Commands::Explain { name } => {
            let config = load_config()?;
            if let Some(explanation) = chemistry::explain(&name, &config) {
                println!("{} [{}]", explanation.full_name, explanation.class);
                println!("  Formula:  {}", explanation.formula);
                println!("  Supplies: {}", explanation.nutrient_form);
                for point in &explanation.key_points {
                    println!("  - {}", point);
                }
            } else if let Some(topic) = chemistry::topic(&name) {
                println!("{}", topic.title);
                println!("  {}", topic.summary);
                for bullet in topic.bullets {
                    println!("  - {}", bullet);
                }
            } else {
                let known: Vec<&str> = config.fertilizers.iter().map(|f| f.name.as_str()).collect();
                bail!(
                    "'{}' is not in the fertilizer catalog ({}) or a known topic",
                    name,
                    known.join(", ")
                );
            }
        }
    }

    Ok(())
}

/// Model problems never stop a recommendation; the engine runs rules-only.
fn load_predictor(model_override: Option<&Path>, config: &EngineConfig) -> Predictor {
    let Some(path) = model_override.or(config.model.artifact_path.as_deref()) else {
        return Predictor::unavailable();
    };

    match Predictor::load(path) {
        Ok(predictor) => predictor,
        Err(e) => {
            tracing::warn!("Ignoring model artifact {}: {}", path.display(), e);
            Predictor::unavailable()
        }
    }
}

fn read_request(file: &Path) -> Result<RecommendationRequest> {
    let content = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?
    };

    let is_json = file.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let request = if is_json {
        serde_json::from_str(&content).context("Invalid JSON request")?
    } else {
        serde_yaml::from_str(&content).context("Invalid YAML request")?
    };
    Ok(request)
}

fn run_check(
    config_override: Option<&Path>,
    model_override: Option<&Path>,
    config: EngineConfig,
) -> Result<()> {
    let source = config_override
        .map(Path::to_path_buf)
        .or_else(EngineConfig::find_config_path)
        .map(|p: PathBuf| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());
    println!("Configuration: OK ({})", source);
    println!(
        "  {} crops, {} fertilizers, fusion mode {:?}",
        config.nutrient_thresholds.len(),
        config.fertilizers.len(),
        config.fusion.mode
    );

    match model_override.or(config.model.artifact_path.as_deref()) {
        None => println!("Model: none configured (rules-only)"),
        Some(path) => match Predictor::load(path) {
            Ok(predictor) => match predictor.artifact() {
                Some(artifact) => println!(
                    "Model: OK ({} classifier, {} classes, trained {})",
                    artifact.classifier.kind(),
                    artifact.classifier.classes().len(),
                    artifact.trained_at.format("%Y-%m-%d")
                ),
                None => println!("Model: not found at {} (rules-only)", path.display()),
            },
            Err(e) => println!("Model: FAILED ({})", e),
        },
    }

    let engine = RulesEngine::new(Arc::new(config))?;
    println!("Rules: {} loaded", engine.list_rules().len());
    Ok(())
}

fn print_recommendation(rec: &FinalRecommendation) {
    println!();
    println!(
        "  {} {}  [{}]",
        rec.provenance.symbol(),
        rec.fertilizer,
        rec.provenance
    );
    println!(
        "  Soil health {:.2} ({}) | N {} P {} K {} | pH {}",
        rec.soil_health.score,
        rec.soil_health.category,
        rec.rule_verdict.npk_status.nitrogen,
        rec.rule_verdict.npk_status.phosphorus,
        rec.rule_verdict.npk_status.potassium,
        rec.rule_verdict.ph_band
    );
    println!();

    for line in &rec.rationale {
        println!("  {}", line);
    }

    if let (true, Some(model)) = (rec.provenance.used_model(), rec.model_verdict.as_ref()) {
        println!();
        println!("  Model probabilities:");
        for (label, p) in &model.class_probabilities {
            println!("    {:<18} {:>5.1}%", label, p * 100.0);
        }
    }

    if !rec.rule_verdict.alternates.is_empty() {
        println!();
        println!("  Alternatives:");
        for option in &rec.rule_verdict.alternates {
            println!("    {} ({})", option.name, option.grade());
        }
    }

    for warning in &rec.rule_verdict.warnings {
        println!("  ! {}", warning);
    }
    for note in &rec.rule_verdict.notes {
        println!("  * {}", note);
    }
    println!();
}
