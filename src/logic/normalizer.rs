use crate::error::{AdvisorError, Result};
use crate::models::{CropTarget, NormalizedRecord, SoilSample, SoilType};

const PH_RANGE: (f64, f64) = (0.0, 14.0);
const ORGANIC_CARBON_RANGE: (f64, f64) = (0.0, 100.0);
const TEMPERATURE_RANGE: (f64, f64) = (-50.0, 60.0);

pub fn parse_crop(name: &str) -> Result<CropTarget> {
    CropTarget::from_str(name).ok_or_else(|| AdvisorError::UnknownCrop(name.trim().to_string()))
}

pub fn parse_soil_type(name: &str) -> Result<SoilType> {
    SoilType::from_str(name).ok_or_else(|| AdvisorError::UnknownSoilType(name.trim().to_string()))
}

/// Validate a raw sample and resolve its soil type. Out-of-range values are
/// rejected, never clamped; range boundaries are accepted.
pub fn normalize(raw: &SoilSample, crop: CropTarget) -> Result<NormalizedRecord> {
    let ph = within("pH", raw.ph, PH_RANGE)?;
    let organic_carbon = within("organicCarbon", raw.organic_carbon, ORGANIC_CARBON_RANGE)?;
    let nitrogen = non_negative("nitrogen", raw.nitrogen)?;
    let phosphorus = non_negative("phosphorus", raw.phosphorus)?;
    let potassium = non_negative("potassium", raw.potassium)?;
    let ec = non_negative("ec", raw.ec)?;
    let rainfall = non_negative("rainfall", raw.rainfall)?;
    let temperature = within("temperature", raw.temperature, TEMPERATURE_RANGE)?;
    let sulphur = raw
        .sulphur
        .map(|s| non_negative("sulphur", s))
        .transpose()?;

    let soil_type = parse_soil_type(&raw.soil_type)?;

    Ok(NormalizedRecord {
        ph,
        organic_carbon,
        nitrogen,
        phosphorus,
        potassium,
        ec,
        soil_type,
        rainfall,
        temperature,
        sulphur,
        crop,
    })
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AdvisorError::invalid(field, "must be a finite number"))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64> {
    let value = finite(field, value)?;
    if value < 0.0 {
        return Err(AdvisorError::invalid(
            field,
            format!("must be >= 0, got {}", value),
        ));
    }
    Ok(value)
}

fn within(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<f64> {
    let value = finite(field, value)?;
    if value < min || value > max {
        return Err(AdvisorError::invalid(
            field,
            format!("must be within [{}, {}], got {}", min, max, value),
        ));
    }
    Ok(value)
}
