//! ---
//! fcp_section: "08-slo-scoring"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "SLO scorecard engine."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use crate::model::{
    Comparator, Compliance, Indicator, IndicatorStatus, Metric, Objective, Rollup, RollupStatus,
    Surface,
};

/// Rationale attached to indicators without samples.
pub const NO_DATA_RATIONALE: &str = "no data: no samples observed in the window";

const SCORE_PASS: u8 = 100;
const SCORE_WARNING: u8 = 70;
const SCORE_FAIL: u8 = 40;
const SCORE_SEVERE: u8 = 20;

/// Verdict for one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub status: IndicatorStatus,
    pub score: u8,
    pub rationale: String,
}

/// Score one metric against its objective.
pub fn evaluate(objective: &Objective, metric: &Metric) -> Evaluation {
    let Some(value) = metric.value.filter(|_| metric.sample_size > 0) else {
        return Evaluation {
            status: IndicatorStatus::Unknown,
            score: 0,
            rationale: NO_DATA_RATIONALE.to_owned(),
        };
    };

    let (status, score, severe) = match objective.comparator {
        Comparator::HigherIsBetter => {
            if value >= objective.target {
                (IndicatorStatus::Pass, SCORE_PASS, false)
            } else if value >= objective.warning {
                (IndicatorStatus::Warning, SCORE_WARNING, false)
            } else if value < objective.critical {
                (IndicatorStatus::Fail, SCORE_SEVERE, true)
            } else {
                (IndicatorStatus::Fail, SCORE_FAIL, false)
            }
        }
        Comparator::LowerIsBetter => {
            if value <= objective.target {
                (IndicatorStatus::Pass, SCORE_PASS, false)
            } else if value <= objective.warning {
                (IndicatorStatus::Warning, SCORE_WARNING, false)
            } else if value > objective.critical {
                (IndicatorStatus::Fail, SCORE_SEVERE, true)
            } else {
                (IndicatorStatus::Fail, SCORE_FAIL, false)
            }
        }
    };

    let unit = metric.unit.as_str();
    let symbol = objective.comparator.symbol();
    let noun = if metric.sample_size == 1 {
        "sample"
    } else {
        "samples"
    };
    let mut rationale = format!(
        "observed {value:.2}{unit} over {count} {noun} (target {symbol} {target:.2}{unit}, warning {symbol} {warning:.2}{unit}, critical {symbol} {critical:.2}{unit})",
        count = metric.sample_size,
        target = objective.target,
        warning = objective.warning,
        critical = objective.critical,
    );
    if severe {
        rationale.push_str("; severe breach of the critical threshold");
    }

    Evaluation {
        status,
        score,
        rationale,
    }
}

/// Mean of the given scores rounded half away from zero, clamped to 0..=100.
fn average_score(scores: impl Iterator<Item = u8>) -> Option<u8> {
    let (sum, count) = scores.fold((0_u32, 0_u32), |(sum, count), score| {
        (sum + u32::from(score), count + 1)
    });
    if count == 0 {
        return None;
    }
    let mean = (f64::from(sum) / f64::from(count)).round();
    Some(mean.clamp(0.0, 100.0) as u8)
}

/// Roll indicators up into a surface verdict.
pub fn rollup_indicators(indicators: &[Indicator]) -> Rollup {
    let mut compliance = Compliance::default();
    for indicator in indicators {
        compliance.count(indicator.status);
    }

    let score = average_score(
        indicators
            .iter()
            .filter(|indicator| indicator.status != IndicatorStatus::Unknown)
            .map(|indicator| indicator.score),
    );

    let status = if compliance.failing > 0 {
        RollupStatus::Critical
    } else if compliance.warning > 0 {
        RollupStatus::Warning
    } else if compliance.scored() > 0 {
        RollupStatus::Healthy
    } else {
        RollupStatus::Unknown
    };

    let rationale = match score {
        None => "no indicators reported data".to_owned(),
        Some(_) => format!(
            "{} of {} indicators scored: {} passing, {} warning, {} failing",
            compliance.scored(),
            indicators.len(),
            compliance.passing,
            compliance.warning,
            compliance.failing,
        ),
    };

    Rollup {
        score: score.unwrap_or(0),
        status,
        rationale,
        compliance,
    }
}

/// Roll surfaces up into the overall verdict. Compliance counts are summed.
pub fn rollup_surfaces(surfaces: &[Surface]) -> Rollup {
    let mut compliance = Compliance::default();
    for surface in surfaces {
        compliance.absorb(&surface.rollup.compliance);
    }

    let scored: Vec<&Surface> = surfaces
        .iter()
        .filter(|surface| surface.rollup.status != RollupStatus::Unknown)
        .collect();
    let score = average_score(scored.iter().map(|surface| surface.rollup.score));

    let status = if scored
        .iter()
        .any(|surface| surface.rollup.status == RollupStatus::Critical)
    {
        RollupStatus::Critical
    } else if scored
        .iter()
        .any(|surface| surface.rollup.status == RollupStatus::Warning)
    {
        RollupStatus::Warning
    } else if !scored.is_empty() {
        RollupStatus::Healthy
    } else {
        RollupStatus::Unknown
    };

    let rationale = if scored.is_empty() {
        "no surfaces reported data".to_owned()
    } else {
        let degraded: Vec<&str> = scored
            .iter()
            .filter(|surface| surface.rollup.status != RollupStatus::Healthy)
            .map(|surface| surface.id.as_str())
            .collect();
        if degraded.is_empty() {
            format!(
                "{} of {} surfaces scored, all healthy",
                scored.len(),
                surfaces.len()
            )
        } else {
            format!(
                "{} of {} surfaces scored; degraded: {}",
                scored.len(),
                surfaces.len(),
                degraded.join(", ")
            )
        }
    };

    Rollup {
        score: score.unwrap_or(0),
        status,
        rationale,
        compliance,
    }
}
