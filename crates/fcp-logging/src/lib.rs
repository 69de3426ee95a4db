//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Structured logging context and drill lifecycle events."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
#![warn(missing_docs)]

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Drill scenario identifier (e.g. `probe-disconnect`).
    pub scenario: Option<&'a str>,
    /// Identifier of the drill execution.
    pub drill_id: Option<&'a str>,
    /// Probe under test or being verified.
    pub probe: Option<&'a str>,
    /// Scorecard surface the event refers to.
    pub surface: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a scenario identifier.
    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }

    /// Attach a drill execution identifier.
    pub fn with_drill_id(mut self, drill_id: &'a str) -> Self {
        self.drill_id = Some(drill_id);
        self
    }

    /// Attach a probe identifier.
    pub fn with_probe(mut self, probe: &'a str) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Attach a scorecard surface.
    pub fn with_surface(mut self, surface: &'a str) -> Self {
        self.surface = Some(surface);
        self
    }
}

/// Outcome attached to drill lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillEventOutcome {
    /// Every check held.
    Pass,
    /// At least one check failed.
    Fail,
}

impl DrillEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            DrillEventOutcome::Pass => "pass",
            DrillEventOutcome::Fail => "fail",
        }
    }

    fn level(&self) -> Level {
        match self {
            DrillEventOutcome::Pass => Level::INFO,
            DrillEventOutcome::Fail => Level::ERROR,
        }
    }
}

/// Emit a standardized drill lifecycle event with a pass/fail outcome.
pub fn log_drill_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: DrillEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // tracing needs a const level per callsite.
    if outcome.level() == Level::ERROR {
        tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            scenario = ctx.scenario.unwrap_or(""),
            drill_id = ctx.drill_id.unwrap_or(""),
            probe = ctx.probe.unwrap_or(""),
            message = %message
        );
    } else {
        tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            scenario = ctx.scenario.unwrap_or(""),
            drill_id = ctx.drill_id.unwrap_or(""),
            probe = ctx.probe.unwrap_or(""),
            message = %message
        );
    }
}
