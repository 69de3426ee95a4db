//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "module"
//! fcp_type: "source"
//! fcp_scope: "code"
//! fcp_description: "Structured logging context and drill lifecycle events."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
/// Emit an informational log enriched with drill context.
#[macro_export]
macro_rules! fcp_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            scenario = ctx.scenario.unwrap_or(""),
            drill_id = ctx.drill_id.unwrap_or(""),
            probe = ctx.probe.unwrap_or(""),
            surface = ctx.surface.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(
            tracing::Level::INFO,
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning log enriched with drill context.
#[macro_export]
macro_rules! fcp_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            scenario = ctx.scenario.unwrap_or(""),
            drill_id = ctx.drill_id.unwrap_or(""),
            probe = ctx.probe.unwrap_or(""),
            surface = ctx.surface.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(
            tracing::Level::WARN,
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with drill context.
#[macro_export]
macro_rules! fcp_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            scenario = ctx.scenario.unwrap_or(""),
            drill_id = ctx.drill_id.unwrap_or(""),
            probe = ctx.probe.unwrap_or(""),
            surface = ctx.surface.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        tracing::event!(
            tracing::Level::ERROR,
            message = %format_args!($($arg)+)
        );
    }};
}
