use super::{fail, Session};
use featload_core::{LoaderConfig, ResolveTrace, EXPLAIN_SCHEMA_VERSION};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

/// Explain result for JSON output.
#[derive(Debug, Serialize)]
struct ExplainJsonResult {
    ok: bool,
    schema_version: u32,
    specifier: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    trace: ResolveTrace,
}

/// Run the explain command.
pub fn run(config: &LoaderConfig, specifier: &str, preload: Option<&Path>, json: bool) -> Result<()> {
    let session = match Session::open(config, preload) {
        Ok(session) => session,
        Err(err) => return fail(err, json),
    };

    let resolved = session.resolver.resolve_with_trace(specifier);
    let result = ExplainJsonResult {
        ok: true,
        schema_version: EXPLAIN_SCHEMA_VERSION,
        specifier: specifier.to_string(),
        outcome: resolved.outcome.as_str(),
        path: resolved.outcome.path().map(str::to_string),
        trace: resolved.trace,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else {
        print_human(&result);
    }
    Ok(())
}

fn print_human(result: &ExplainJsonResult) {
    println!("Specifier: {}", result.specifier);
    match &result.path {
        Some(path) => println!("Outcome: {} ({path})", result.outcome),
        None => println!("Outcome: {}", result.outcome),
    }
    println!();

    println!("Resolution trace:");
    for (i, step) in result.trace.steps.iter().enumerate() {
        let status = if step.ok { "OK" } else { "FAIL" };
        println!("  {}. [{}] {}: {}", i + 1, status, step.step, step.detail);
        if let Some(ref path) = step.path {
            println!("      path: {path}");
        }
        for note in &step.notes {
            println!("      note: {note}");
        }
    }
}
