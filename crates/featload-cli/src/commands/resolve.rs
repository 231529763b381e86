use super::{fail, Session};
use featload_core::version::SCHEMA_VERSION;
use featload_core::{IndexStats, LoaderConfig, Outcome};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Options for `featload resolve`.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub specifiers: Vec<String>,
    /// Register each found file before resolving the next specifier.
    pub require: bool,
    pub preload: Option<PathBuf>,
    /// Freeze the log after preloading.
    pub freeze: bool,
}

#[derive(Debug, Serialize)]
struct SpecifierResult {
    specifier: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

/// Resolve result for JSON output (locked format: { ok, results, loaded_features, stats }).
#[derive(Debug, Serialize)]
struct ResolveJsonResult {
    ok: bool,
    schema_version: u32,
    results: Vec<SpecifierResult>,
    loaded_features: Vec<String>,
    stats: IndexStats,
}

/// Run the resolve command.
pub fn run(config: &LoaderConfig, options: &ResolveOptions, json: bool) -> Result<()> {
    match execute(config, options) {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
            } else {
                print_human(&result);
            }
            Ok(())
        }
        Err(err) => fail(err, json),
    }
}

fn execute(config: &LoaderConfig, options: &ResolveOptions) -> featload_core::Result<ResolveJsonResult> {
    let session = Session::open(config, options.preload.as_deref())?;
    if options.freeze {
        session.registry.freeze();
    }

    let mut results = Vec::with_capacity(options.specifiers.len());
    for specifier in &options.specifiers {
        let outcome = if options.require {
            session.resolver.require(specifier)?
        } else {
            session.resolver.resolve(specifier)
        };
        results.push(specifier_result(specifier, &outcome));
    }

    Ok(ResolveJsonResult {
        ok: true,
        schema_version: SCHEMA_VERSION,
        results,
        loaded_features: session.registry.loaded_features(),
        stats: session.registry.stats(),
    })
}

fn specifier_result(specifier: &str, outcome: &Outcome) -> SpecifierResult {
    SpecifierResult {
        specifier: specifier.to_string(),
        outcome: outcome.as_str(),
        path: outcome.path().map(str::to_string),
    }
}

fn print_human(result: &ResolveJsonResult) {
    for r in &result.results {
        match &r.path {
            Some(path) => println!("{}: {} {path}", r.specifier, r.outcome),
            None => println!("{}: {}", r.specifier, r.outcome),
        }
    }
}
