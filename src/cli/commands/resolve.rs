//! Resolve command - report how a specifier loads.

use std::path::PathBuf;

use anyhow::Context;
use serde_json::json;

use crate::ipc::DependencyReporter;
use crate::loader::{LoadMode, LoadOutcome, LoadRequest, Resolver};

/// Arguments for the resolve command.
pub struct ResolveArgs {
    pub specifier: String,
    pub mode: LoadMode,
    pub from: Option<PathBuf>,
    pub json: bool,
}

/// Run the resolve command.
///
/// Prints `loaded <path> <capabilities>` on success. A resolution failure
/// goes to stderr with exit code 1.
pub fn run(args: ResolveArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let base = match &args.from {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let resolver = Resolver::new(&base);
    let outcome = match resolver.request(&LoadRequest::new(&args.specifier, args.mode)) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&to_json(&outcome))?);
    } else {
        println!("{}", outcome.describe(resolver.base()));
    }

    report_dependency(&outcome);
    Ok(())
}

fn to_json(outcome: &LoadOutcome) -> serde_json::Value {
    json!({
        "path": outcome.module.absolute_path,
        "mode": outcome.mode,
        "moduleSystem": outcome.module.module_system,
        "effectiveSystem": outcome.effective_system,
        "context": outcome.context,
    })
}

/// Declare the resolved file to a supervising `watchrun watch`, if any.
fn report_dependency(outcome: &LoadOutcome) {
    let Some(reporter) = DependencyReporter::from_env() else {
        return;
    };

    let result = reporter.and_then(|mut reporter| reporter.report(&outcome.module.absolute_path));
    if let Err(e) = result {
        tracing::warn!("[resolve] could not report dependency: {e}");
    }
}
