use std::path::Path;
use std::process::ExitCode;

use aztro_patterns::{
    AspectEngine, AstrologyError, AstrologyResult, EngineConfig, EventFilter, EventStore,
    InMemoryEventStore, InMemoryPatternStore, ModelStore, PatternExtractor, PatternKind,
    PatternStore, RiskEstimator,
};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const TOP_PATTERNS: usize = 10;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "pattern run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> AstrologyResult<String> {
    let Some(events_path) = args.first() else {
        return Err(AstrologyError::InvalidInput(
            "usage: aztro_patterns <events.json> [config.toml]".to_string(),
        ));
    };

    let config = match args.get(1) {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => {
            let mut config = EngineConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            config
        }
    };

    let json = std::fs::read_to_string(events_path)
        .map_err(|e| AstrologyError::InvalidInput(format!("failed to read {}: {}", events_path, e)))?;
    let mut events = InMemoryEventStore::from_json(&json)?.events(&EventFilter::default())?;
    info!(path = %events_path, events = events.len(), "loaded event corpus");

    // Records that arrive with positions but no aspect graph get one computed here.
    let engine = AspectEngine::new(config.aspects.clone());
    for event in &mut events {
        if event.aspects.is_empty() {
            if let Some(snapshot) = &event.snapshot {
                event.aspects = engine.compute_snapshot(snapshot);
            }
        }
    }

    let set = PatternExtractor::new(config.extraction.clone())
        .extract(&events)
        .into_result()?;
    let families: Vec<_> = [
        PatternKind::Degree,
        PatternKind::Aspect,
        PatternKind::Nakshatra,
        PatternKind::Sign,
        PatternKind::Combined,
    ]
    .iter()
    .map(|&kind| json!({ "kind": kind, "count": set.family(kind).len() }))
    .collect();

    let mut store = InMemoryPatternStore::new();
    let upserted = store.upsert(&set.clone().into_patterns())?;
    let ranked = store.ranked()?;

    let estimator = RiskEstimator::new(config.risk.clone());
    let models = ModelStore::default();
    models.replace(estimator.train(&events, &ranked));
    let snapshot = models.snapshot();

    let latest = events.iter().rev().find_map(|event| {
        event.qualifying_snapshot().map(|positions| {
            json!({
                "event": event.id,
                "assessment": estimator.assess(&snapshot, positions, &event.aspects, &ranked),
            })
        })
    });

    let summary = json!({
        "events": events.len(),
        "qualifying": set.total_events,
        "families": families,
        "upserted": upserted,
        "top_patterns": ranked.iter().take(TOP_PATTERNS).collect::<Vec<_>>(),
        "models": snapshot.models,
        "latest": latest,
    });
    Ok(serde_json::to_string_pretty(&summary)?)
}
