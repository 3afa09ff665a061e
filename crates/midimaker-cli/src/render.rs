//! `midimaker render`: score file in, MIDI file out.

use crate::{load_score, RenderArgs};
use anyhow::{Context, Result};
use midimaker_core::{InterpreterContext, MidiFileSink, Preferences};
use std::path::PathBuf;

/// Preferences from `--preferences`, else the user's file, else defaults.
fn base_preferences(args: &RenderArgs) -> Result<Preferences> {
    match &args.preferences {
        Some(path) => Preferences::from_path(path)
            .with_context(|| format!("Failed to read preferences: {}", path.display())),
        None => Ok(Preferences::load_or_default()),
    }
}

fn output_path(args: &RenderArgs) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| args.score_file.with_extension("mid"))
}

pub fn render(args: RenderArgs) -> Result<()> {
    let score = load_score(&args.score_file)?;

    let mut preferences = score
        .preferences(&base_preferences(&args)?)
        .context("Invalid [preferences] in score")?;
    if let Some(seed) = args.seed {
        preferences.seed = seed;
    }
    if args.no_jitter {
        preferences = preferences.without_jitter();
    }
    log::debug!("Preferences: {:?}", preferences);

    let mut performance = score
        .resolve(&args.composition, &preferences)
        .context("Nothing to render")?;
    if performance.voices.is_empty() {
        log::warn!("Score declares no usable voices");
    }

    let mut sink = MidiFileSink::new(performance.voices.len());
    let summary = InterpreterContext::new(preferences).render(
        &mut performance.voices,
        &performance.composition,
        &mut sink,
    )?;

    let output = output_path(&args);
    sink.write(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Rendered {} bars, {} notes to {}",
        summary.bars,
        summary.notes,
        output.display()
    );
    Ok(())
}
