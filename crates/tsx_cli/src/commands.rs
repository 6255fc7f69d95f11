//! Subcommand implementations; output goes to the writer they are given

use crate::config::TieBreakMode;
use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tsx_autotile::{load_with_tileset, write_tsx, NoMatch, Resolver, WangId, WangRuleTable};
use tsx_core::Tileset;

/// Output format of `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// Normalized `.tsx` document
    #[default]
    Tsx,
    /// Catalog and rule table as JSON
    Json,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    tileset: &'a Tileset,
    wangsets: &'a WangRuleTable,
}

pub fn load(path: &Path) -> Result<(Tileset, WangRuleTable)> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let loaded = load_with_tileset(&source)
        .with_context(|| format!("failed to load {}", path.display()))?;
    tracing::info!("Loaded tileset '{}' from {}", loaded.0.name, path.display());
    Ok(loaded)
}

pub fn inspect(path: &Path, out: &mut dyn Write) -> Result<()> {
    let (tileset, rules) = load(path)?;

    writeln!(out, "tileset '{}'", tileset.name)?;
    writeln!(
        out,
        "  tiles: {} ({} columns x {} rows of {}x{} px)",
        tileset.tile_count(),
        tileset.columns,
        tileset.rows(),
        tileset.tile_width,
        tileset.tile_height
    )?;
    if let Some(image) = &tileset.image {
        let trans = image
            .trans
            .map(|c| format!(", transparent {c}"))
            .unwrap_or_default();
        writeln!(
            out,
            "  image: {} ({}x{}{})",
            image.source, image.width, image.height, trans
        )?;
    }

    let overrides: Vec<_> = tileset.probability_overrides().collect();
    if !overrides.is_empty() {
        writeln!(out, "  probability overrides:")?;
        for (tile_id, probability) in overrides {
            writeln!(out, "    {tile_id}: {probability}")?;
        }
    }

    writeln!(out, "wang sets: {}", rules.len())?;
    for set in &rules {
        writeln!(
            out,
            "  '{}' ({}): {} colors, {} tiles",
            set.name,
            set.set_type.as_str(),
            set.colors.len(),
            set.tiles().len()
        )?;
        for (i, color) in set.colors.iter().enumerate() {
            writeln!(out, "    {} {} {}", i + 1, color.name, color.color)?;
        }
    }
    Ok(())
}

/// Validate every file, stopping at the first one that fails
pub fn check(paths: &[PathBuf], out: &mut dyn Write) -> Result<()> {
    for path in paths {
        let (tileset, rules) = load(path)?;
        writeln!(
            out,
            "{}: ok ({} tiles, {} wang sets)",
            path.display(),
            tileset.tile_count(),
            rules.len()
        )?;
    }
    Ok(())
}

/// Resolve one neighborhood; the inner `Err` is a valid "no tile" answer
pub fn resolve(
    path: &Path,
    set_name: &str,
    wang_id: &WangId,
    mode: TieBreakMode,
    seed: Option<u64>,
) -> Result<std::result::Result<u32, NoMatch>> {
    let (_, rules) = load(path)?;
    let set = rules.get(set_name).with_context(|| {
        let known: Vec<_> = rules.names().collect();
        format!(
            "no wang set named '{}' in {} (available: {})",
            set_name,
            path.display(),
            known.join(", ")
        )
    })?;

    let resolver = Resolver::new(set);
    let result = match mode.deterministic() {
        Some(tie_break) => resolver.with_tie_break(tie_break).resolve(wang_id),
        None => {
            let mut rng = match seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_entropy(),
            };
            resolver.resolve_random(wang_id, &mut rng)
        }
    };
    Ok(result)
}

pub fn export(path: &Path, format: ExportFormat) -> Result<String> {
    let (tileset, rules) = load(path)?;
    let text = match format {
        ExportFormat::Tsx => write_tsx(&tileset, &rules)?,
        ExportFormat::Json => {
            let mut json = serde_json::to_string_pretty(&JsonExport {
                tileset: &tileset,
                wangsets: &rules,
            })?;
            json.push('\n');
            json
        }
    };
    Ok(text)
}
