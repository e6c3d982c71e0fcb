//! Implementation of the `assetmap emit` command.
//!
//! Replays a recorded build through the manifest lifecycle, the way a bundler
//! would drive it: discovery, report, emit into the output directory, the
//! optional after-emit write and the `done` hooks.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use assetmap_lib::host::{BuildRecord, Compilation, LoaderEmission};
use assetmap_lib::util::path::resolve;
use assetmap_lib::{AssetsManifest, ManifestOptions};

use crate::output::{OutputFormat, format_bytes, Status, print_json, print_stat, print_status};

#[derive(Debug, Serialize)]
struct EmitSummary {
  asset: Option<String>,
  path: Option<PathBuf>,
  entries: usize,
  bytes: usize,
  written_to_disk: bool,
}

/// Load a build record, resolving its paths against the record's directory.
fn load_record(path: &Path) -> Result<BuildRecord> {
  let content =
    fs::read_to_string(path).with_context(|| format!("Failed to read build record: {}", path.display()))?;
  let mut record: BuildRecord =
    serde_json::from_str(&content).with_context(|| format!("Failed to parse build record: {}", path.display()))?;

  let dir = path.parent().unwrap_or(Path::new(""));
  let base = std::env::current_dir()
    .map(|cwd| resolve(&cwd, dir))
    .unwrap_or_else(|_| dir.to_path_buf());
  record.compiler.context = resolve(&base, &record.compiler.context);
  record.compiler.output_path = resolve(&base, &record.compiler.output_path);
  for emission in &mut record.loader_emissions {
    emission.user_request = resolve(&record.compiler.context, &emission.user_request);
  }
  for module in &mut record.compilation.asset_modules {
    module.user_request = resolve(&record.compiler.context, &module.user_request);
  }

  // The record describes the build; this process's own arguments do not.
  record.compiler.argv = Vec::new();
  Ok(record)
}

/// Fill in asset sources from the output directory where they exist.
fn load_sources(output_dir: &Path, compilation: &mut Compilation) {
  for asset in &mut compilation.assets {
    if !asset.source.is_empty() {
      continue;
    }
    match fs::read(output_dir.join(&asset.name)) {
      Ok(source) => asset.source = source,
      Err(e) => debug!(asset = %asset.name, error = %e, "no source on disk"),
    }
  }
}

async fn run(
  manifest: &mut AssetsManifest,
  emissions: &[LoaderEmission],
  compilation: &mut Compilation,
) -> Result<EmitSummary> {
  manifest.handle_before_run();
  manifest.handle_this_compilation();
  for emission in emissions {
    manifest.handle_loader_emit(&emission.output_name, &emission.user_request);
  }
  manifest.handle_process_assets_analyse(compilation);
  let asset = manifest.handle_process_assets_report(compilation).await?;

  let mut path = None;
  let mut bytes = 0;
  if let Some(name) = &asset
    && let Some(emitted) = compilation.asset(name)
    && let Some(compiler) = manifest.compiler()
  {
    bytes = emitted.source.len();
    if !compiler.transient_output_fs {
      let target = compiler.output_path.join(name);
      if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
          .await
          .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
      }
      tokio::fs::write(&target, &emitted.source)
        .await
        .with_context(|| format!("Failed to write manifest: {}", target.display()))?;
      path = Some(target);
    }
  }

  let written_to_disk = manifest.handle_after_emit().await?;
  if written_to_disk {
    path = manifest.emitted_path().map(Path::to_path_buf);
  }
  manifest.handle_done(compilation.stats()).await?;

  Ok(EmitSummary {
    asset,
    path,
    entries: manifest.len(),
    bytes,
    written_to_disk,
  })
}

/// Execute the emit command.
pub fn cmd_emit(build: &Path, config: Option<&Path>, format: OutputFormat) -> Result<()> {
  let record = load_record(build)?;
  let options = match config {
    Some(path) => ManifestOptions::load(path).with_context(|| format!("Failed to load options: {}", path.display()))?,
    None => ManifestOptions::default(),
  };

  let BuildRecord {
    compiler,
    loader_emissions,
    mut compilation,
  } = record;
  load_sources(&compiler.output_path, &mut compilation);

  let mut manifest = AssetsManifest::new(options);
  manifest.apply(compiler).context("Failed to apply manifest options")?;

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;
  let summary = rt
    .block_on(run(&mut manifest, &loader_emissions, &mut compilation))
    .context("Manifest generation failed")?;

  if format.is_json() {
    return print_json(&summary);
  }

  match &summary.asset {
    Some(asset) => print_status(Status::Success, &format!("Emitted {}", asset)),
    None => {
      print_status(Status::Warning, "Manifest is disabled; nothing emitted");
      return Ok(());
    }
  }
  print_stat("Entries", &summary.entries.to_string());
  print_stat("Size", &format_bytes(summary.bytes as u64));
  if let Some(path) = &summary.path {
    print_stat("Path", &path.display().to_string());
  }
  if summary.written_to_disk {
    print_status(Status::Info, "Manifest written to disk after emit");
  }
  Ok(())
}
