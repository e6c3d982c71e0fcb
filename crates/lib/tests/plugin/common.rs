//! Shared helpers for driving manifest builds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use assetmap_lib::host::{Asset, AssetModule, Compilation, Compiler, Entrypoint, LoaderEmission};
use assetmap_lib::lock::LockOptions;
use assetmap_lib::options::Space;
use assetmap_lib::{AssetsManifest, ManifestError, ManifestOptions};
use indexmap::IndexMap;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated build directory: `<temp>` is the context, `<temp>/dist` the output.
pub struct TestBuild {
  pub temp: TempDir,
}

impl TestBuild {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn context(&self) -> &Path {
    self.temp.path()
  }

  pub fn output_dir(&self) -> PathBuf {
    self.temp.path().join("dist")
  }

  pub fn compiler(&self) -> Compiler {
    let mut compiler = Compiler::new(self.context(), self.output_dir());
    compiler.argv = Vec::new();
    compiler
  }

  pub fn lock_options(&self) -> LockOptions {
    LockOptions {
      dir: self.temp.path().join("locks"),
      wait: Duration::from_millis(200),
      retry_wait: Duration::from_millis(10),
    }
  }

  /// A manifest applied to this build, with compact output.
  pub fn manifest(&self, options: ManifestOptions) -> AssetsManifest {
    let mut manifest = AssetsManifest::new(ManifestOptions {
      space: Space::Width(0),
      ..options
    });
    manifest.set_lock_options(self.lock_options());
    manifest.apply(self.compiler()).unwrap();
    manifest
  }

  pub fn write_output(&self, relative: &str, content: &str) -> PathBuf {
    let path = self.output_dir().join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
  }

  pub fn read_output(&self, relative: &str) -> Value {
    let content = std::fs::read_to_string(self.output_dir().join(relative)).unwrap();
    serde_json::from_str(&content).unwrap()
  }
}

/// A small but complete compilation: one entry with js and css, a loader
/// emitted image, an asset module font and a hot update.
pub fn sample_compilation(build: &TestBuild) -> (Vec<LoaderEmission>, Compilation) {
  let emissions = vec![
    LoaderEmission {
      output_name: "images/logo.1a2b.png".into(),
      user_request: build.context().join("src/assets/logo.png"),
    },
    LoaderEmission {
      output_name: "main.77.hot-update.json".into(),
      user_request: build.context().join("src/index.js"),
    },
  ];

  let mut entrypoints = IndexMap::new();
  entrypoints.insert(
    "main".to_string(),
    Entrypoint {
      files: vec!["main.9c68.js".into(), "main.9c68.css".into()],
      ..Default::default()
    },
  );

  let compilation = Compilation {
    hash: Some("f00d".into()),
    assets: vec![
      Asset::new("main.9c68.js").with_source("console.log('main')"),
      Asset::new("main.9c68.css").with_source("body { margin: 0 }"),
      Asset::new("images/logo.1a2b.png").with_source(vec![137u8, 80, 78, 71]),
      Asset::new("fonts/inter.55ee.woff2").with_source(vec![1u8, 2, 3]),
      Asset::new("main.77.hot-update.json").with_source("{}"),
    ],
    assets_by_chunk_name: [(
      "main".to_string(),
      vec![
        "main.9c68.js".to_string(),
        "main.9c68.css".to_string(),
        "main.77.hot-update.json".to_string(),
      ],
    )]
    .into_iter()
    .collect(),
    asset_modules: vec![AssetModule {
      filename: "fonts/inter.55ee.woff2".into(),
      user_request: build.context().join("src/fonts/inter.woff2"),
      source_filename: Some("src/fonts/inter.woff2".into()),
    }],
    entrypoints,
    warnings: Vec::new(),
  };

  (emissions, compilation)
}

/// Drive one full build the way a bundler would, writing emitted assets
/// into the output directory. Returns the emitted manifest asset name.
pub async fn run_build(
  build: &TestBuild,
  manifest: &mut AssetsManifest,
  emissions: &[LoaderEmission],
  compilation: &mut Compilation,
) -> Result<Option<String>, ManifestError> {
  manifest.handle_before_run();
  manifest.handle_this_compilation();
  for emission in emissions {
    manifest.handle_loader_emit(&emission.output_name, &emission.user_request);
  }
  manifest.handle_process_assets_analyse(compilation);
  let name = manifest.handle_process_assets_report(compilation).await?;

  for asset in &compilation.assets {
    let path = build.output_dir().join(&asset.name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, &asset.source).unwrap();
  }

  manifest.handle_after_emit().await?;
  manifest.handle_done(compilation.stats()).await?;
  Ok(name)
}
