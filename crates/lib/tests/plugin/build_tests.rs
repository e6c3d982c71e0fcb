use std::rc::Rc;

use assetmap_lib::hooks::{Customized, Entry};
use assetmap_lib::host::{Asset, BuildRecord};
use assetmap_lib::options::{EntrypointsKey, PublicPath};
use assetmap_lib::{AssetsManifest, ManifestOptions};
use serde_json::json;

use super::common::{TestBuild, run_build, sample_compilation};

#[tokio::test]
async fn maps_every_discovery_source() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions::default());
  let (emissions, mut compilation) = sample_compilation(&build);

  let name = run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();
  assert_eq!(name.as_deref(), Some("assets-manifest.json"));

  let content = std::fs::read_to_string(build.output_dir().join("assets-manifest.json")).unwrap();
  assert_eq!(
    content,
    r#"{"fonts/inter.woff2":"fonts/inter.55ee.woff2","images/logo.png":"images/logo.1a2b.png","main.css":"main.9c68.css","main.js":"main.9c68.js"}"#
  );
}

#[tokio::test]
async fn hot_updates_never_appear() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    entrypoints: true,
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  compilation.assets.push(Asset::new("flagged.abc.js").with_info(assetmap_lib::host::AssetInfo {
    hot_module_replacement: Some(true),
    ..Default::default()
  }));
  compilation
    .entrypoints
    .get_mut("main")
    .unwrap()
    .files
    .push("flagged.abc.js".into());

  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let content = std::fs::read_to_string(build.output_dir().join("assets-manifest.json")).unwrap();
  assert!(!content.contains("hot-update"), "{}", content);
  assert!(!content.contains("flagged"), "{}", content);
}

#[tokio::test]
async fn context_relative_keys() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    context_relative_keys: true,
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let written = build.read_output("assets-manifest.json");
  assert_eq!(written["src/assets/logo.png"], json!("images/logo.1a2b.png"));
  assert_eq!(written["src/fonts/inter.woff2"], json!("fonts/inter.55ee.woff2"));
  assert_eq!(written["main.js"], json!("main.9c68.js"));
}

#[tokio::test]
async fn entrypoints_grouped_by_extension() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    entrypoints: true,
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let written = build.read_output("assets-manifest.json");
  assert_eq!(
    written["entrypoints"],
    json!({ "main": { "js": ["main.9c68.js"], "css": ["main.9c68.css"] } })
  );
}

#[tokio::test]
async fn flattened_entrypoints_with_public_path() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    entrypoints: true,
    entrypoints_key: EntrypointsKey::Flatten,
    public_path: PublicPath::Prefix("https://cdn.example.com/app/".into()),
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let written = build.read_output("assets-manifest.json");
  assert_eq!(written["main"]["js"], json!(["https://cdn.example.com/app/main.9c68.js"]));
  assert_eq!(written["main.js"], json!("https://cdn.example.com/app/main.9c68.js"));
}

#[tokio::test]
async fn output_name_placeholders() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    output: "meta/[name]-[hash].json".into(),
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  let name = run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  assert_eq!(name.as_deref(), Some("meta/assets-manifest-f00d.json"));
  assert!(build.output_dir().join("meta/assets-manifest-f00d.json").exists());
}

#[tokio::test]
async fn integrity_uses_recorded_digest() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    integrity: true,
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  compilation.assets[0]
    .info
    .extra
    .insert("integrity".into(), json!("sha256-XYZ"));

  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let written = build.read_output("assets-manifest.json");
  assert_eq!(written["main.js"], json!({ "src": "main.9c68.js", "integrity": "sha256-XYZ" }));
  let css = written["main.css"]["integrity"].as_str().unwrap();
  assert_eq!(css.split(' ').count(), 3);
}

#[tokio::test]
async fn integrity_with_only_unsupported_algorithms_is_empty() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    integrity: true,
    integrity_hashes: vec!["md5".into()],
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  assert!(manifest.options().integrity_hashes.is_empty());
  let written = build.read_output("assets-manifest.json");
  assert_eq!(written["main.js"], json!({ "src": "main.9c68.js", "integrity": "" }));
}

#[tokio::test]
async fn customize_option_drops_and_renames() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions {
    customize: Some(Rc::new(
      |entry: &Customized, original: &Entry, _: &AssetsManifest, asset: Option<&Asset>| {
        if original.key.ends_with(".css") {
          return Some(Customized::Skip);
        }
        if asset.is_some_and(|a| a.name.starts_with("images/")) {
          if let Customized::Entry { key: Some(key), .. } = entry {
            return Some(Customized::Entry {
              key: Some(format!("img:{}", key)),
              value: None,
            });
          }
        }
        None
      },
    )),
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  assert!(!manifest.has("main.css"));
  assert_eq!(manifest.get("img:images/logo.png"), Some(json!("images/logo.1a2b.png")));
  assert!(!manifest.has("images/logo.png"));
}

#[tokio::test]
async fn replays_recorded_build() {
  let build = TestBuild::new();
  let record: BuildRecord = serde_json::from_value(json!({
    "compiler": {
      "context": build.context(),
      "outputPath": build.output_dir(),
      "publicPath": "/static/",
    },
    "compilation": {
      "hash": "abc",
      "assets": [{ "name": "app.1.js" }],
      "assetsByChunkName": { "app": ["app.1.js"] },
    },
  }))
  .unwrap();

  let mut manifest = AssetsManifest::new(ManifestOptions {
    public_path: PublicPath::Compiler,
    ..Default::default()
  });
  let mut compiler = record.compiler;
  compiler.argv = Vec::new();
  manifest.apply(compiler).unwrap();

  let mut compilation = record.compilation;
  run_build(&build, &mut manifest, &record.loader_emissions, &mut compilation)
    .await
    .unwrap();
  assert_eq!(manifest.get("app.js"), Some(json!("/static/app.1.js")));
}
