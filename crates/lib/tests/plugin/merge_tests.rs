use assetmap_lib::ManifestError;
use assetmap_lib::ManifestOptions;
use assetmap_lib::lock::{LockError, ManifestLock};
use assetmap_lib::merge::MergeError;
use assetmap_lib::options::MergeMode;
use serde_json::json;

use super::common::{TestBuild, run_build, sample_compilation};

fn merging() -> ManifestOptions {
  ManifestOptions {
    merge: MergeMode::On,
    ..Default::default()
  }
}

#[tokio::test]
async fn keeps_entries_from_previous_build() {
  let build = TestBuild::new();
  build.write_output("assets-manifest.json", r#"{"a.js":"a.js"}"#);

  let mut manifest = build.manifest(merging());
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let written = build.read_output("assets-manifest.json");
  assert_eq!(written["a.js"], json!("a.js"));
  assert_eq!(written["main.js"], json!("main.9c68.js"));
}

#[tokio::test]
async fn fresh_scalars_win() {
  let build = TestBuild::new();
  build.write_output("assets-manifest.json", r#"{"main.js":"main.old.js"}"#);

  let mut manifest = build.manifest(merging());
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  assert_eq!(build.read_output("assets-manifest.json")["main.js"], json!("main.9c68.js"));
}

#[tokio::test]
async fn entrypoint_arrays_are_replaced() {
  let build = TestBuild::new();
  build.write_output(
    "assets-manifest.json",
    r#"{"entrypoints":{"main":{"js":["main.old.js","vendor.old.js"],"css":["main.old.css"]},"admin":{"js":["admin.js"]}}}"#,
  );

  let mut manifest = build.manifest(ManifestOptions {
    entrypoints: true,
    ..merging()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  compilation.entrypoints.get_mut("main").unwrap().files = vec!["main.9c68.js".into()];
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let entrypoints = &build.read_output("assets-manifest.json")["entrypoints"];
  assert_eq!(entrypoints["main"]["js"], json!(["main.9c68.js"]));
  assert_eq!(entrypoints["main"]["css"], json!(["main.old.css"]));
  assert_eq!(entrypoints["admin"], json!({ "js": ["admin.js"] }));
}

#[tokio::test]
async fn corrupt_existing_manifest_fails_the_build() {
  let build = TestBuild::new();
  let path = build.write_output("assets-manifest.json", "{\"a.js\": ");

  let mut manifest = build.manifest(merging());
  let (emissions, mut compilation) = sample_compilation(&build);
  let err = run_build(&build, &mut manifest, &emissions, &mut compilation)
    .await
    .unwrap_err();
  assert!(matches!(err, ManifestError::Merge(MergeError::Parse { .. })), "{err}");

  let relocked = ManifestLock::acquire(&path, &build.lock_options()).await;
  assert!(relocked.is_ok());
}

#[tokio::test]
async fn missing_existing_manifest_fails_the_build() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(merging());
  let (emissions, mut compilation) = sample_compilation(&build);
  let err = run_build(&build, &mut manifest, &emissions, &mut compilation)
    .await
    .unwrap_err();
  match err {
    ManifestError::Merge(MergeError::Read { source, .. }) => {
      assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    }
    other => panic!("expected a read error, got {other:?}"),
  }
}

#[tokio::test]
async fn held_lock_times_out() {
  let build = TestBuild::new();
  let path = build.write_output("assets-manifest.json", "{}");
  let held = ManifestLock::acquire(&path, &build.lock_options()).await.unwrap();

  let mut manifest = build.manifest(merging());
  let (emissions, mut compilation) = sample_compilation(&build);
  let err = run_build(&build, &mut manifest, &emissions, &mut compilation)
    .await
    .unwrap_err();
  assert!(matches!(err, ManifestError::Lock(LockError::Timeout { .. })), "{err}");

  held.release();
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();
}

#[tokio::test]
async fn abandoned_lock_file_does_not_block_the_build() {
  let build = TestBuild::new();
  let path = build.write_output("assets-manifest.json", "{}");
  let options = build.lock_options();
  std::fs::create_dir_all(&options.dir).unwrap();
  std::fs::write(ManifestLock::lock_path_for(&options.dir, &path), "").unwrap();

  let mut manifest = build.manifest(merging());
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();
}

#[tokio::test]
async fn merge_with_customize_runs_hook_on_old_entries() {
  let build = TestBuild::new();
  build.write_output("assets-manifest.json", r#"{"legacy.js":"legacy.js"}"#);

  let mut manifest = build.manifest(ManifestOptions {
    merge: MergeMode::Customize,
    customize: Some(std::rc::Rc::new(
      |_: &assetmap_lib::hooks::Customized,
       original: &assetmap_lib::hooks::Entry,
       manifest: &assetmap_lib::AssetsManifest,
       _: Option<&assetmap_lib::host::Asset>| {
        (manifest.is_merging() && original.key == "legacy.js").then_some(assetmap_lib::hooks::Customized::Skip)
      },
    )),
    ..Default::default()
  });
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();

  let written = build.read_output("assets-manifest.json");
  assert!(written.get("legacy.js").is_none());
  assert_eq!(written["main.js"], json!("main.9c68.js"));
}
