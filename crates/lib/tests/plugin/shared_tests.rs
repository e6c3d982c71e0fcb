use std::cell::RefCell;
use std::rc::Rc;

use assetmap_lib::hooks::{DoneContext, HookError, LocalBoxFuture};
use assetmap_lib::host::{Asset, Compilation};
use assetmap_lib::options::WriteToDisk;
use assetmap_lib::{ManifestError, ManifestOptions};
use serde_json::json;

use super::common::{TestBuild, run_build, sample_compilation};

#[tokio::test]
async fn targets_share_one_table() {
  let build = TestBuild::new();
  let shared = ManifestOptions::default().assets;

  let mut client = build.manifest(ManifestOptions {
    assets: Rc::clone(&shared),
    ..Default::default()
  });
  let mut server = build.manifest(ManifestOptions {
    assets: Rc::clone(&shared),
    output: build.context().join("shared-manifest.json"),
    ..Default::default()
  });

  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut client, &emissions, &mut compilation).await.unwrap();

  server.handle_this_compilation();
  let mut server_compilation = Compilation {
    assets: vec![Asset::new("server.42.js")],
    assets_by_chunk_name: [("server".to_string(), vec!["server.42.js".to_string()])]
      .into_iter()
      .collect(),
    ..Default::default()
  };
  server.handle_process_assets_analyse(&mut server_compilation);
  server
    .handle_process_assets_report(&mut server_compilation)
    .await
    .unwrap();
  assert!(server.handle_after_emit().await.unwrap());

  assert!(client.has("server.js"));
  assert!(server.has("main.js"));
  assert_eq!(shared.borrow().get("server.js"), Some(&json!("server.42.js")));

  let written: serde_json::Value =
    serde_json::from_str(&std::fs::read_to_string(build.context().join("shared-manifest.json")).unwrap()).unwrap();
  assert_eq!(written["main.js"], json!("main.9c68.js"));
  assert_eq!(written["server.js"], json!("server.42.js"));
}

#[tokio::test]
async fn delete_is_visible_across_instances() {
  let build = TestBuild::new();
  let shared = ManifestOptions::default().assets;
  let mut a = build.manifest(ManifestOptions {
    assets: Rc::clone(&shared),
    ..Default::default()
  });
  let b = build.manifest(ManifestOptions {
    assets: Rc::clone(&shared),
    ..Default::default()
  });

  a.set("x.js", json!("x.1.js"));
  assert_eq!(b.get("x.js"), Some(json!("x.1.js")));
  assert!(a.delete("x.js"));
  assert!(!b.has("x.js"));
}

#[tokio::test]
async fn watch_rebuild_drops_stale_entries() {
  let build = TestBuild::new();
  let mut manifest = build.manifest(ManifestOptions::default());
  let (emissions, mut compilation) = sample_compilation(&build);
  run_build(&build, &mut manifest, &emissions, &mut compilation).await.unwrap();
  assert!(manifest.has("images/logo.png"));

  manifest.handle_watch_run();
  manifest.handle_this_compilation();
  let mut rebuilt = Compilation {
    assets: vec![Asset::new("main.abcd.js")],
    assets_by_chunk_name: [("main".to_string(), vec!["main.abcd.js".to_string()])]
      .into_iter()
      .collect(),
    ..Default::default()
  };
  manifest.handle_process_assets_analyse(&mut rebuilt);
  manifest.handle_process_assets_report(&mut rebuilt).await.unwrap();

  assert!(!manifest.has("images/logo.png"));
  assert_eq!(manifest.get("main.js"), Some(json!("main.abcd.js")));
}

#[tokio::test]
async fn done_hooks_run_in_order_and_failures_propagate() {
  let build = TestBuild::new();
  let calls = Rc::new(RefCell::new(Vec::new()));

  let mut manifest = build.manifest(ManifestOptions {
    write_to_disk: WriteToDisk::On,
    ..Default::default()
  });
  let seen = Rc::clone(&calls);
  manifest.hooks_mut().tap_done(
    "record",
    Rc::new(move |context: DoneContext| {
      let seen = Rc::clone(&seen);
      Box::pin(async move {
        seen.borrow_mut().push(context.manifest["main.js"].clone());
        Ok(())
      }) as LocalBoxFuture<Result<(), HookError>>
    }),
  );
  manifest.hooks_mut().tap_done(
    "upload",
    Rc::new(|_: DoneContext| {
      Box::pin(async { Err(HookError::new("upload", "bucket unavailable")) }) as LocalBoxFuture<Result<(), HookError>>
    }),
  );

  let (emissions, mut compilation) = sample_compilation(&build);
  let err = run_build(&build, &mut manifest, &emissions, &mut compilation)
    .await
    .unwrap_err();

  assert!(matches!(err, ManifestError::Hook(ref e) if e.tap == "upload"), "{err}");
  assert_eq!(*calls.borrow(), vec![json!("main.9c68.js")]);
  assert!(build.output_dir().join("assets-manifest.json").exists());
}
