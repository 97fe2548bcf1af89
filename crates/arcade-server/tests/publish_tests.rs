//! End-to-end publish pipeline tests against a temporary storage root and the
//! in-memory catalog.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arcade_server::catalog::CatalogStore;
use arcade_server::features::games::commands::{self, PublishGameError};
use arcade_server::features::games::DeleteGameCommand;
use arcade_server::ingest::{IngestError, IngestOptions};
use common::{list_files, TestEnv, INDEX_HTML, THUMBNAIL_PNG};
use std::collections::HashSet;
use std::time::Duration;

const WASM: &[u8] = b"\0asm\x01\0\0\0";

// ============================================================================
// Successful Publishes
// ============================================================================

#[tokio::test]
async fn test_top_level_entry_point_is_published_unchanged() {
    let env = TestEnv::new().await;
    let command = env.command(
        "Space Race",
        &[("index.html", INDEX_HTML), ("Build/", b""), ("Build/app.wasm", WASM)],
    );

    let game = env.publisher.publish(command).await.unwrap();

    let build_dir = env.layout.resolve_public(&game.game_folder_url).unwrap();
    assert_eq!(std::fs::read(build_dir.join("index.html")).unwrap(), INDEX_HTML);
    assert_eq!(std::fs::read(build_dir.join("Build/app.wasm")).unwrap(), WASM);
    assert_eq!(list_files(&build_dir), vec!["Build/app.wasm", "index.html"]);

    assert_eq!(game.play_url, format!("{}/index.html", game.game_folder_url));
    assert_eq!(game.metadata["detectedFolder"], "root");
    assert!(game.is_active());

    let thumbnail = env.layout.resolve_public(game.thumbnail_url.as_deref().unwrap()).unwrap();
    assert_eq!(std::fs::read(thumbnail).unwrap(), THUMBNAIL_PNG);

    assert!(env.staged().is_empty());
    assert_eq!(env.catalog.len().await, 1);
}

#[tokio::test]
async fn test_wrapper_folder_is_collapsed() {
    let env = TestEnv::new().await;
    let command = env.command(
        "My Game",
        &[
            ("MyGame/", b""),
            ("MyGame/index.html", INDEX_HTML),
            ("MyGame/Build/", b""),
            ("MyGame/Build/app.wasm", WASM),
        ],
    );

    let game = env.publisher.publish(command).await.unwrap();

    let build_dir = env.layout.resolve_public(&game.game_folder_url).unwrap();
    assert_eq!(list_files(&build_dir), vec!["Build/app.wasm", "index.html"]);
    assert!(!build_dir.join("MyGame").exists());
    assert_eq!(std::fs::read(build_dir.join("index.html")).unwrap(), INDEX_HTML);
    assert_eq!(game.metadata["detectedFolder"], "MyGame");
}

#[tokio::test]
async fn test_wrapper_detected_without_directory_entries() {
    let env = TestEnv::new().await;
    let command = env.command(
        "Bare Entries",
        &[("Game/index.html", INDEX_HTML), ("Game/data/level1.json", b"{}")],
    );

    let game = env.publisher.publish(command).await.unwrap();

    let build_dir = env.layout.resolve_public(&game.game_folder_url).unwrap();
    assert_eq!(list_files(&build_dir), vec!["data/level1.json", "index.html"]);
}

#[tokio::test]
async fn test_each_attempt_gets_its_own_build_directory() {
    let env = TestEnv::new().await;
    let archive: &[(&str, &[u8])] = &[("index.html", INDEX_HTML)];

    let first = env.publisher.publish(env.command("Same Game", archive)).await.unwrap();
    let second = env.publisher.publish(env.command("Same Game", archive)).await.unwrap();

    assert_ne!(first.game_folder_url, second.game_folder_url);
    assert_ne!(first.metadata["buildToken"], second.metadata["buildToken"]);
    assert_eq!(env.build_dirs().len(), 2);
    assert_eq!(env.thumbnails().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishes_get_distinct_tokens() {
    const ATTEMPTS: usize = 1000;

    let env = TestEnv::new().await;
    let archive: &[(&str, &[u8])] = &[("index.html", INDEX_HTML)];

    let tasks = (0..ATTEMPTS).map(|i| {
        let command = env.command(&format!("Game {}", i), archive);
        commands::publish::handle(env.publisher.clone(), command)
    });
    let results = futures::future::join_all(tasks).await;

    let mut tokens = HashSet::new();
    let mut folders = HashSet::new();
    for result in results {
        let game = result.unwrap();
        tokens.insert(game.metadata["buildToken"].as_str().unwrap().to_string());
        folders.insert(game.game_folder_url);
    }

    assert_eq!(tokens.len(), ATTEMPTS);
    assert_eq!(folders.len(), ATTEMPTS);
    assert_eq!(env.build_dirs().len(), ATTEMPTS);
    assert_eq!(env.catalog.len().await, ATTEMPTS);
    assert!(env.staged().is_empty());
}

// ============================================================================
// Failed Publishes Leave Nothing Behind
// ============================================================================

#[tokio::test]
async fn test_wrapper_without_entry_point_is_rejected() {
    let env = TestEnv::new().await;
    let command = env.command("No Entry", &[("X/", b""), ("X/game.js", b"run()")]);

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::Ingest(IngestError::StructureInvalid(_))));
    assert_eq!(err.code(), "STRUCTURE_INVALID");
    env.assert_no_artifacts();
    assert!(env.catalog.is_empty().await);
}

#[tokio::test]
async fn test_multiple_top_level_entries_without_entry_point_are_rejected() {
    let env = TestEnv::new().await;
    let command = env.command("Loose Files", &[("a/index.html", INDEX_HTML), ("b.js", b"run()")]);

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::Ingest(IngestError::StructureInvalid(_))));
    env.assert_no_artifacts();
}

#[tokio::test]
async fn test_path_escape_is_rejected() {
    let env = TestEnv::new().await;
    let command = env.command(
        "Escape",
        &[("index.html", INDEX_HTML), ("../../escaped.txt", b"owned")],
    );

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::Ingest(IngestError::ArchiveCorrupt(_))));
    env.assert_no_artifacts();
    assert!(!env.layout.public_root().join("escaped.txt").exists());
    assert!(!env.layout.public_root().parent().unwrap().join("escaped.txt").exists());
}

#[tokio::test]
async fn test_corrupt_archive_is_rejected() {
    let env = TestEnv::new().await;
    let mut command = env.command("Corrupt", &[("index.html", INDEX_HTML)]);
    let garbage = b"PK\x03\x04 definitely not a zip";
    std::fs::write(&command.archive.path, garbage).unwrap();
    command.archive.size = garbage.len() as u64;

    let err = env.publisher.publish(command).await.unwrap_err();

    assert_eq!(err.code(), "ARCHIVE_CORRUPT");
    env.assert_no_artifacts();
}

#[tokio::test]
async fn test_catalog_failure_rolls_back_files() {
    let env = TestEnv::new().await;
    env.catalog.fail_inserts(true);
    let command = env.command("Doomed", &[("index.html", INDEX_HTML)]);

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::Ingest(IngestError::CatalogPersist(_))));
    env.assert_no_artifacts();
    assert!(env.catalog.is_empty().await);
}

#[tokio::test]
async fn test_validation_failure_consumes_staged_files() {
    let env = TestEnv::new().await;
    let command = env.command("   ", &[("index.html", INDEX_HTML)]);

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::TitleRequired));
    env.assert_no_artifacts();
}

#[tokio::test]
async fn test_oversized_archive_is_rejected() {
    let env = TestEnv::with_options(IngestOptions {
        max_archive_bytes: 16,
        ..IngestOptions::default()
    })
    .await;
    let command = env.command("Huge", &[("index.html", INDEX_HTML)]);

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::ArchiveTooLarge { max: 16, .. }));
    env.assert_no_artifacts();
}

#[tokio::test]
async fn test_missing_staged_file_is_reported() {
    let env = TestEnv::new().await;
    let command = env.command("Vanished", &[("index.html", INDEX_HTML)]);
    std::fs::remove_file(&command.archive.path).unwrap();

    let err = env.publisher.publish(command).await.unwrap_err();

    assert!(matches!(err, PublishGameError::StagedFileMissing(_)));
    env.assert_no_artifacts();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_publishes_leave_no_orphans() {
    let env = TestEnv::new().await;
    let archive: &[(&str, &[u8])] = &[("index.html", INDEX_HTML), ("Build/app.wasm", WASM)];

    for delay_ms in [0u64, 1, 2, 5, 10, 20] {
        let command = env.command("Cancelled", archive);
        let _ = tokio::time::timeout(Duration::from_millis(delay_ms), env.publisher.publish(command)).await;
    }

    // blocking extraction jobs may still be finishing their rollback
    let mut settled = false;
    for _ in 0..250 {
        let published = env.catalog.len().await;
        if env.staged().is_empty()
            && env.build_dirs().len() == published
            && env.thumbnails().len() == published
        {
            settled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(
        settled,
        "orphans left: builds={:?} thumbnails={:?} staged={:?}",
        env.build_dirs(),
        env.thumbnails(),
        env.staged()
    );
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn test_delete_retires_published_files() {
    let env = TestEnv::new().await;
    let game = env
        .publisher
        .publish(env.command("Short Lived", &[("index.html", INDEX_HTML)]))
        .await
        .unwrap();

    let response = commands::delete::handle(
        env.catalog.as_ref(),
        &env.layout,
        DeleteGameCommand { id: game.id },
    )
    .await
    .unwrap();

    assert!(response.deleted);
    assert!(env.build_dirs().is_empty());
    assert!(env.thumbnails().is_empty());

    let record = env.catalog.find(game.id).await.unwrap().unwrap();
    assert!(!record.is_active());
}

#[tokio::test]
async fn test_delete_tolerates_already_missing_files() {
    let env = TestEnv::new().await;
    let game = env
        .publisher
        .publish(env.command("Half Gone", &[("index.html", INDEX_HTML)]))
        .await
        .unwrap();

    let build_dir = env.layout.resolve_public(&game.game_folder_url).unwrap();
    std::fs::remove_dir_all(build_dir).unwrap();

    let response = commands::delete::handle(
        env.catalog.as_ref(),
        &env.layout,
        DeleteGameCommand { id: game.id },
    )
    .await
    .unwrap();

    assert!(response.deleted);
    assert!(env.thumbnails().is_empty());
}
