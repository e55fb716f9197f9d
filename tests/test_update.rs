//! Update pipeline tests against fake sources.
//!
//! The `UpdateSource` seam lets these tests drive the swap-on-success and
//! preserve-on-failure protocol without touching the network.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;
use taxotype::error::UpdateStage;
use taxotype::update::{UpdateContext, UpdateSource};
use taxotype::{Error, SharedRegistry, TaxonRegistry, Updater};

/// Source returning a fixed name list, with some coarse progress.
struct FakeSource {
    names: Vec<String>,
}

impl FakeSource {
    fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl UpdateSource for FakeSource {
    fn fetch(&self, ctx: &UpdateContext) -> taxotype::Result<Vec<String>> {
        ctx.report(10);
        ctx.check_cancelled()?;
        ctx.report(90);
        Ok(self.names.clone())
    }
}

/// Source that fails partway, as a malformed dataset would.
struct FailingSource;

impl UpdateSource for FailingSource {
    fn fetch(&self, _ctx: &UpdateContext) -> taxotype::Result<Vec<String>> {
        Err(Error::Update {
            stage: UpdateStage::Parse,
            reason: "malformed names table".to_string(),
        })
    }
}

/// Source that signals when fetch starts and blocks until released, so a
/// test can observe the advisory lock being held.
struct GatedSource {
    started: Sender<()>,
    release: Mutex<Receiver<()>>,
}

impl UpdateSource for GatedSource {
    fn fetch(&self, _ctx: &UpdateContext) -> taxotype::Result<Vec<String>> {
        self.started.send(()).expect("test listening");
        self.release
            .lock()
            .unwrap()
            .recv()
            .expect("test releases");
        Ok(vec!["Vibrio cholerae".to_string()])
    }
}

fn updater_in_tempdir() -> (Updater, SharedRegistry, tempfile::TempDir) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let registry = SharedRegistry::default();
    let updater = Updater::new(registry.clone(), dir.path().join("taxon_list.txt"));
    (updater, registry, dir)
}

#[test]
fn test_successful_update_swaps_and_persists() {
    let (updater, registry, dir) = updater_in_tempdir();
    let outcome = updater
        .run(&FakeSource::new(&["Vibrio cholerae", "Aquaspirillum"]))
        .unwrap();

    // Seed genera plus the two new ones.
    assert_eq!(outcome.genera, 7);
    assert_eq!(outcome.binomials, 1);

    let snapshot = registry.snapshot();
    assert!(snapshot.contains_genus("Aquaspirillum"));
    assert!(snapshot.contains_binomial("Vibrio cholerae"));

    let persisted = std::fs::read_to_string(dir.path().join("taxon_list.txt")).unwrap();
    assert!(persisted.lines().any(|l| l == "Vibrio cholerae"));
    assert!(persisted.lines().any(|l| l == "Aquaspirillum"));
}

#[test]
fn test_reload_after_update_round_trips() {
    let (updater, _registry, dir) = updater_in_tempdir();
    updater.run(&FakeSource::new(&["Vibrio cholerae"])).unwrap();

    let reloaded = TaxonRegistry::load_from(&dir.path().join("taxon_list.txt"));
    assert!(reloaded.contains_binomial("Vibrio cholerae"));
}

#[test]
fn test_failed_update_preserves_registry_and_file() {
    let (updater, registry, dir) = updater_in_tempdir();
    let list_path = dir.path().join("taxon_list.txt");

    // Establish prior state: one successful update.
    updater.run(&FakeSource::new(&["Bacillus subtilis"])).unwrap();
    let before_file = std::fs::read(&list_path).unwrap();
    let before = registry.snapshot();

    let err = updater.run(&FailingSource).unwrap_err();
    assert!(matches!(
        err,
        Error::Update {
            stage: UpdateStage::Parse,
            ..
        }
    ));
    assert!(err.to_string().contains("malformed names table"));

    // Prior in-memory sets are byte-identical to their pre-update values.
    let after = registry.snapshot();
    assert_eq!(before.genus_count(), after.genus_count());
    assert_eq!(before.binomial_count(), after.binomial_count());
    assert!(after.contains_binomial("Bacillus subtilis"));

    // Persisted file untouched.
    assert_eq!(std::fs::read(&list_path).unwrap(), before_file);
}

#[test]
fn test_cancelled_update_preserves_state() {
    let (updater, registry, dir) = updater_in_tempdir();
    let list_path = dir.path().join("taxon_list.txt");
    updater.run(&FakeSource::new(&["Bacillus subtilis"])).unwrap();
    let before_file = std::fs::read(&list_path).unwrap();

    let handle = updater.spawn(FakeSource::new(&["Vibrio cholerae"]));
    handle.cancel();
    match handle.join() {
        // Cancellation raced the (fast) fake fetch; either outcome is
        // legitimate, but a cancelled run must leave prior state alone.
        Err(Error::UpdateCancelled) => {
            assert!(!registry.snapshot().contains_binomial("Vibrio cholerae"));
            assert_eq!(std::fs::read(&list_path).unwrap(), before_file);
        },
        Ok(_) => {
            assert!(registry.snapshot().contains_binomial("Vibrio cholerae"));
        },
        Err(other) => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_concurrent_update_rejected() {
    let (updater, registry, _dir) = updater_in_tempdir();

    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel();
    let handle = updater.spawn(GatedSource {
        started: started_tx,
        release: Mutex::new(release_rx),
    });

    // First update holds the advisory lock inside fetch.
    started_rx.recv().unwrap();
    let err = updater.run(&FakeSource::new(&["Aquaspirillum"])).unwrap_err();
    assert!(matches!(err, Error::UpdateInProgress));

    release_tx.send(()).unwrap();
    let outcome = handle.join().unwrap();
    assert_eq!(outcome.binomials, 1);
    assert!(registry.snapshot().contains_binomial("Vibrio cholerae"));
}

#[test]
fn test_background_progress_reaches_completion() {
    let (updater, _registry, _dir) = updater_in_tempdir();
    let handle = updater.spawn(FakeSource::new(&["Vibrio cholerae"]));

    let mut reports = Vec::new();
    for percent in handle.progress() {
        reports.push(percent);
    }
    let outcome = handle.join().unwrap();
    assert_eq!(outcome.binomials, 1);

    assert_eq!(reports.last(), Some(&100));
    assert!(reports.windows(2).all(|w| w[0] <= w[1]));
}
