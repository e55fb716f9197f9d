//! Taxonomy update pipeline.
//!
//! An [`UpdateSource`] produces a flat list of validated taxon names; the
//! [`Updater`] persists the list atomically and swaps the shared registry to
//! a fully built replacement. On any failure the previous in-memory sets and
//! the persisted file are untouched.
//!
//! [`NcbiTaxdumpSource`] is the production source: it downloads the NCBI
//! new_taxdump archive over HTTPS with bounded retries, reads `nodes.dmp`
//! and `names.dmp` straight out of the zip, and keeps scientific names whose
//! rank is genus, species, or strain. Download scratch space lives in a
//! temp directory that is removed when the fetch ends, success or not.
//!
//! Updates run at most one at a time (an advisory lock rejects a concurrent
//! attempt) and can be cancelled mid-flight, leaving prior state untouched.
//! [`Updater::spawn`] runs the pipeline on a background thread and hands the
//! caller a progress receiver; how progress is surfaced is the caller's
//! business.

use crate::error::{Error, Result, UpdateStage};
use crate::registry::{is_valid_taxon_name, SharedRegistry, TaxonRegistry};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Taxonomic ranks whose scientific names are kept.
const TARGET_RANKS: &[&str] = &["genus", "species", "strain"];

/// Cooperative cancellation flag for an in-flight update.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The update aborts at its next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress and cancellation plumbing handed to an [`UpdateSource`].
///
/// Progress is coarse (whole percent) and throttled: repeated reports of the
/// same value are dropped, so a byte-loop can report freely.
pub struct UpdateContext {
    cancel: CancelToken,
    progress: Option<mpsc::Sender<u8>>,
    last_percent: AtomicU8,
}

impl UpdateContext {
    /// Context that discards progress and never cancels.
    pub fn null() -> Self {
        Self {
            cancel: CancelToken::new(),
            progress: None,
            last_percent: AtomicU8::new(0),
        }
    }

    /// Context wired to a progress channel and a cancel token.
    pub fn new(cancel: CancelToken, progress: mpsc::Sender<u8>) -> Self {
        Self {
            cancel,
            progress: Some(progress),
            last_percent: AtomicU8::new(0),
        }
    }

    /// Report coarse progress. Duplicate percentages are dropped; a
    /// disconnected receiver is ignored.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        if self.last_percent.swap(percent, Ordering::Relaxed) == percent {
            return;
        }
        if let Some(tx) = &self.progress {
            let _ = tx.send(percent);
        }
    }

    /// Fail with [`Error::UpdateCancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::UpdateCancelled)
        } else {
            Ok(())
        }
    }
}

/// Produces the flat validated name list consumed by the [`Updater`].
///
/// The seam exists so tests can drive the swap/failure paths with a fake
/// source instead of the network.
pub trait UpdateSource: Send {
    /// Fetch a replacement name list, reporting progress and honoring
    /// cancellation via `ctx`.
    fn fetch(&self, ctx: &UpdateContext) -> Result<Vec<String>>;
}

/// Summary of a completed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Genera in the new registry
    pub genera: usize,
    /// Binomials in the new registry
    pub binomials: usize,
}

fn update_err(stage: UpdateStage, reason: impl std::fmt::Display) -> Error {
    Error::Update {
        stage,
        reason: reason.to_string(),
    }
}

/// Downloads and parses the NCBI new_taxdump archive.
#[derive(Debug, Clone)]
pub struct NcbiTaxdumpSource {
    url: String,
    attempts: u32,
    backoff: Duration,
    timeout: Duration,
}

impl Default for NcbiTaxdumpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NcbiTaxdumpSource {
    /// Source pointing at the public NCBI FTP mirror, with 3 download
    /// attempts at a fixed 3 s backoff.
    pub fn new() -> Self {
        Self {
            url: "https://ftp.ncbi.nlm.nih.gov/pub/taxonomy/new_taxdump/new_taxdump.zip"
                .to_string(),
            attempts: 3,
            backoff: Duration::from_secs(3),
            timeout: Duration::from_secs(180),
        }
    }

    /// Override the archive URL (mirrors, tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Override the retry count.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Download the archive to `dest`, streaming with progress in 10..=40.
    fn download(&self, ctx: &UpdateContext, dest: &std::path::Path) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| update_err(UpdateStage::Download, e))?;

        let mut last_err = None;
        for attempt in 0..self.attempts {
            ctx.check_cancelled()?;
            if attempt > 0 {
                log::debug!("Retrying taxonomy download (attempt {})", attempt + 1);
                std::thread::sleep(self.backoff);
            }
            match client.get(&self.url).send().and_then(|r| r.error_for_status()) {
                Ok(response) => return self.stream_to_file(ctx, response, dest),
                Err(e) => last_err = Some(e),
            }
        }
        Err(update_err(
            UpdateStage::Download,
            last_err.map(|e| e.to_string()).unwrap_or_else(|| "no attempts made".into()),
        ))
    }

    fn stream_to_file(
        &self,
        ctx: &UpdateContext,
        mut response: reqwest::blocking::Response,
        dest: &std::path::Path,
    ) -> Result<()> {
        let total = response.content_length().unwrap_or(0);
        let mut file = std::fs::File::create(dest)?;
        let mut buf = [0u8; 8192];
        let mut downloaded: u64 = 0;
        loop {
            ctx.check_cancelled()?;
            let n = response
                .read(&mut buf)
                .map_err(|e| update_err(UpdateStage::Download, e))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            downloaded += n as u64;
            if total > 0 {
                ctx.report(10 + ((downloaded * 30) / total).min(30) as u8);
            }
        }
        file.flush()?;
        Ok(())
    }

    /// Read a named member of the zip archive into a string.
    fn read_member(archive_path: &std::path::Path, name: &str) -> Result<String> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| update_err(UpdateStage::Extract, e))?;
        let mut member = archive
            .by_name(name)
            .map_err(|e| update_err(UpdateStage::Extract, format!("{}: {}", name, e)))?;
        // .dmp files are ASCII with occasional stray bytes; read lossily.
        let mut bytes = Vec::new();
        member
            .read_to_end(&mut bytes)
            .map_err(|e| update_err(UpdateStage::Extract, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Collect tax ids whose rank is genus, species, or strain.
    fn parse_target_ids(nodes: &str) -> HashSet<String> {
        let mut ids = HashSet::new();
        for line in nodes.lines() {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() > 2 && TARGET_RANKS.contains(&parts[2].to_lowercase().as_str()) {
                ids.insert(parts[0].to_string());
            }
        }
        ids
    }

    /// Collect validated scientific names for the selected ids.
    fn parse_names(names: &str, ids: &HashSet<String>) -> Vec<String> {
        let mut out = Vec::new();
        for line in names.lines() {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if parts.len() > 3
                && parts[3].eq_ignore_ascii_case("scientific name")
                && ids.contains(parts[0])
                && is_valid_taxon_name(parts[1])
            {
                out.push(parts[1].to_string());
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl UpdateSource for NcbiTaxdumpSource {
    fn fetch(&self, ctx: &UpdateContext) -> Result<Vec<String>> {
        // Scratch dir is removed on drop, on every exit path.
        let scratch = tempfile::tempdir()?;
        let archive_path = scratch.path().join("new_taxdump.zip");

        ctx.report(5);
        self.download(ctx, &archive_path)?;

        ctx.report(45);
        ctx.check_cancelled()?;
        let nodes = Self::read_member(&archive_path, "nodes.dmp")?;
        let ids = Self::parse_target_ids(&nodes);
        if ids.is_empty() {
            return Err(update_err(
                UpdateStage::Parse,
                "nodes.dmp contained no genus/species/strain records",
            ));
        }

        ctx.report(60);
        ctx.check_cancelled()?;
        let names = Self::read_member(&archive_path, "names.dmp")?;
        let list = Self::parse_names(&names, &ids);
        if list.is_empty() {
            return Err(update_err(
                UpdateStage::Parse,
                "names.dmp yielded no valid taxon names",
            ));
        }

        ctx.report(90);
        log::info!("Fetched {} taxon names from {}", list.len(), self.url);
        Ok(list)
    }
}

/// Running handle to a background update.
pub struct UpdateHandle {
    thread: JoinHandle<Result<UpdateOutcome>>,
    progress: mpsc::Receiver<u8>,
    cancel: CancelToken,
}

impl UpdateHandle {
    /// Progress receiver (coarse percentages, throttled).
    pub fn progress(&self) -> &mpsc::Receiver<u8> {
        &self.progress
    }

    /// Request cancellation of the running update.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the update to finish and return its outcome.
    pub fn join(self) -> Result<UpdateOutcome> {
        match self.thread.join() {
            Ok(result) => result,
            Err(_) => Err(update_err(UpdateStage::Parse, "update thread panicked")),
        }
    }
}

/// Owns the swap-on-success update protocol for a [`SharedRegistry`].
///
/// Sole writer to the registry and its persisted list file. Clones share the
/// advisory lock, so a second concurrent [`run`](Self::run) is rejected with
/// [`Error::UpdateInProgress`] instead of racing.
#[derive(Debug, Clone)]
pub struct Updater {
    registry: SharedRegistry,
    list_path: PathBuf,
    in_flight: Arc<Mutex<()>>,
}

impl Updater {
    /// Create an updater writing the persisted list to `list_path`.
    pub fn new(registry: SharedRegistry, list_path: PathBuf) -> Self {
        Self {
            registry,
            list_path,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Run an update to completion on the current thread.
    pub fn run(&self, source: &dyn UpdateSource) -> Result<UpdateOutcome> {
        self.run_with(source, &UpdateContext::null())
    }

    /// Run an update with explicit progress/cancellation plumbing.
    ///
    /// On success the new list is persisted atomically (temp file + rename)
    /// and the registry swaps to the fully built replacement. On any failure
    /// prior in-memory sets and the persisted file are unchanged.
    pub fn run_with(&self, source: &dyn UpdateSource, ctx: &UpdateContext) -> Result<UpdateOutcome> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(Error::UpdateInProgress),
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };

        let names = source.fetch(ctx)?;
        ctx.check_cancelled()?;
        let replacement = TaxonRegistry::from_names(&names);

        self.persist(&names)?;
        self.registry.replace(replacement);
        ctx.report(100);

        let snapshot = self.registry.snapshot();
        let outcome = UpdateOutcome {
            genera: snapshot.genus_count(),
            binomials: snapshot.binomial_count(),
        };
        log::info!(
            "Taxonomy updated: {} genera, {} binomials",
            outcome.genera,
            outcome.binomials
        );
        Ok(outcome)
    }

    /// Run the update on a background thread.
    ///
    /// Returns a handle carrying the progress receiver and a cancel token;
    /// the caller decides how to surface progress.
    pub fn spawn<S: UpdateSource + 'static>(&self, source: S) -> UpdateHandle {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let ctx = UpdateContext::new(cancel.clone(), tx);
        let updater = self.clone();
        let thread = std::thread::spawn(move || updater.run_with(&source, &ctx));
        UpdateHandle {
            thread,
            progress: rx,
            cancel,
        }
    }

    /// Atomically replace the persisted list file.
    fn persist(&self, names: &[String]) -> Result<()> {
        let parent = self
            .list_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent)
            .map_err(|e| update_err(UpdateStage::Persist, e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| update_err(UpdateStage::Persist, e))?;
        for name in names {
            writeln!(tmp, "{}", name).map_err(|e| update_err(UpdateStage::Persist, e))?;
        }
        // Rename over the old file only once the replacement is complete.
        tmp.persist(&self.list_path)
            .map_err(|e| update_err(UpdateStage::Persist, e))?;
        Ok(())
    }
}
