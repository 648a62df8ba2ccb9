//! The six-phase orchestrator.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use derive_builder::Builder;
use rayon::prelude::*;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use imagededup_analyze::{CandidateSelector, ProcessedSet, Ranker};
use imagededup_core::{
    Action, ConfigError, DedupConfig, FileRecord, SignatureStore, non_overlapping_roots,
};
use imagededup_ops::{ActionExecutor, EmptyFolderReclaimer};
use imagededup_scan::{DirectoryFileCount, FileWalker, Phase, ProgressObserver, SilentObserver};

use crate::error::PipelineError;
use crate::result::RunResult;

/// Which optional phases to run. Counting always runs.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct RunOptions {
    pub cleanup: bool,
    pub analyze: bool,
    pub discover: bool,
    pub act: bool,
    /// Also requires `remove_empty_folders` in the configuration.
    pub reclaim: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            cleanup: true,
            analyze: true,
            discover: true,
            act: true,
            reclaim: true,
        }
    }
}

impl RunOptions {
    pub fn builder() -> RunOptionsBuilder {
        RunOptionsBuilder::default()
    }
}

/// Tallies from an analysis phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzeReport {
    pub files: u64,
    pub stored: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Default)]
struct AnalyzeTally {
    stored: AtomicU64,
    unchanged: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

/// Output of the count phase.
struct Counted {
    /// Sizes the progress totals of later phases.
    counts: DirectoryFileCount,
    /// `(root, file)` pairs in walk order.
    files: Vec<(PathBuf, PathBuf)>,
}

impl Counted {
    fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|(_, f)| f.clone()).collect()
    }
}

/// Per-run mutable state. Created fresh for every run.
struct RunState {
    result: RunResult,
    processed: ProcessedSet,
}

/// Drives the batch pipeline over the configured roots.
pub struct Pipeline {
    config: Arc<DedupConfig>,
    roots: Vec<PathBuf>,
    store: Arc<dyn SignatureStore>,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
    walker: FileWalker,
    ranker: Ranker,
    selector: CandidateSelector,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("roots", &self.roots)
            .field("dry_run", &self.config.dry_run)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Validate `config` and prepare a pipeline over its roots.
    ///
    /// Roots are canonicalized and nested roots dropped.
    pub fn new(config: DedupConfig, store: Arc<dyn SignatureStore>) -> Result<Self, PipelineError> {
        config.validate()?;

        let mut canonical = Vec::with_capacity(config.roots.len());
        for root in &config.roots {
            let path = root.canonicalize().map_err(|_| ConfigError::MissingRoot {
                path: root.clone(),
            })?;
            canonical.push(path);
        }
        let roots = non_overlapping_roots(&canonical);

        let walker = FileWalker::from_config(&config)?;
        let ranker = Ranker::new(&config.prioritization_rules);
        let selector = CandidateSelector::new(config.max_mod_time_delta);

        Ok(Self {
            config: Arc::new(config),
            roots,
            store,
            observer: Arc::new(SilentObserver),
            cancel: CancellationToken::new(),
            walker,
            ranker,
            selector,
        })
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop at the next phase boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Canonical, non-overlapping roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn store(&self) -> &Arc<dyn SignatureStore> {
        &self.store
    }

    /// Run all six phases.
    pub fn run(&self, options: &RunOptions) -> Result<RunResult, PipelineError> {
        if self.config.dry_run {
            warn!("DRY RUN: no files or folders will be changed");
        }

        self.checkpoint(Phase::Cleanup)?;
        if options.cleanup {
            self.cleanup()?;
        } else {
            self.observer.phase_skipped(Phase::Cleanup);
        }

        self.checkpoint(Phase::Count)?;
        let counted = self.count(&self.roots);

        self.checkpoint(Phase::Analyze)?;
        if options.analyze {
            self.analyze_files(&counted.paths(), counted.counts.total())?;
        } else {
            self.observer.phase_skipped(Phase::Analyze);
        }

        let mut state = RunState {
            result: RunResult::new(self.config.dry_run),
            processed: ProcessedSet::new(),
        };

        self.checkpoint(Phase::Discover)?;
        if options.discover {
            self.discover(&counted.files, counted.counts.total(), &mut state)?;
        } else {
            self.observer.phase_skipped(Phase::Discover);
        }

        self.checkpoint(Phase::Act)?;
        if options.act {
            self.act(&mut state.result);
        } else {
            self.observer.phase_skipped(Phase::Act);
        }

        self.checkpoint(Phase::Reclaim)?;
        if options.reclaim && self.config.remove_empty_folders {
            self.reclaim(&self.roots, &mut state.result);
        } else {
            self.observer.phase_skipped(Phase::Reclaim);
        }

        Ok(state.result)
    }

    /// Count and analyze only, filling the store without resolving groups.
    pub fn analyze(&self) -> Result<AnalyzeReport, PipelineError> {
        self.checkpoint(Phase::Count)?;
        let counted = self.count(&self.roots);

        self.checkpoint(Phase::Analyze)?;
        self.analyze_files(&counted.paths(), counted.counts.total())
    }

    /// Analyze, discover and act on the files below `dir` only.
    ///
    /// Candidates are still searched across the root containing `dir` (or
    /// all roots, if configured), so copies elsewhere in that root resolve
    /// too. A file path is treated as its parent directory; a directory
    /// that no longer exists yields an empty result.
    pub fn process_directory(&self, dir: &Path) -> Result<RunResult, PipelineError> {
        let dir = if dir.is_file() {
            dir.parent().unwrap_or(dir)
        } else {
            dir
        };
        let root = self
            .root_of(dir)
            .ok_or_else(|| PipelineError::OutsideRoots {
                path: dir.to_path_buf(),
            })?
            .to_path_buf();

        let mut state = RunState {
            result: RunResult::new(self.config.dry_run),
            processed: ProcessedSet::new(),
        };
        if !dir.is_dir() {
            debug!("{} is gone, nothing to process", dir.display());
            return Ok(state.result);
        }

        self.checkpoint(Phase::Count)?;
        let counted = self.count(&[dir.to_path_buf()]);
        let total = counted.counts.total();

        self.checkpoint(Phase::Analyze)?;
        self.analyze_files(&counted.paths(), total)?;

        self.checkpoint(Phase::Discover)?;
        let scoped: Vec<(PathBuf, PathBuf)> = counted
            .files
            .into_iter()
            .map(|(_, f)| (root.clone(), f))
            .collect();
        self.discover(&scoped, total, &mut state)?;

        self.checkpoint(Phase::Act)?;
        self.act(&mut state.result);

        self.checkpoint(Phase::Reclaim)?;
        if self.config.remove_empty_folders {
            self.reclaim(std::slice::from_ref(&root), &mut state.result);
        } else {
            self.observer.phase_skipped(Phase::Reclaim);
        }

        Ok(state.result)
    }

    /// Drop store records for `path`, or for everything below it when it
    /// named a directory.
    pub fn forget(&self, path: &Path) -> Result<(), PipelineError> {
        self.store.remove(path)?;
        let (_, records) = self.store.get_all()?;
        for record in records.filter(|r| r.is_under(path)) {
            self.store.remove(&record.path)?;
        }
        debug!("Forgot {}", path.display());
        Ok(())
    }

    fn checkpoint(&self, next: Phase) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            info!("Cancelled before {}", next);
            return Err(PipelineError::Cancelled { phase: next });
        }
        Ok(())
    }

    fn root_of(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .find(|root| path.starts_with(root))
            .map(PathBuf::as_path)
    }

    /// Phase 1: remove outdated records, records outside every root and
    /// records of missing files.
    fn cleanup(&self) -> Result<u64, PipelineError> {
        let (count, records) = self.store.get_all()?;
        self.observer.phase_started(Phase::Cleanup, count as u64);

        let mut removed = 0u64;
        for record in records {
            self.observer.tick(Phase::Cleanup, &record.path);

            if !record.metadata.is_current_version() {
                info!(
                    "Removing record with old data model version: {}",
                    record.path.display()
                );
                self.store.remove(&record.path)?;
                removed += 1;
                continue;
            }

            if !self.roots.iter().any(|root| record.is_under(root)) {
                info!("Removing record outside all roots: {}", record.path.display());
                self.store.remove(&record.path)?;
                removed += 1;
                continue;
            }

            if !record.path.exists() {
                info!("Removing record of missing file: {}", record.path.display());
                self.store.remove(&record.path)?;
                removed += 1;
            }
        }

        self.observer.phase_finished(Phase::Cleanup);
        info!("Cleanup removed {} of {} records", removed, count);
        Ok(removed)
    }

    /// Phase 2: list and count candidate files below each of `dirs`.
    ///
    /// Best effort: a directory that cannot be walked counts as zero.
    fn count(&self, dirs: &[PathBuf]) -> Counted {
        self.observer.phase_started(Phase::Count, dirs.len() as u64);

        let mut counts = DirectoryFileCount::default();
        let mut files = Vec::new();
        for dir in dirs {
            match self.walker.walk(dir) {
                Ok(found) => {
                    info!("{} candidate files in {}", found.len(), dir.display());
                    counts.insert(dir.clone(), found.len() as u64);
                    files.extend(found.into_iter().map(|f| (dir.clone(), f)));
                }
                Err(e) => {
                    warn!("Could not walk {}: {}", dir.display(), e);
                    counts.insert(dir.clone(), 0);
                }
            }
            self.observer.tick(Phase::Count, dir);
        }

        self.observer.phase_finished(Phase::Count);
        Counted { counts, files }
    }

    /// Phase 3: add every file to the store on a pool scoped to this call.
    ///
    /// `total` sizes progress reporting only.
    fn analyze_files(
        &self,
        files: &[PathBuf],
        total: u64,
    ) -> Result<AnalyzeReport, PipelineError> {
        let threads = self.config.resolved_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("imagededup-analyze-{i}"))
            .build()
            .map_err(|e| PipelineError::Pool {
                message: e.to_string(),
            })?;

        self.observer.phase_started(Phase::Analyze, total);
        let tally = AnalyzeTally::default();

        pool.install(|| {
            files.par_iter().try_for_each(|path| {
                catch_unwind(AssertUnwindSafe(|| self.analyze_file(path, &tally))).map_err(
                    |payload| PipelineError::WorkerPanicked {
                        phase: Phase::Analyze,
                        message: panic_message(payload.as_ref()),
                    },
                )
            })
        })?;

        self.observer.phase_finished(Phase::Analyze);

        let report = AnalyzeReport {
            files: files.len() as u64,
            stored: tally.stored.into_inner(),
            unchanged: tally.unchanged.into_inner(),
            skipped: tally.skipped.into_inner(),
            failed: tally.failed.into_inner(),
        };
        info!(
            "Analyzed {} files: {} stored, {} unchanged, {} skipped, {} failed",
            report.files, report.stored, report.unchanged, report.skipped, report.failed
        );
        Ok(report)
    }

    fn analyze_file(&self, path: &Path, tally: &AnalyzeTally) {
        let counter = if !path.exists() {
            debug!("{} vanished before analysis", path.display());
            &tally.skipped
        } else {
            match self.store.add(path) {
                Ok(true) => &tally.stored,
                Ok(false) => &tally.unchanged,
                Err(e) if e.is_not_found() => {
                    debug!("{} vanished during analysis", path.display());
                    &tally.skipped
                }
                Err(e) => {
                    error!("Error analyzing {}: {}", path.display(), e);
                    &tally.failed
                }
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.observer.tick(Phase::Analyze, path);
    }

    /// Phase 4: resolve duplicate groups in walk order, single-threaded.
    ///
    /// `files` pairs each reference file with the root that scopes its
    /// candidates when searching across roots is disabled.
    fn discover(
        &self,
        files: &[(PathBuf, PathBuf)],
        total: u64,
        state: &mut RunState,
    ) -> Result<(), PipelineError> {
        self.observer.phase_started(Phase::Discover, total);

        for (root, file) in files {
            self.observer.tick(Phase::Discover, file);
            if state.processed.contains(file) {
                continue;
            }
            self.resolve(root, file, state)?;
        }

        self.observer.phase_finished(Phase::Discover);
        info!(
            "Found {} duplicate groups",
            state.result.summary().groups_with_duplicates
        );
        Ok(())
    }

    fn resolve(&self, root: &Path, file: &Path, state: &mut RunState) -> Result<(), PipelineError> {
        let Some(candidates) = self.similar_in_scope(root, file) else {
            state.processed.insert(file);
            return Ok(());
        };

        if candidates.is_empty() {
            warn!(
                "No candidates found for {}; it has probably not been analyzed yet",
                file.display()
            );
        }
        if candidates.len() <= 1 {
            for candidate in &candidates {
                if candidate.path != file {
                    warn!(
                        "Unexpected unique candidate {} for {}",
                        candidate.path.display(),
                        file.display()
                    );
                }
                state.processed.insert(candidate.path.clone());
            }
            state.processed.insert(file);
            return Ok(());
        }

        // The reference itself may not be the best copy; search again from
        // the best ranked candidate.
        let ranked = self.ranker.rank(candidates)?;
        let best = ranked[0].path.clone();
        state.processed.insert(file);

        let Some(group) = self.similar_in_scope(root, &best) else {
            return Ok(());
        };
        if group.is_empty() {
            return Ok(());
        }

        let ranked = self.ranker.rank(group)?;
        let selection = self.selector.select(ranked, &mut state.processed)?;

        for record in &selection.keep {
            state
                .result
                .set_action(&record.path, Action::None)?;
        }
        let removal = self.config.removal_action();
        for record in &selection.remove {
            state.result.set_action(&record.path, removal)?;
        }

        debug!(
            "Keeping {} over {} duplicate(s)",
            selection.kept().path.display(),
            selection.remove.len()
        );

        let mut records = selection.keep.into_iter();
        if let Some(kept) = records.next() {
            let members = records.chain(selection.remove).collect();
            state.result.add_group(kept, members);
        }
        Ok(())
    }

    /// Similar records limited to `root` (or to any root), one per path.
    ///
    /// Store failures are logged and yield `None`.
    fn similar_in_scope(&self, root: &Path, reference: &Path) -> Option<Vec<FileRecord>> {
        let candidates = match self.store.find_similar(reference) {
            Ok(candidates) => candidates,
            Err(e) if e.is_not_found() => {
                debug!("{} vanished before discovery", reference.display());
                return None;
            }
            Err(e) => {
                error!("Similarity search failed for {}: {}", reference.display(), e);
                return None;
            }
        };

        let mut seen = HashSet::new();
        let scoped = candidates
            .into_iter()
            .filter(|c| {
                if self.config.search_across_roots {
                    self.roots.iter().any(|r| c.is_under(r))
                } else {
                    c.is_under(root)
                }
            })
            .filter(|c| seen.insert(c.path.clone()))
            .collect();
        Some(scoped)
    }

    /// Phase 5: apply removals. Per-file failures are recorded, not fatal.
    fn act(&self, result: &mut RunResult) {
        let executor = ActionExecutor::new(
            Arc::clone(&self.store),
            self.config.dry_run,
            self.config.duplicates_target.clone(),
        );

        let removals: Vec<_> = result
            .removals()
            .map(|(path, action)| (path.clone(), action))
            .collect();
        self.observer
            .phase_started(Phase::Act, removals.len() as u64);

        for (path, action) in removals {
            match executor.execute(&path, action) {
                Ok(outcome) => {
                    result.outcomes.insert(path.clone(), outcome);
                }
                Err(e) => {
                    error!("Failed to {} {}: {}", action, path.display(), e);
                    result.add_failure(&path, e.to_string());
                }
            }
            self.observer.tick(Phase::Act, &path);
        }

        self.observer.phase_finished(Phase::Act);
    }

    /// Phase 6: find, and unless dry run remove, folders this run emptied.
    fn reclaim(&self, roots: &[PathBuf], result: &mut RunResult) {
        self.observer
            .phase_started(Phase::Reclaim, roots.len() as u64);

        let removed: HashSet<PathBuf> = result.removed_paths().into_iter().collect();
        let reclaimer = EmptyFolderReclaimer::new(roots.to_vec());
        let folders = reclaimer.find(&removed);

        if self.config.dry_run {
            for folder in &folders {
                info!("Would remove empty folder {}", folder.display());
            }
            result.reclaimed = folders;
        } else {
            let report = reclaimer.remove(&folders);
            for e in report.errors {
                error!("{}", e);
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                result.add_failure(path, e.to_string());
            }
            result.reclaimed = report.removed;
        }

        for root in roots {
            self.observer.tick(Phase::Reclaim, root);
        }
        self.observer.phase_finished(Phase::Reclaim);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
