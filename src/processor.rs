//! Per-file pipeline: probe, plan, transcode, finalise.

use crate::config::PlanConfig;
use crate::output::{output_path, OutputPaths};
use crate::plan::{build_plan, StreamPlan};
use crate::probe::Probe;
use crate::stream::MediaStreams;
use crate::transcode::{CancelFlag, TranscodeControl, Transcoder};
use crate::{Error, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why a file was left untouched without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file has no audio streams at all.
    NoAudioStreams,
    /// No audio stream is in an accepted language.
    NoAcceptedAudio,
    /// Every kept stream can be copied.
    AlreadyCompliant,
    /// A transcode was planned but dry-run is on.
    DryRun,
    /// `<stem>-ac3.<ext>` is already there and overwrite is off.
    OutputExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NoAudioStreams => "no audio streams",
            SkipReason::NoAcceptedAudio => "no audio stream in an accepted language",
            SkipReason::AlreadyCompliant => "nothing to convert",
            SkipReason::DryRun => "dry run",
            SkipReason::OutputExists => "converted file already exists",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Transcoded { output: PathBuf },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Replace the input with the result instead of writing `<stem>-ac3.<ext>`.
    pub overwrite: bool,
    /// Plan and log, but never run the transcoder.
    pub dry_run: bool,
    /// Limit on a single transcode.
    pub timeout: Option<Duration>,
}

/// Counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub transcoded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

pub struct Processor<P, T> {
    probe: P,
    transcoder: T,
    config: PlanConfig,
    options: ProcessOptions,
    cancel: CancelFlag,
    progress: MultiProgress,
}

impl<P: Probe, T: Transcoder> Processor<P, T> {
    pub fn new(probe: P, transcoder: T, config: PlanConfig, options: ProcessOptions) -> Self {
        Self {
            probe,
            transcoder,
            config,
            options,
            cancel: CancelFlag::new(),
            progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Draw progress bars on the given target.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Flag that aborts running and pending transcodes when raised.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Plan a file without side effects.
    pub fn plan_file(&self, path: &Path) -> Result<(MediaStreams, StreamPlan)> {
        info!("Probing {}", path.display());
        let streams = self.probe.probe(path)?;
        let plan = build_plan(&streams, &self.config);
        Ok((streams, plan))
    }

    /// Run the whole pipeline for one file.
    ///
    /// The input is only ever replaced by a rename after the transcoder
    /// reported success. Any failure leaves it as it was.
    pub fn process_file(&self, path: &Path) -> Result<Outcome> {
        if !self.options.overwrite {
            let destination = output_path(path)?;
            if destination.exists() {
                info!(
                    "Skipping {}: {} ({})",
                    path.display(),
                    SkipReason::OutputExists,
                    destination.display()
                );
                return Ok(Outcome::Skipped(SkipReason::OutputExists));
            }
        }

        let (streams, plan) = self.plan_file(path)?;

        if !streams.has_audio() {
            info!("Skipping {}: {}", path.display(), SkipReason::NoAudioStreams);
            return Ok(Outcome::Skipped(SkipReason::NoAudioStreams));
        }

        log_plan(path, &streams, &plan);

        if !plan.has_audio() {
            info!("Skipping {}: {}", path.display(), SkipReason::NoAcceptedAudio);
            return Ok(Outcome::Skipped(SkipReason::NoAcceptedAudio));
        }
        if plan.default_audio().is_none() {
            warn!(
                "{}: no '{}' audio track, no track will be marked default",
                path.display(),
                self.config.primary_language
            );
        }
        if !plan.requires_transcode() {
            info!("Skipping {}: {}", path.display(), SkipReason::AlreadyCompliant);
            return Ok(Outcome::Skipped(SkipReason::AlreadyCompliant));
        }
        if self.options.dry_run {
            info!("Skipping {}: {}", path.display(), SkipReason::DryRun);
            return Ok(Outcome::Skipped(SkipReason::DryRun));
        }
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled {
                path: path.to_path_buf(),
            });
        }

        let paths = OutputPaths::for_input(path, self.options.overwrite)?;
        let pb = self.file_progress(path, streams.duration);
        let control = TranscodeControl {
            cancel: self.cancel.clone(),
            timeout: self.options.timeout,
            progress: pb.clone(),
        };

        let result = self
            .transcoder
            .transcode(path, &paths.in_flight, &plan, &control);
        pb.finish_and_clear();

        if let Err(e) = result {
            paths.discard();
            return Err(e);
        }

        if self.options.overwrite {
            info!("Replacing {} with converted file", path.display());
        } else {
            info!("Writing {}", paths.destination.display());
        }
        match paths.finalize() {
            Ok(dest) => Ok(Outcome::Transcoded {
                output: dest.to_path_buf(),
            }),
            Err(e) => {
                paths.discard();
                Err(e)
            }
        }
    }

    /// Process files in parallel on the current rayon pool.
    ///
    /// Each file is independent: an error is logged and the batch goes on.
    pub fn run(&self, files: &[PathBuf]) -> Summary {
        let overall = self.progress.add(ProgressBar::new(files.len() as u64));
        overall.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let transcoded = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        files.par_iter().for_each(|file| {
            match self.process_file(file) {
                Ok(Outcome::Transcoded { output }) => {
                    info!("Converted {} -> {}", file.display(), output.display());
                    transcoded.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Outcome::Skipped(reason)) => {
                    debug!("{} left untouched ({})", file.display(), reason);
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
                Err(e @ Error::Cancelled { .. }) => {
                    warn!("{}", e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!("{}", e);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            overall.inc(1);
        });

        overall.finish_and_clear();
        Summary {
            total: files.len(),
            transcoded: transcoded.load(Ordering::Relaxed),
            skipped: skipped.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        }
    }

    fn file_progress(&self, path: &Path, duration: Option<Duration>) -> ProgressBar {
        let len = duration.map(|d| d.as_secs()).unwrap_or(0);
        let pb = self.progress.add(ProgressBar::new(len));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:30.green/white}] {pos}/{len}s {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_message(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        pb
    }
}

fn log_plan(path: &Path, streams: &MediaStreams, plan: &StreamPlan) {
    for stream in &streams.audio {
        if !plan.audio.iter().any(|d| d.source_index == stream.index) {
            info!(
                "{}: dropping audio #{} ({}, language '{}')",
                path.display(),
                stream.index,
                stream.codec,
                stream.language
            );
        }
    }
    for directive in &plan.audio {
        info!("{}: audio {}", path.display(), directive);
    }
    for directive in &plan.subtitle {
        info!("{}: subtitle {}", path.display(), directive);
    }
}
