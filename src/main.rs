mod cli;

use ac3_enc::discover::{collect_candidates, MediaWalker};
use ac3_enc::integration::{self, Trigger, TriggerSource};
use ac3_enc::logging;
use ac3_enc::probe::FfprobeProbe;
use ac3_enc::tools::require_tools;
use ac3_enc::transcode::FfmpegTranscoder;
use ac3_enc::{PlanConfig, ProcessOptions, Processor, Summary};
use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Args;
use crossbeam_channel::{bounded, Receiver};
use indicatif::MultiProgress;
use rayon::ThreadPoolBuilder;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

enum ControlMessage {
    Quit,
}

fn read_char() -> std::io::Result<char> {
    let mut buffer = [0; 1];
    std::io::stdin().read_exact(&mut buffer)?;
    Ok(buffer[0] as char)
}

fn spawn_control_thread() -> Receiver<ControlMessage> {
    let (tx, rx) = bounded::<ControlMessage>(1);

    thread::spawn(move || {
        eprintln!("Press 'q' and Enter to cancel running conversions");
        while let Ok(input) = read_char() {
            if input == 'q' {
                let _ = tx.send(ControlMessage::Quit);
                break;
            }
        }
    });

    rx
}

fn validate_arguments(args: &Args) -> Result<()> {
    if args.jobs < 1 {
        bail!("Job count must be at least 1");
    }
    if args.timeout == Some(0) {
        bail!("Timeout must be at least one second");
    }
    if args.extensions.iter().all(|e| e.trim().is_empty()) {
        bail!("At least one file extension must be specified");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let progress = MultiProgress::new();
    logging::init(args.verbose, &progress);

    let trigger = integration::from_env();
    let source = trigger.as_ref().map(Trigger::source);

    match run(args, trigger, progress) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(source.map_or(1, |s| s.exit_code(false)))
        }
    }
}

fn run(mut args: Args, trigger: Option<Trigger>, progress: MultiProgress) -> Result<ExitCode> {
    validate_arguments(&args)?;

    let config = PlanConfig {
        accepted_languages: args.languages.clone(),
        primary_language: args.primary_language.clone(),
        passthrough_codecs: args.passthrough.clone(),
        ..PlanConfig::default()
    }
    .validate()?;

    let mut source: Option<TriggerSource> = None;
    match trigger {
        Some(Trigger::Ignore { source, reason }) => {
            info!("Called by {}, nothing to do: {}", source, reason);
            return Ok(ExitCode::from(source.ignored_exit_code()));
        }
        Some(Trigger::Process { source: s, path }) => {
            info!("Called by {} for {}", s, path.display());
            args.paths = vec![path];
            args.overwrite = true;
            args.recursive = s.recursive();
            source = Some(s);
        }
        None => {}
    }

    if args.dry_run {
        require_tools(&["ffprobe"])?;
    } else {
        require_tools(&["ffmpeg", "ffprobe"])?;
    }

    ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .build_global()
        .context("failed to configure thread pool")?;

    let roots = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        std::mem::take(&mut args.paths)
    };

    info!(
        "Languages: {} (default track: {})",
        config.accepted_languages.join(", "),
        config.primary_language
    );
    info!("Pass-through codecs: {}", config.passthrough_codecs.join(", "));
    if args.overwrite {
        info!("Original files will be replaced after conversion");
    }

    let walker = MediaWalker::new(roots, &args.extensions).recursive(args.recursive);
    let (files, unsupported) = collect_candidates(&walker);
    if files.is_empty() {
        println!("No matching files found");
        return Ok(exit_code(source, unsupported == 0));
    }
    info!("Found {} file(s), using {} parallel jobs", files.len(), args.jobs);

    let options = ProcessOptions {
        overwrite: args.overwrite,
        dry_run: args.dry_run,
        timeout: args.timeout.map(Duration::from_secs),
    };
    let processor = Processor::new(
        FfprobeProbe::default(),
        FfmpegTranscoder::default(),
        config,
        options,
    )
    .with_progress(progress);
    let cancel = processor.cancel_flag();

    let start_time = Instant::now();
    let (done_tx, done_rx) = bounded::<Summary>(1);
    let worker = thread::spawn(move || {
        let summary = processor.run(&files);
        let _ = done_tx.send(summary);
    });

    let control_rx = if std::io::stdin().is_terminal() && source.is_none() {
        spawn_control_thread()
    } else {
        crossbeam_channel::never()
    };

    let summary = crossbeam_channel::select! {
        recv(control_rx) -> msg => {
            if let Ok(ControlMessage::Quit) = msg {
                warn!("Cancelling, waiting for running conversions to stop");
                cancel.cancel();
            }
            done_rx.recv()
        },
        recv(done_rx) -> summary => summary,
    };
    let summary = summary.context("worker thread stopped unexpectedly")?;
    let _ = worker.join();

    println!("\nSummary:");
    println!("Files processed: {}", summary.total);
    println!("Converted: {}", summary.transcoded);
    println!("Left untouched: {}", summary.skipped);
    println!("Failed: {}", summary.failed);
    if unsupported > 0 {
        println!("Unsupported paths: {}", unsupported);
    }
    println!("Time taken: {:.2} seconds", start_time.elapsed().as_secs_f64());

    Ok(exit_code(source, summary.success() && unsupported == 0))
}

fn exit_code(source: Option<TriggerSource>, success: bool) -> ExitCode {
    match source {
        Some(source) => ExitCode::from(source.exit_code(success)),
        None if success => ExitCode::SUCCESS,
        None => ExitCode::FAILURE,
    }
}
