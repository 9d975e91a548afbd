//! Running ffmpeg for a stream plan.

use crate::plan::{StreamPlan, TrackAction};
use crate::{Error, Result};
use indicatif::ProgressBar;
use regex::Regex;
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Shared flag used to abort running transcodes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a single transcode is supervised.
#[derive(Debug, Clone)]
pub struct TranscodeControl {
    pub cancel: CancelFlag,
    /// Upper bound on wall-clock time for one file.
    pub timeout: Option<Duration>,
    /// Advanced in seconds of media written.
    pub progress: ProgressBar,
}

impl Default for TranscodeControl {
    fn default() -> Self {
        Self {
            cancel: CancelFlag::new(),
            timeout: None,
            progress: ProgressBar::hidden(),
        }
    }
}

/// Something that can execute a stream plan.
pub trait Transcoder: Send + Sync {
    /// Write `input` remuxed according to `plan` to `output`.
    ///
    /// Must never modify `input`. On error `output` may hold a partial file
    /// which the caller discards.
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        plan: &StreamPlan,
        control: &TranscodeControl,
    ) -> Result<()>;
}

/// Executes plans with the ffmpeg command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegTranscoder {
    /// Use a specific ffmpeg binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// ffmpeg arguments that apply `plan` to `input`, writing `output`.
///
/// Video and attachments are copied, every audio track gets an explicit
/// disposition so only the default directive is flagged as default.
pub fn build_ffmpeg_args(input: &Path, output: &Path, plan: &StreamPlan) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    extend(
        &mut args,
        ["-hide_banner", "-nostdin", "-nostats", "-loglevel", "error", "-y", "-i"],
    );
    args.push(input.as_os_str().to_owned());
    extend(&mut args, ["-map", "0:v?", "-c:v", "copy"]);

    for directive in &plan.audio {
        let n = directive.output_index;
        extend(&mut args, ["-map".to_string(), format!("0:{}", directive.source_index)]);
        match &directive.action {
            TrackAction::Copy => extend(&mut args, [format!("-c:a:{}", n), "copy".to_string()]),
            TrackAction::Convert(target) => {
                extend(&mut args, [format!("-c:a:{}", n), target.codec.clone()]);
                if let Some(bitrate) = target.bitrate_kbps {
                    extend(&mut args, [format!("-b:a:{}", n), format!("{}k", bitrate)]);
                }
                if let Some(channels) = target.channels {
                    extend(&mut args, [format!("-ac:a:{}", n), channels.to_string()]);
                }
                if let Some(title) = &target.title {
                    extend(
                        &mut args,
                        [format!("-metadata:s:a:{}", n), format!("title={}", title)],
                    );
                }
            }
        }
        let disposition = if directive.is_default { "default" } else { "0" };
        extend(&mut args, [format!("-disposition:a:{}", n), disposition.to_string()]);
    }

    for directive in &plan.subtitle {
        let codec = match &directive.action {
            TrackAction::Copy => "copy".to_string(),
            TrackAction::Convert(target) => target.codec.clone(),
        };
        extend(
            &mut args,
            [
                "-map".to_string(),
                format!("0:{}", directive.source_index),
                format!("-c:s:{}", directive.output_index),
                codec,
            ],
        );
    }

    extend(&mut args, ["-map", "0:t?", "-c:t", "copy", "-progress", "pipe:1"]);
    args.push(output.as_os_str().to_owned());
    args
}

fn extend<S: Into<OsString>>(args: &mut Vec<OsString>, values: impl IntoIterator<Item = S>) {
    args.extend(values.into_iter().map(Into::into));
}

/// Render a command line for logging.
pub fn display_command(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        let arg = arg.to_string_lossy();
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('"');
            line.push_str(&arg);
            line.push('"');
        } else {
            line.push_str(&arg);
        }
    }
    line
}

/// Extracts the output position from `-progress` lines.
struct ProgressParser {
    re: Regex,
}

impl ProgressParser {
    fn new() -> std::result::Result<Self, regex::Error> {
        // out_time_ms is also in microseconds.
        let re = Regex::new(r"^out_time_(?:us|ms)=(\d+)$")?;
        Ok(Self { re })
    }

    /// Seconds of output written, if the line reports it.
    fn seconds(&self, line: &str) -> Option<u64> {
        let caps = self.re.captures(line.trim())?;
        let micros: u64 = caps[1].parse().ok()?;
        Some(micros / 1_000_000)
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        plan: &StreamPlan,
        control: &TranscodeControl,
    ) -> Result<()> {
        let args = build_ffmpeg_args(input, output, plan);
        info!("Executing: {}", display_command(&self.program, &args));

        let parser = ProgressParser::new().map_err(|e| Error::transcode(input, e.to_string()))?;
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(&self.program)
                } else {
                    Error::transcode(input, e.to_string())
                }
            })?;

        let stdout = child.stdout.take();
        let pb = control.progress.clone();
        let progress_reader = thread::spawn(move || {
            if let Some(stdout) = stdout {
                for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                    if let Some(secs) = parser.seconds(&line) {
                        pb.set_position(secs);
                    }
                }
            }
        });

        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf);
            }
            buf
        });

        let started = Instant::now();
        let ticker = crossbeam_channel::tick(POLL_INTERVAL);
        let outcome = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(e) => break Err(Error::Io(e)),
            }
            if control.cancel.is_cancelled() {
                break Err(Error::Cancelled {
                    path: input.to_path_buf(),
                });
            }
            if let Some(timeout) = control.timeout {
                if started.elapsed() >= timeout {
                    break Err(Error::TimedOut {
                        path: input.to_path_buf(),
                        timeout,
                    });
                }
            }
            let _ = ticker.recv();
        };

        if outcome.is_err() {
            warn!("Stopping ffmpeg for {}", input.display());
            if let Err(e) = child.kill() {
                debug!("ffmpeg already exited: {}", e);
            }
            let _ = child.wait();
        }

        let _ = progress_reader.join();
        let stderr = stderr_reader.join().unwrap_or_default();
        let status = outcome?;

        if status.success() {
            debug!("ffmpeg finished {} in {:.1?}", input.display(), started.elapsed());
            Ok(())
        } else {
            let detail = stderr
                .lines()
                .filter(|l| !l.trim().is_empty())
                .last()
                .unwrap_or("no diagnostics");
            Err(Error::transcode(
                input,
                format!("ffmpeg exited with {}: {}", status, detail),
            ))
        }
    }
}
