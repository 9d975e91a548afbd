//! Log output that does not tear progress bars.

use indicatif::MultiProgress;
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

/// Writes log lines to stderr while the bars of `progress` are hidden.
#[derive(Clone)]
pub struct ProgressWriter {
    progress: MultiProgress,
}

impl ProgressWriter {
    pub fn new(progress: MultiProgress) -> Self {
        Self { progress }
    }
}

impl<'a> MakeWriter<'a> for ProgressWriter {
    type Writer = SuspendedStderr<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedStderr {
            progress: &self.progress,
        }
    }
}

pub struct SuspendedStderr<'a> {
    progress: &'a MultiProgress,
}

impl Write for SuspendedStderr<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.progress.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins; otherwise `ac3_enc` logs at info, or debug when verbose.
pub fn init(verbose: bool, progress: &MultiProgress) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "ac3_enc=debug".to_string()
        } else {
            "ac3_enc=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(ProgressWriter::new(progress.clone()))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::{ProgressBar, ProgressDrawTarget};

    #[test]
    fn test_writer_reports_full_write_with_active_bar() {
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = progress.add(ProgressBar::new(10));
        bar.inc(3);

        let writer = ProgressWriter::new(progress.clone());
        let line = b"converted movie.mkv\n";
        assert_eq!(writer.make_writer().write(line).unwrap(), line.len());
        writer.make_writer().write_all(line).unwrap();
        writer.make_writer().flush().unwrap();

        assert_eq!(bar.position(), 3);
    }
}
