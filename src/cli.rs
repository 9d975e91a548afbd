use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ac3_enc")]
#[command(version, about = "Converts audio tracks of media files to AC3 and keeps only wanted languages")]
pub struct Args {
    /// Files or directories to process (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Replace the original files instead of writing <name>-ac3.<ext>
    #[arg(short = 'o', long)]
    pub overwrite: bool,

    /// Descend into subdirectories
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Audio languages to keep (ISO 639-2 tags)
    #[arg(
        short = 'l',
        long,
        value_delimiter = ',',
        default_value = "ger,eng",
        env = "AC3ENC_LANGUAGES"
    )]
    pub languages: Vec<String>,

    /// Language of the default audio track
    #[arg(short = 'p', long, default_value = "ger", env = "AC3ENC_PRIMARY_LANGUAGE")]
    pub primary_language: String,

    /// Audio codecs that are copied without re-encoding
    #[arg(long, value_delimiter = ',', default_value = "ac3,eac3")]
    pub passthrough: Vec<String>,

    /// File extensions picked up in directories
    #[arg(short = 'e', long, value_delimiter = ',', default_value = "mkv,mp4,m4v,avi")]
    pub extensions: Vec<String>,

    /// Number of files to process in parallel (default: number of CPU cores)
    #[arg(short = 'j', long, default_value_t = num_cpus::get())]
    pub jobs: usize,

    /// Abort a single transcode after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Only show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["ac3_enc"]).unwrap();
        assert!(args.paths.is_empty());
        assert!(!args.overwrite);
        assert_eq!(args.passthrough, vec!["ac3", "eac3"]);
        assert!(args.jobs >= 1);
        assert_eq!(args.timeout, None);
    }

    #[test]
    fn test_flags_and_lists() {
        let args = Args::try_parse_from([
            "ac3_enc", "-o", "-r", "-l", "eng,fra", "-p", "fra", "--timeout", "3600", "a.mkv",
            "shows",
        ])
        .unwrap();
        assert!(args.overwrite && args.recursive);
        assert_eq!(args.languages, vec!["eng", "fra"]);
        assert_eq!(args.primary_language, "fra");
        assert_eq!(args.timeout, Some(3600));
        assert_eq!(args.paths, vec![PathBuf::from("a.mkv"), PathBuf::from("shows")]);
    }
}
