use anyhow::Context;
use clap::Parser;
use hotel_dump::{
    download_latest, validate_dest_folder, DownloadConfig, LogConfig, S3Store, SelectionPolicy,
    SyncReport,
};
use std::path::PathBuf;
use tracing::info;

/// Download the latest complete hotel-dump snapshot into a folder.
#[derive(Parser, Debug)]
#[command(name = "hotel-dump")]
#[command(about = "Download the latest complete hotel-dump snapshot from S3", long_about = None)]
#[command(version)]
struct Args {
    /// Existing empty folder where files should be stored
    dest_folder: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Only consider snapshot folders containing a `done` marker
    #[arg(long)]
    require_done_marker: bool,

    /// Extra download attempts per file on transfer errors
    #[arg(long, default_value_t = 0)]
    retries: usize,
}

impl Args {
    fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            selection: if self.require_done_marker {
                SelectionPolicy::RequireDoneMarker
            } else {
                SelectionPolicy::LatestName
            },
            retries: self.retries,
            show_progress: atty::is(atty::Stream::Stderr),
            ..DownloadConfig::default()
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<SyncReport> {
    validate_dest_folder(&args.dest_folder).context("Invalid destination folder")?;

    let config = args.download_config();
    info!("Connecting to Amazon S3");
    let store = S3Store::from_env(config.bucket.clone()).await;
    info!("Using bucket {}", store.bucket());

    download_latest(&store, &config, &args.dest_folder)
        .await
        .with_context(|| format!("Failed to download dump to {}", args.dest_folder.display()))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    LogConfig {
        verbose: args.verbose,
    }
    .init();

    info!(
        "🚀 Download latest hotel-dump dump to {}",
        args.dest_folder.display()
    );

    match run(&args).await {
        Ok(_) => info!("Done!"),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_dest_folder() {
        let args = Args::try_parse_from(["hotel-dump", "/data/dumps"]).unwrap();
        assert_eq!(args.dest_folder, PathBuf::from("/data/dumps"));
        assert!(!args.verbose);

        let config = args.download_config();
        assert_eq!(config.selection, SelectionPolicy::LatestName);
        assert_eq!(config.retries, 0);
        assert_eq!(config.bucket, "trustyou-api");
        assert_eq!(config.namespace, "hotels");
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "hotel-dump",
            "-v",
            "--require-done-marker",
            "--retries",
            "3",
            "out",
        ])
        .unwrap();
        assert!(args.verbose);

        let config = args.download_config();
        assert_eq!(config.selection, SelectionPolicy::RequireDoneMarker);
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn dest_folder_is_required() {
        assert!(Args::try_parse_from(["hotel-dump"]).is_err());
    }
}
