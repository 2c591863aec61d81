use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use tunefetch::clients::{
    LocalStorage, Track,
    errors::{Error, Result},
};
use tunefetch::downloader::{self, Downloader};
use tunefetch::selection::{self, FixedIndices, IndexSource};
use tunefetch::settings::ApiSettings;

#[derive(Parser)]
#[command(name = "tunefetch")]
#[command(version, about = "Search a music API and download tracks as FLAC", long_about = None)]
struct Cli {
    /// Path to the API config file, e.g. {"url": "http://api.example.com/song"}
    #[arg(long, global = true, env = "TUNEFETCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search by keyword and list the results
    Search {
        keyword: String,
        /// Maximum number of results; negative values give no results
        #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
    },
    /// Print the download url for a track id
    Resolve { id: String },
    /// Search, pick tracks and download them
    Download {
        keyword: String,
        #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
        /// Indices to download, e.g. "1,3". Prompts when omitted.
        #[arg(short, long, conflicts_with = "all")]
        select: Option<String>,
        /// Download every result without prompting
        #[arg(long)]
        all: bool,
        /// Directory to write files into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    info!("Building config ...");
    let config_path = cli.config.unwrap_or_else(ApiSettings::default_path);
    let settings = ApiSettings::load(&config_path)?;

    match cli.command {
        Commands::Search { keyword, limit } => {
            let config = downloader::ConfigBuilder::new().settings(settings).build()?;
            let tracks = config.api.search_all(&keyword, limit_from(limit)).await?;
            print_listing(&tracks);
        }
        Commands::Resolve { id } => {
            let config = downloader::ConfigBuilder::new().settings(settings).build()?;
            let resolved = config.api.lookup(&id).await?;
            println!("{}", resolved.url);
            if let (Some(song), Some(singer)) = (resolved.song, resolved.singer) {
                println!("{song} - {singer}");
            }
        }
        Commands::Download {
            keyword,
            limit,
            select,
            all,
            output,
        } => {
            let mut builder = downloader::ConfigBuilder::new().settings(settings);
            if let Some(dir) = output {
                builder = builder.storage(LocalStorage::new(dir));
            }
            download_tracks(builder.build()?, &keyword, limit_from(limit), select, all).await?;
        }
    }
    Ok(())
}

async fn download_tracks(
    config: downloader::Config,
    keyword: &str,
    limit: usize,
    select: Option<String>,
    all: bool,
) -> Result<()> {
    let fetcher = Downloader::new(config);
    let tracks = fetcher.api().search_all(keyword, limit).await?;
    if tracks.is_empty() {
        println!("No tracks found for {keyword:?}");
        return Ok(());
    }
    print_listing(&tracks);

    let chosen = match (select, all) {
        (_, true) => {
            let mut source = FixedIndices::all(tracks.len());
            selection::choose(tracks, &mut source).await?
        }
        (Some(input), false) => selection::choose(tracks, &mut FixedIndices::new(input)).await?,
        (None, false) => selection::choose(tracks, &mut StdinPrompt::new()).await?,
    };
    if chosen.is_empty() {
        println!("Nothing selected");
        return Ok(());
    }

    let report = fetcher.download_all(chosen, Some(&print_progress)).await;
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(path) => println!("ok    {} -> {}", outcome.track, path.display()),
            Err(e) => println!("error {}: {e}", outcome.track),
        }
    }
    println!(
        "Downloaded {} of {} tracks into {}",
        report.succeeded(),
        report.outcomes.len(),
        fetcher.storage().root().display()
    );
    Ok(())
}

fn limit_from(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

fn print_listing(tracks: &[Track]) {
    if tracks.is_empty() {
        println!("No tracks found");
    }
    for line in selection::listing(tracks) {
        println!("{line}");
    }
}

fn print_progress(downloaded: u64, total: u64) {
    if total > 0 {
        eprint!("\r  {:>3}% ({downloaded}/{total} bytes)", downloaded * 100 / total);
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\r  {downloaded} bytes");
    }
}

// Reads indices from the terminal, asking again until something valid is picked
struct StdinPrompt {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPrompt {
    fn new() -> Self {
        StdinPrompt {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl IndexSource for StdinPrompt {
    async fn next_input(&mut self, tracks: &[Track]) -> Result<Option<String>> {
        print!("Pick tracks to download (1-{}, e.g. 1,3): ", tracks.len());
        std::io::stdout()
            .flush()
            .map_err(|e| Error::PromptError(e.to_string()))?;
        self.lines
            .next_line()
            .await
            .map_err(|e| Error::PromptError(e.to_string()))
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_limit_means_no_results() {
        assert_eq!(limit_from(-1), 0);
        assert_eq!(limit_from(i64::MIN), 0);
        assert_eq!(limit_from(0), 0);
        assert_eq!(limit_from(10), 10);
    }

    #[test]
    fn negative_limit_is_accepted_on_the_command_line() {
        let cli = Cli::try_parse_from(["tunefetch", "search", "lemon", "--limit", "-1"]).unwrap();
        match cli.command {
            Commands::Search { limit, .. } => assert_eq!(limit_from(limit), 0),
            _ => panic!("expected search command"),
        }
    }
}
