use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cratematch::config::{AppConfig, CliConfig, FileConfig};
use cratematch::matching::{
    analyze_gaps, find_duplicates, DuplicateMethod, DuplicateSummary, GapSummary, MatchStatus,
};
use cratematch::record::{SourceCollection, TrackRecord};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(version)]
struct CliArgs {
    #[clap(subcommand)]
    command: Command,

    /// Path to an optional TOML config file. File values override flags.
    #[clap(long, value_parser = parse_path)]
    config: Option<PathBuf>,

    /// Prefix length for artist/title/filename index fragments.
    #[clap(long, default_value_t = 4)]
    fragment_len: usize,

    /// Prefix length for the combined artist+title index fragment.
    #[clap(long, default_value_t = 6)]
    combined_fragment_len: usize,

    /// Maximum candidates examined per queried record.
    #[clap(long, default_value_t = 200)]
    candidate_cap: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report physical tracks that are missing from the digital library.
    Gaps {
        /// JSON file with the physical collection's track records.
        #[clap(value_parser = parse_path)]
        physical: PathBuf,

        /// JSON file with the digital collection's track records.
        #[clap(value_parser = parse_path)]
        digital: PathBuf,

        /// Minimum confidence for a track to count as found.
        #[clap(long, default_value_t = 80)]
        confidence_threshold: u32,

        /// Composite score at which candidate scanning stops early.
        #[clap(long, default_value_t = 95)]
        early_termination_cutoff: u32,

        /// Scan every candidate instead of stopping at near-perfect matches.
        #[clap(long)]
        exhaustive: bool,

        /// Write the full match results to this file as JSON.
        #[clap(long, value_parser = parse_path)]
        output: Option<PathBuf>,
    },
    /// Find groups of near-duplicate tracks within the digital library.
    Duplicates {
        /// JSON file with the digital collection's track records.
        #[clap(value_parser = parse_path)]
        digital: PathBuf,

        /// Minimum pair score for two tracks to count as duplicates.
        #[clap(long, default_value_t = 85)]
        similarity_threshold: u32,

        /// How candidate pairs are scored.
        #[clap(long, value_enum, default_value = "artist-title")]
        method: DuplicateMethod,

        /// Write the duplicate groups to this file as JSON.
        #[clap(long, value_parser = parse_path)]
        output: Option<PathBuf>,
    },
}

fn load_records(path: &PathBuf, expected: SourceCollection) -> Result<Vec<TrackRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {:?}", path))?;
    let records: Vec<TrackRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records file: {:?}", path))?;
    let mismatched = records.iter().filter(|r| r.source != expected).count();
    if mismatched > 0 {
        bail!(
            "{} of {} records in {:?} are not tagged as the {} collection",
            mismatched,
            records.len(),
            path,
            expected
        );
    }
    Ok(records)
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write output: {:?}", path))?;
    info!("Wrote results to {:?}", path);
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;

    match cli_args.command {
        Command::Gaps {
            physical,
            digital,
            confidence_threshold,
            early_termination_cutoff,
            exhaustive,
            output,
        } => {
            let cli_config = CliConfig {
                confidence_threshold,
                early_termination_cutoff,
                exhaustive,
                fragment_len: cli_args.fragment_len,
                combined_fragment_len: cli_args.combined_fragment_len,
                candidate_cap: cli_args.candidate_cap,
                ..CliConfig::default()
            };
            let config = AppConfig::resolve(&cli_config, file_config)?;

            let physical_records = load_records(&physical, SourceCollection::Physical)?;
            let digital_records = load_records(&digital, SourceCollection::Digital)?;

            let results = analyze_gaps(&physical_records, &digital_records, &config.gap)?;
            let summary = GapSummary::from_results(&results);

            println!(
                "Found {}/{} ({:.1}%), missing {} ({:.1}%), mean confidence {:.1}",
                summary.found,
                summary.total_tracks,
                summary.found_pct,
                summary.missing,
                summary.missing_pct,
                summary.mean_confidence
            );
            for (result, track) in results.iter().zip(&physical_records) {
                if result.status == MatchStatus::Missing {
                    println!(
                        "missing  {} - {} (best {}, confidence {})",
                        track.artist,
                        track.title,
                        result.matched_digital_id.as_deref().unwrap_or("none"),
                        result.confidence
                    );
                }
            }

            if let Some(path) = output {
                write_json(&path, &results)?;
            }
        }
        Command::Duplicates {
            digital,
            similarity_threshold,
            method,
            output,
        } => {
            let cli_config = CliConfig {
                similarity_threshold,
                method,
                fragment_len: cli_args.fragment_len,
                combined_fragment_len: cli_args.combined_fragment_len,
                candidate_cap: cli_args.candidate_cap,
                ..CliConfig::default()
            };
            let config = AppConfig::resolve(&cli_config, file_config)?;

            let digital_records = load_records(&digital, SourceCollection::Digital)?;
            let groups = find_duplicates(&digital_records, &config.duplicates)?;
            let summary = DuplicateSummary::from_groups(&groups);

            println!(
                "{} duplicate groups covering {} tracks (largest {}, mean pair score {:.1})",
                summary.group_count,
                summary.grouped_tracks,
                summary.largest_group,
                summary.mean_pair_score
            );
            for (number, group) in groups.iter().enumerate() {
                println!("group {}:", number + 1);
                for member in &group.members {
                    println!("  {}", member);
                }
            }

            if let Some(path) = output {
                write_json(&path, &groups)?;
            }
        }
    }

    Ok(())
}
