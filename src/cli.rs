use std::path::PathBuf;

use anyhow::Context;
use catalog_engine::catalog::CatalogDecoder;
use catalog_engine::filter::{DateRangeRequest, FilterRequest, FilterSpec, GeohashRequest};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use photosphere::config::PhotosphereConfig;
use photosphere::FileType;
use tokio::fs;

#[derive(Parser)]
#[command(name = "photosphere")]
#[command(about = "Browse a photosphere media catalog", long_about = None)]
pub struct Cli {
    /// Config file (defaults to <config dir>/photosphere/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve objects from this directory instead of the configured store
    #[arg(long, global = true)]
    pub store_root: Option<PathBuf>,

    /// Storage locator of the serialized catalog
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    /// Offset from UTC, in minutes, that defines calendar days
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub utc_offset: Option<i32>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List one page of catalog entries, newest first
    List(ListArgs),

    /// Show the entry with this hash, with signed URLs
    Show { hash: String },

    /// Decode a local catalog file
    Decode { file: PathBuf },
}

#[derive(clap::Args, Default)]
pub struct ListArgs {
    /// Zero-based page number
    #[arg(short, long, default_value_t = 0)]
    pub page: usize,

    #[arg(long)]
    pub page_size: Option<usize>,

    /// JSON filter document; flags below override its fields
    #[arg(short, long)]
    pub filter: Option<PathBuf>,

    /// First day of a date range (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of a date range (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Center of a location filter as LAT,LON
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub near: Option<(f64, f64)>,

    /// Radius of the location filter in meters
    #[arg(long, default_value_t = 100.0)]
    pub radius: f64,

    /// Only entries with this hash (repeatable)
    #[arg(long = "hash")]
    pub hashes: Vec<String>,

    /// Skip entries with this hash (repeatable)
    #[arg(long = "exclude-hash")]
    pub exclude_hashes: Vec<String>,

    /// file, image or video
    #[arg(short = 't', long = "type")]
    pub file_type: Option<FileType>,

    /// Case-insensitive substring of the source URI
    #[arg(short, long)]
    pub name: Option<String>,

    /// Only entries created on this day (repeatable)
    #[arg(long = "day")]
    pub days: Vec<NaiveDate>,
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got {s}"))?;
    let lat = lat.trim().parse::<f64>().map_err(|e| format!("latitude: {e}"))?;
    let lon = lon.trim().parse::<f64>().map_err(|e| format!("longitude: {e}"))?;
    Ok((lat, lon))
}

impl ListArgs {
    /// Merges flags over an optional base document into the wire filter shape.
    pub fn filter_request(&self, base: Option<FilterRequest>) -> FilterRequest {
        let mut request = base.unwrap_or_default();

        if let (Some(start), Some(end)) = (self.from, self.to) {
            request.date_range = DateRangeRequest {
                active: true,
                start_date: Some(start),
                end_date: Some(end),
            };
        }
        if let Some((latitude, longitude)) = self.near {
            request.geohash = GeohashRequest {
                active: true,
                latitude: Some(latitude),
                longitude: Some(longitude),
                radius: self.radius,
            };
        }
        if !self.hashes.is_empty() {
            request.hash_list = Some(self.hashes.clone());
        }
        if !self.exclude_hashes.is_empty() {
            request.exclude_hash_list = Some(self.exclude_hashes.clone());
        }
        if self.file_type.is_some() {
            request.file_type = self.file_type;
        }
        if self.name.is_some() {
            request.file_name = self.name.clone();
        }
        if !self.days.is_empty() {
            request.single_date_list = Some(self.days.clone());
        }

        request
    }
}

impl Cli {
    pub async fn load_config(&self) -> anyhow::Result<PhotosphereConfig> {
        let mut config = PhotosphereConfig::load(self.config.as_deref()).await?;

        if let Some(root) = &self.store_root {
            config.store.kind = photosphere::config::StoreKind::Local;
            config.store.root = Some(root.clone());
        }
        if let Some(catalog) = &self.catalog {
            config.catalog_uri = catalog.clone();
        }
        if let Some(offset) = self.utc_offset {
            config.utc_offset_minutes = Some(offset);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Runs `command` and returns what should be printed on stdout.
pub async fn execute_command(cli: &Cli, command: &Commands) -> anyhow::Result<String> {
    match command {
        Commands::Decode { file } => {
            let bytes = fs::read(file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let records = CatalogDecoder::decode(&bytes)
                .with_context(|| format!("failed to decode {}", file.display()))?;
            Ok(serde_json::to_string_pretty(&records)?)
        }
        Commands::List(args) => {
            let config = cli.load_config().await?;
            let engine = photosphere::open(&config)?;

            let base = match &args.filter {
                Some(path) => {
                    let content = fs::read_to_string(path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Some(
                        serde_json::from_str::<FilterRequest>(&content)
                            .with_context(|| format!("invalid filter in {}", path.display()))?,
                    )
                }
                None => None,
            };
            let filter = FilterSpec::from(args.filter_request(base));

            let page_size = args.page_size.unwrap_or(config.page_size);
            let rows = engine.list_page(args.page, page_size, &filter).await?;
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        Commands::Show { hash } => {
            let config = cli.load_config().await?;
            let engine = photosphere::open(&config)?;
            let record = engine.find_by_hash(hash).await?;
            Ok(serde_json::to_string_pretty(&record)?)
        }
    }
}
