use clap::{Parser, Subcommand};
use snaplog::commit::{ItemFilter, LocalCommitBackend};
use snaplog::drafts::DraftStore;
use snaplog::imaging::{self, CompressionConfig, RustBackend};
use snaplog::storage::FileStore;
use snaplog::sync::{NetworkStatus, RetryPolicy, SyncDriver};
use snaplog::types::{Condition, Draft, DraftItem};
use snaplog::{config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "snaplog")]
#[command(version)]
#[command(about = "Compress item photos and keep drafts safe until they sync")]
#[command(long_about = "\
Compress item photos and keep drafts safe until they sync

Photos are scaled so their longest side fits the configured maximum, then
encoded as JPEG at descending qualities until one fits the byte budget.
Captured items wait in a local draft queue until a sync commits them.

Data directory layout:

  .snaplog/
  ├── item-store.json      # Draft queue (survives restarts)
  ├── captures/            # Compressed photos, deleted once their draft leaves the queue
  ├── compressed/          # Default output of 'snaplog compress'
  └── committed/           # Backend of record used by 'snaplog sync'
      ├── images/<id>.jpg
      └── items/<id>.json

Logging goes to stderr; set RUST_LOG=debug to see every ladder step.

Run 'snaplog gen-config' to generate a documented snaplog.toml.")]
struct Cli {
    /// Directory containing snaplog.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Directory for drafts, captures, and committed items
    #[arg(long, default_value = ".snaplog", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress images (or every supported image under directories)
    Compress {
        /// Image files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output directory [default: <data-dir>/compressed]
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compress a photo and queue it as a draft item
    Capture(CaptureArgs),
    /// Inspect and manage the draft queue
    #[command(subcommand)]
    Drafts(DraftsCommand),
    /// List committed items
    Items {
        /// Only items in this category (case-insensitive)
        #[arg(long)]
        category: Option<String>,
        /// Only items whose title, notes, color, or tags contain this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Commit queued drafts
    Sync {
        /// Behave as if the network were down
        #[arg(long)]
        offline: bool,
    },
    /// Print a stock snaplog.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct CaptureArgs {
    /// Photo to capture
    image: PathBuf,
    #[command(flatten)]
    fields: ItemFields,
}

/// Item fields settable from the command line.
#[derive(clap::Args)]
struct ItemFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    color: Option<String>,
    /// Excellent, Good, Fair, or Poor
    #[arg(long)]
    condition: Option<Condition>,
    /// Repeat for several tags
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl ItemFields {
    /// Overwrite the fields that were given; tags given replace all tags.
    fn apply(self, item: &mut DraftItem) {
        if self.title.is_some() {
            item.title = self.title;
        }
        if self.category.is_some() {
            item.category = self.category;
        }
        if self.color.is_some() {
            item.color = self.color;
        }
        if self.condition.is_some() {
            item.condition = self.condition;
        }
        if !self.tags.is_empty() {
            item.tags = self.tags;
        }
        if self.notes.is_some() {
            item.notes = self.notes;
        }
    }
}

#[derive(Subcommand)]
enum DraftsCommand {
    /// List queued drafts
    List,
    /// Change a queued draft's fields, e.g. to fix a rejected one
    Edit {
        id: String,
        #[command(flatten)]
        fields: ItemFields,
    },
    /// Discard a draft and its captured photo
    Remove { id: String },
    /// Retry one draft now, ignoring the retry limit
    Retry {
        id: String,
        #[arg(long)]
        offline: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => config::load_config(&cli.config_dir)?,
    };

    match cli.command {
        Command::Compress { paths, out } => {
            init_thread_pool(&config.processing);
            let sources = expand_sources(&paths);
            let out = out.unwrap_or_else(|| cli.data_dir.join("compressed"));
            let compression = CompressionConfig::from_config(&config);
            let results = imaging::compress_all(&RustBackend::new(), &sources, &out, &compression);
            output::print_compression_results(&sources, &results, compression.max_file_size);
        }
        Command::Capture(args) => {
            let compression = CompressionConfig::from_config(&config);
            let result = imaging::compress(
                &RustBackend::new(),
                &args.image,
                &cli.data_dir.join("captures"),
                &compression,
            )?;

            let mut item = DraftItem::default();
            args.fields.apply(&mut item);
            let draft = Draft::new(item, result.path.display().to_string());

            let queued = open_drafts(&cli.data_dir, &config)
                .and_then(|mut store| Ok(store.add_draft(draft.clone())?));
            if let Err(e) = queued {
                // Nothing references the capture if it never made it into the queue
                draft.discard_local_image();
                return Err(e);
            }
            output::print_capture(&draft, &result, compression.max_file_size);
        }
        Command::Drafts(DraftsCommand::List) => {
            let store = open_drafts(&cli.data_dir, &config)?;
            output::print_draft_list(store.drafts());
        }
        Command::Drafts(DraftsCommand::Remove { id }) => {
            let mut store = open_drafts(&cli.data_dir, &config)?;
            let Some(draft) = store.get(&id).cloned() else {
                return Err(format!("No draft with id {}", id).into());
            };
            store.remove_draft(&id)?;
            draft.discard_local_image();
            println!("Removed {}", id);
        }
        Command::Drafts(DraftsCommand::Edit { id, fields }) => {
            let mut store = open_drafts(&cli.data_dir, &config)?;
            if !store.edit_draft(&id, |item| fields.apply(item))? {
                return Err(format!("No draft with id {}", id).into());
            }
            if let Some(draft) = store.get(&id) {
                output::print_draft_list(std::slice::from_ref(draft));
            }
        }
        Command::Drafts(DraftsCommand::Retry { id, offline }) => {
            let mut store = open_drafts(&cli.data_dir, &config)?;
            let backend = LocalCommitBackend::new(cli.data_dir.join("committed"));
            let network = NetworkStatus::new(!offline);
            let driver = SyncDriver::new(&backend, &network, RetryPolicy::from_config(&config.sync));
            match driver.retry(&mut store, &id)? {
                Some(report) => output::print_sync_report(&report),
                None => return Err(format!("No draft with id {}", id).into()),
            }
        }
        Command::Items { category, search } => {
            let backend = LocalCommitBackend::new(cli.data_dir.join("committed"));
            let items = backend.find_items(&ItemFilter { category, search })?;
            output::print_item_list(&items);
        }
        Command::Sync { offline } => {
            let mut store = open_drafts(&cli.data_dir, &config)?;
            let backend = LocalCommitBackend::new(cli.data_dir.join("committed"));
            let network = NetworkStatus::new(!offline);
            let driver = SyncDriver::new(&backend, &network, RetryPolicy::from_config(&config.sync));
            let report = driver.sync_pending(&mut store)?;
            output::print_sync_report(&report);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (warnings only when unset).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Never more threads than available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn open_drafts(
    data_dir: &Path,
    config: &config::SnapLogConfig,
) -> Result<DraftStore<FileStore>, Box<dyn std::error::Error>> {
    let storage = FileStore::open(data_dir)?;
    Ok(DraftStore::open(storage, config.drafts.storage_key.clone())?)
}

/// Files are taken as given; directories contribute every supported image
/// beneath them, in path order.
fn expand_sources(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for path in paths {
        if !path.is_dir() {
            sources.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && imaging::is_supported_image(e.path()))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        sources.extend(found);
    }
    sources
}
