// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use friends_map_core::filter::{self, FilterCriteria, FilterStats, RegionSelector};
use friends_map_core::preferences::{self, PreferenceUpdate, Settings};
use friends_map_core::storage::{FileStorage, KeyValueStorage, STORAGE_FILE_NAME};
use friends_map_core::theme::ThemeDocument;
use friends_map_core::{Friend, FriendStore, MapKind, Theme};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Friend list JSON to use instead of the bundled one
    #[arg(short, long, env = "FRIENDS_MAP_DATA")]
    data: Option<PathBuf>,

    /// Directory holding persisted settings
    #[arg(long, env = "FRIENDS_MAP_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Case-insensitive match on name, city, province or address
    #[arg(short, long, default_value = "")]
    query: String,
    /// Exact province, or "all"
    #[arg(short, long, default_value = "all")]
    region: RegionSelector,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.query.clone(), self.region.clone())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List friends, optionally filtered
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Only the friends plotted on this map (defaults to the saved map type)
        #[arg(short, long)]
        map: Option<MapKind>,
    },
    /// List regions with their friend counts
    Regions,
    /// Show total, filtered and region counts
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one friend in full
    Show { id: String },
    /// Inspect or change preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Show the theme, or switch it with "light", "dark" or "toggle"
    Theme { value: Option<String> },
    /// Clear ALL persisted settings
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    Show,
    Set { field: PrefField, value: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum PrefField {
    Theme,
    Language,
    MapType,
    AutoSave,
}

fn parse_update(field: PrefField, value: &str) -> Result<PreferenceUpdate> {
    Ok(match field {
        PrefField::Theme => {
            PreferenceUpdate::Theme(value.parse().map_err(|e: String| anyhow!(e))?)
        }
        PrefField::Language => PreferenceUpdate::Language(value.to_string()),
        PrefField::MapType => {
            PreferenceUpdate::MapType(value.parse().map_err(|e: String| anyhow!(e))?)
        }
        PrefField::AutoSave => PreferenceUpdate::AutoSave(
            value
                .parse()
                .with_context(|| format!("auto-save expects true or false, got '{}'", value))?,
        ),
    })
}

fn print_friend_row(friend: &Friend) {
    println!(
        "{:>4}  {:<16} {:<12} {:<14} ({:.4}, {:.4})",
        friend.id, friend.name, friend.province, friend.city, friend.latitude, friend.longitude
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);

    let storage: Arc<dyn KeyValueStorage> = Arc::new(match &cli.config_dir {
        Some(dir) => FileStorage::open(dir.join(STORAGE_FILE_NAME)),
        None => FileStorage::in_config_root(),
    });

    let load_store = || -> Result<FriendStore> {
        match &cli.data {
            Some(path) => FriendStore::load(path),
            None => FriendStore::bundled().context("Bundled friend data is invalid"),
        }
    };

    match &cli.command {
        Commands::List { filter: args, map } => {
            let store = load_store()?;
            let settings = Settings::open(Arc::clone(&storage));
            let map = map.unwrap_or(settings.preferences().map_type);

            let filtered = filter::filter(store.friends(), &args.criteria());
            let shown = map.friends_for(&filtered);
            println!("{} ({} of {} friends)", map.label(), shown.len(), store.len());
            for friend in &shown {
                print_friend_row(friend);
            }
        }
        Commands::Regions => {
            let store = load_store()?;
            for (region, count) in filter::region_counts(store.friends()) {
                println!("{:<16} {}", region, count);
            }
        }
        Commands::Stats { filter: args } => {
            let store = load_store()?;
            let filtered = filter::filter(store.friends(), &args.criteria());
            let stats = FilterStats::compute(store.friends(), &filtered);
            println!("Total:    {}", stats.total_count);
            println!("Filtered: {}", stats.filtered_count);
            println!("Regions:  {}", stats.region_count);
        }
        Commands::Show { id } => {
            let store = load_store()?;
            let friend = store
                .get(id)
                .ok_or_else(|| anyhow!("No friend with id '{}'", id))?;
            println!("{}", friend.name);
            println!("  Location:    {}", friend.location_label());
            println!(
                "  Coordinates: {:.4}, {:.4}",
                friend.latitude, friend.longitude
            );
            println!("  Avatar:      {}", friend.avatar_url(60));
            if let Some(description) = &friend.description {
                println!("  {}", description);
            }
        }
        Commands::Prefs { action } => {
            let mut settings = Settings::open(Arc::clone(&storage));
            if let PrefsAction::Set { field, value } = action {
                settings.update_preference(parse_update(*field, value)?);
            }
            let prefs = settings.preferences();
            println!("theme:     {}", settings.theme());
            println!("language:  {}", prefs.language);
            println!("map-type:  {}", prefs.map_type);
            println!("auto-save: {}", prefs.auto_save);
            println!("size:      {} bytes", settings.footprint_bytes());
        }
        Commands::Theme { value } => {
            let mut settings = Settings::open(Arc::clone(&storage));
            match value.as_deref() {
                None => {}
                Some("toggle") => {
                    settings.toggle_theme();
                }
                Some(name) => {
                    let theme: Theme = name.parse().map_err(|e: String| anyhow!(e))?;
                    settings.set_theme(theme);
                }
            }
            println!("{}", ThemeDocument::new(settings.theme()).to_css());
        }
        Commands::Reset { yes } => {
            let confirmed = *yes || confirm("Reset ALL settings? This cannot be undone.")?;
            if preferences::reset_all(storage.as_ref(), confirmed)? {
                println!("All settings cleared. Restart the app to reload defaults.");
            } else {
                println!("Reset cancelled.");
            }
        }
    }

    Ok(())
}
