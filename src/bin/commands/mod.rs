pub mod artists;
pub mod config;
pub mod data;
pub mod library;
pub mod search;
pub mod system;
pub mod utils;

use clap::{Subcommand, ValueEnum};
use lidarr_api::bulk::TagChange;
use std::path::PathBuf;
use utils::Context;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON
    Json,
    /// Comma separated values with a header row
    Csv,
}

#[derive(Subcommand)]
pub enum WantedCommands {
    /// List missing albums, newest first
    List {
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: u32,

        /// Field to sort by
        #[arg(long, default_value = "releaseDate")]
        sort_by: String,
    },

    /// Trigger a search for the first few missing albums
    Search {
        /// Number of albums to search for
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Write every missing album to a file
    ///
    /// Usage examples:
    /// # Export as CSV for a spreadsheet
    /// lidarr wanted export --output wanted.csv --format csv
    Export {
        /// Output file path
        #[arg(long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List quality profiles
    Quality,
    /// List metadata profiles
    Metadata,
}

#[derive(Subcommand)]
pub enum ImportListCommands {
    /// List configured import lists
    List,
    /// Ask Lidarr to validate an import list
    Test {
        /// Import list ID
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Show one page of the download queue
    List {
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: u32,

        /// Include items Lidarr could not match to an artist
        #[arg(long)]
        include_unknown: bool,
    },

    /// Remove an item from the download queue
    ///
    /// Usage examples:
    /// # Drop a stuck download and never grab that release again
    /// lidarr queue remove --id 1234 --remove-from-client --blocklist
    Remove {
        /// Queue item ID
        #[arg(long)]
        id: i64,

        /// Also remove the download from the download client
        #[arg(long)]
        remove_from_client: bool,

        /// Add the release to the blocklist
        #[arg(long)]
        blocklist: bool,
    },
}

#[derive(Subcommand)]
pub enum BlocklistCommands {
    /// Show one page of the blocklist
    List {
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Items per page
        #[arg(long, default_value = "20")]
        page_size: u32,
    },
    /// Remove one blocklist entry
    Remove {
        /// Blocklist item ID
        #[arg(long)]
        id: i64,
    },
    /// Remove every blocklist entry
    Clear,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// List the backups Lidarr keeps
    List,
    /// Start a manual backup
    Create,
    /// Restore Lidarr from a backup file
    Restore {
        /// Backup file name as shown by `lidarr backup list`
        file: String,
    },
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// List all tags
    List,
    /// Create a tag
    Add {
        /// Tag label
        label: String,
    },
    /// Delete a tag
    Delete {
        /// Tag ID
        #[arg(long)]
        id: i64,
    },
    /// Show what a tag is used by
    Details {
        /// Tag ID
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ArtistCommands {
    /// Monitor artists
    Monitor {
        /// Comma-separated artist IDs
        #[arg(long, value_delimiter = ',', required = true)]
        artists: Vec<i64>,
    },
    /// Unmonitor artists
    Unmonitor {
        /// Comma-separated artist IDs
        #[arg(long, value_delimiter = ',', required = true)]
        artists: Vec<i64>,
    },
    /// Add tags to artists
    ///
    /// Usage examples:
    /// # Tag three artists with tags 2 and 5
    /// lidarr artists tag --artists 10,11,12 --tag-ids 2,5
    Tag {
        /// Comma-separated artist IDs
        #[arg(long, value_delimiter = ',', required = true)]
        artists: Vec<i64>,

        /// Comma-separated tag IDs
        #[arg(long, value_delimiter = ',', required = true)]
        tag_ids: Vec<i64>,
    },
    /// Remove tags from artists
    Untag {
        /// Comma-separated artist IDs
        #[arg(long, value_delimiter = ',', required = true)]
        artists: Vec<i64>,

        /// Comma-separated tag IDs
        #[arg(long, value_delimiter = ',', required = true)]
        tag_ids: Vec<i64>,
    },
    /// Trigger an album search for every given artist
    SearchAlbums {
        /// Comma-separated artist IDs
        #[arg(long, value_delimiter = ',', required = true)]
        artists: Vec<i64>,
    },
    /// List the artists carrying a tag
    ByTag {
        /// Tag label, matched case-insensitively
        #[arg(long)]
        tag: String,
    },
}

#[derive(Subcommand)]
pub enum DataCommands {
    /// Export the library's artists
    ///
    /// Usage examples:
    /// # Full JSON backup including albums
    /// lidarr data export-artists --output artists.json --include-albums
    ///
    /// # Flat CSV for a spreadsheet
    /// lidarr data export-artists --output artists.csv --format csv
    ExportArtists {
        /// Output file path
        #[arg(long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Include each artist's albums (JSON only)
        #[arg(long)]
        include_albums: bool,
    },
    /// Add the artists of a JSON export that are missing from the library
    ImportArtists {
        /// JSON file written by `export-artists`
        #[arg(long)]
        input: PathBuf,

        /// Only report what would be added
        #[arg(long)]
        dry_run: bool,
    },
    /// Export profiles, tags, root folders and import lists
    ExportConfig {
        /// Output file path
        #[arg(long)]
        output: PathBuf,
    },
    /// Create the tags of a configuration export that the server lacks
    ImportTags {
        /// JSON file written by `export-config`
        #[arg(long)]
        input: PathBuf,

        /// Only report what would be created
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Save --url and --api-key to the settings file
    SaveConnection,
    /// Show the saved settings
    Show,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for an artist and add it to Lidarr
    ///
    /// Results already in the library are marked. Pick one interactively or
    /// with --select; with --use-defaults the saved root folder, profiles,
    /// monitoring and tags are used instead of prompting.
    ///
    /// Usage examples:
    /// # Interactive search
    /// lidarr search "Boards of Canada"
    ///
    /// # Add the first result with saved defaults and search for its albums
    /// lidarr search "Boards of Canada" --select 1 --use-defaults --force-search
    ///
    /// # Remember the choices made this time
    /// lidarr search "Autechre" --save-defaults
    Search {
        /// Name of the artist to search for
        artist_name: String,

        /// Pick this result (1-based) instead of prompting
        #[arg(long)]
        select: Option<usize>,

        /// Use saved defaults for artist addition
        #[arg(long)]
        use_defaults: bool,

        /// Save selections as defaults
        #[arg(long)]
        save_defaults: bool,

        /// Search for albums right after adding the artist
        #[arg(long)]
        force_search: bool,
    },

    /// Check system, disk, queue and wanted status
    ///
    /// Exits with 0 when healthy, 1 on warnings and 2 on errors, so it can
    /// be used from cron or a monitoring system.
    Status {
        /// Print every check, not only the verdict
        #[arg(long)]
        details: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch the download queue until interrupted
    ///
    /// Usage examples:
    /// # Check every 30 seconds, alert above 5 failed downloads
    /// lidarr monitor --interval 30 --max-failed 5
    Monitor {
        /// Check interval in seconds
        #[arg(long, default_value = "60")]
        interval: u64,

        /// Alert threshold for failed downloads
        #[arg(long, default_value = "10")]
        max_failed: usize,
    },

    /// Summarize recent download history
    History {
        /// Hours to look back
        #[arg(long, default_value = "24")]
        hours: i64,
    },

    /// Write a full health report as JSON
    HealthReport {
        /// Output JSON file path
        #[arg(long)]
        output: PathBuf,
    },

    /// Missing albums
    #[command(subcommand)]
    Wanted(WantedCommands),

    /// Quality and metadata profiles
    #[command(subcommand)]
    Profiles(ProfileCommands),

    /// Import lists
    #[command(subcommand)]
    ImportLists(ImportListCommands),

    /// Download queue
    #[command(subcommand)]
    Queue(QueueCommands),

    /// Blocklisted releases
    #[command(subcommand)]
    Blocklist(BlocklistCommands),

    /// System backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Tags
    #[command(subcommand)]
    Tags(TagCommands),

    /// Bulk artist operations
    #[command(subcommand)]
    Artists(ArtistCommands),

    /// Library export and import
    #[command(subcommand)]
    Data(DataCommands),

    /// Local settings file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Run a command that talks to the server and return the exit code.
pub async fn execute_command(
    command: Commands,
    ctx: &mut Context,
) -> Result<i32, Box<dyn std::error::Error>> {
    let client = &ctx.client;
    match command {
        Commands::Search {
            artist_name,
            select,
            use_defaults,
            save_defaults,
            force_search,
        } => {
            return search::handle_search_command(
                ctx,
                &artist_name,
                select,
                use_defaults,
                save_defaults,
                force_search,
            )
            .await;
        }
        Commands::Status { details, json } => {
            return system::handle_status_command(client, details, json).await;
        }
        Commands::Monitor {
            interval,
            max_failed,
        } => system::handle_monitor_command(client, interval, max_failed).await?,
        Commands::History { hours } => system::handle_history_command(client, hours).await?,
        Commands::HealthReport { output } => {
            system::handle_health_report_command(client, &output).await?
        }

        Commands::Wanted(command) => match command {
            WantedCommands::List {
                page,
                page_size,
                sort_by,
            } => library::handle_wanted_list(client, page, page_size, &sort_by).await?,
            WantedCommands::Search { limit } => library::handle_wanted_search(client, limit).await?,
            WantedCommands::Export { output, format } => {
                library::handle_wanted_export(client, &output, format).await?
            }
        },
        Commands::Profiles(command) => match command {
            ProfileCommands::Quality => library::handle_quality_profiles(client).await?,
            ProfileCommands::Metadata => library::handle_metadata_profiles(client).await?,
        },
        Commands::ImportLists(command) => match command {
            ImportListCommands::List => library::handle_import_lists(client).await?,
            ImportListCommands::Test { id } => library::handle_import_list_test(client, id).await?,
        },
        Commands::Queue(command) => match command {
            QueueCommands::List {
                page,
                page_size,
                include_unknown,
            } => library::handle_queue_list(client, page, page_size, include_unknown).await?,
            QueueCommands::Remove {
                id,
                remove_from_client,
                blocklist,
            } => library::handle_queue_remove(ctx, id, remove_from_client, blocklist).await?,
        },
        Commands::Blocklist(command) => match command {
            BlocklistCommands::List { page, page_size } => {
                library::handle_blocklist_list(client, page, page_size).await?
            }
            BlocklistCommands::Remove { id } => library::handle_blocklist_remove(client, id).await?,
            BlocklistCommands::Clear => library::handle_blocklist_clear(ctx).await?,
        },
        Commands::Backup(command) => match command {
            BackupCommands::List => system::handle_backup_list(client).await?,
            BackupCommands::Create => system::handle_backup_create(client).await?,
            BackupCommands::Restore { file } => system::handle_backup_restore(ctx, &file).await?,
        },
        Commands::Tags(command) => match command {
            TagCommands::List => library::handle_tags_list(client).await?,
            TagCommands::Add { label } => library::handle_tags_add(client, &label).await?,
            TagCommands::Delete { id } => library::handle_tags_delete(ctx, id).await?,
            TagCommands::Details { id } => library::handle_tags_details(client, id).await?,
        },
        Commands::Artists(command) => match command {
            ArtistCommands::Monitor { artists } => {
                artists::handle_set_monitored(client, &artists, true).await?
            }
            ArtistCommands::Unmonitor { artists } => {
                artists::handle_set_monitored(client, &artists, false).await?
            }
            ArtistCommands::Tag { artists, tag_ids } => {
                artists::handle_change_tags(ctx, &artists, &tag_ids, TagChange::Add).await?
            }
            ArtistCommands::Untag { artists, tag_ids } => {
                artists::handle_change_tags(ctx, &artists, &tag_ids, TagChange::Remove).await?
            }
            ArtistCommands::SearchAlbums { artists } => {
                artists::handle_search_albums(client, &artists).await?
            }
            ArtistCommands::ByTag { tag } => artists::handle_by_tag(client, &tag).await?,
        },
        Commands::Data(command) => match command {
            DataCommands::ExportArtists {
                output,
                format,
                include_albums,
            } => data::handle_export_artists(client, &output, format, include_albums).await?,
            DataCommands::ImportArtists { input, dry_run } => {
                data::handle_import_artists(client, &input, dry_run).await?
            }
            DataCommands::ExportConfig { output } => {
                data::handle_export_config(client, &output).await?
            }
            DataCommands::ImportTags { input, dry_run } => {
                data::handle_import_tags(client, &input, dry_run).await?
            }
        },
        Commands::Config(command) => match command {
            // Dispatched in main before a client is built.
            ConfigCommands::SaveConnection | ConfigCommands::Show => {}
        },
    }
    Ok(0)
}
