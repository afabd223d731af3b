//! Catalog CLI commands
//!
//! Every command refreshes a fresh listing from the configured catalog and
//! then queries it.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

use contrib_core::catalog::{
    parser, CatalogFetcher, ContributionListing, ContributionRecord, LoggingProgressMonitor,
    RefreshStatus,
};
use contrib_core::config::ListingConfig;

#[derive(Subcommand, Debug)]
pub enum CatalogSubcommand {
    /// List contributions, optionally filtered
    List {
        /// Filter terms: free text, is:installed, not:installed, has:updates
        query: Vec<String>,

        /// Only show this category
        #[clap(long)]
        category: Option<String>,

        /// Installed contributions, as a catalog document
        #[clap(long)]
        installed: Option<PathBuf>,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },

    /// List the categories present in the catalog
    Categories,

    /// Show installed contributions with a newer version in the catalog
    Updates {
        /// Installed contributions, as a catalog document
        #[clap(long)]
        installed: PathBuf,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },
}

impl CatalogSubcommand {
    pub async fn execute(self, catalog: Option<&str>) -> Result<()> {
        let config = load_config(catalog)?;

        match self {
            CatalogSubcommand::List {
                query,
                category,
                installed,
                json,
            } => {
                let listing = refresh_listing(&config, installed.as_deref()).await?;
                execute_list(&listing, category.as_deref(), &query, json)
            }
            CatalogSubcommand::Categories => {
                let listing = refresh_listing(&config, None).await?;
                execute_categories(&listing);
                Ok(())
            }
            CatalogSubcommand::Updates { installed, json } => {
                let listing = refresh_listing(&config, Some(&installed)).await?;
                execute_updates(&listing, json)
            }
        }
    }
}

fn load_config(catalog: Option<&str>) -> Result<ListingConfig> {
    let mut config = ListingConfig::load()?;

    if let Some(catalog) = catalog {
        config.catalog_url = catalog_url(catalog);
        config.validate()?;
    }

    Ok(config)
}

/// Bare paths become `file://` URLs
fn catalog_url(catalog: &str) -> String {
    if catalog.contains("://") {
        catalog.to_string()
    } else {
        format!("file://{catalog}")
    }
}

async fn refresh_listing(
    config: &ListingConfig,
    installed: Option<&Path>,
) -> Result<Arc<ContributionListing>> {
    let fetcher = CatalogFetcher::from_config(config)?;
    let listing = Arc::new(ContributionListing::new());

    eprintln!("Fetching contribution catalog from {}...", fetcher.url());
    let task = listing.refresh_advertised_list_async(fetcher, Arc::new(LoggingProgressMonitor));

    match task.wait().await {
        RefreshStatus::Completed { entries } => {
            tracing::debug!("Catalog lists {} contributions", entries);
        }
        RefreshStatus::Failed => {
            bail!(
                "Could not refresh the contribution catalog from {} (rerun with --log-level info for details)",
                config.catalog_url
            );
        }
        RefreshStatus::Canceled => bail!("Catalog refresh was canceled"),
    }

    if let Some(path) = installed {
        let records = parser::parse_file(path).with_context(|| {
            format!("Failed to read installed contributions: {}", path.display())
        })?;
        listing.update_installed_list(records);
    }

    Ok(listing)
}

/// Table row for listed contributions
#[derive(Tabled)]
struct ContributionRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    contribution_type: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&ContributionRecord> for ContributionRow {
    fn from(record: &ContributionRecord) -> Self {
        let status = if record.has_updates() {
            "update available"
        } else if record.installed {
            "installed"
        } else {
            ""
        };

        Self {
            name: record.name.clone(),
            contribution_type: record.contribution_type.to_string(),
            version: record.version_display(),
            status: status.to_string(),
            description: truncate(record.short_description.as_deref().unwrap_or(""), 50),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn print_table<R: Tabled>(rows: &[R]) {
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
}

fn execute_list(
    listing: &ContributionListing,
    category: Option<&str>,
    query: &[String],
    json_output: bool,
) -> Result<()> {
    let results = listing.get_filtered_list(category, query);

    if json_output {
        let records: Vec<&ContributionRecord> = results.iter().map(|r| r.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No contributions found.");
        return Ok(());
    }

    println!("Found {} contribution(s):\n", results.len());
    let rows: Vec<ContributionRow> = results.iter().map(|r| r.as_ref().into()).collect();
    print_table(&rows);

    Ok(())
}

fn execute_categories(listing: &ContributionListing) {
    for category in listing.get_categories() {
        let count = listing.get_contributions_by_category(Some(&category)).len();
        println!("  {category} ({count})");
    }
}

/// Table row for available updates
#[derive(Tabled)]
struct UpdateRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Available")]
    available: String,
}

fn execute_updates(listing: &ContributionListing, json_output: bool) -> Result<()> {
    let updatable = listing.get_updatable();

    if json_output {
        let updates: Vec<serde_json::Value> = updatable
            .iter()
            .map(|record| {
                serde_json::json!({
                    "name": record.name,
                    "type": record.contribution_type.as_str(),
                    "installed_version": record.version,
                    "available_version": record.advertised_version(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&updates)?);
        return Ok(());
    }

    if updatable.is_empty() {
        println!("All installed contributions are up to date.");
        return Ok(());
    }

    let rows: Vec<UpdateRow> = updatable
        .iter()
        .map(|record| UpdateRow {
            name: record.name.clone(),
            installed: record.version_display(),
            available: record
                .advertised()
                .map(|advertised| advertised.version_display())
                .unwrap_or_default(),
        })
        .collect();
    print_table(&rows);

    Ok(())
}
