use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shopscout",
    version,
    about = "Search products across AI and catalog providers from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Country code for localized results (e.g., us, ch, de)
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// Language code for upstream queries (e.g., en, de)
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Bypass the response cache and fetch fresh data
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Per-provider timeout in seconds (default: 15)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Preferred provider tried first: proxy, direct, catalog
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for products
    Search {
        /// Search term (e.g., "running shoes", "vitamin c")
        query: String,

        /// Page of results to show (default: 1)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Sort order: none, price_asc, price_desc, rating_desc
        #[arg(long, default_value = "none")]
        sort: String,

        /// Keep only items priced at or above this value
        #[arg(long)]
        min_price: Option<f64>,

        /// Keep only items priced at or below this value
        #[arg(long)]
        max_price: Option<f64>,

        /// Keep only items rated at or above this value
        #[arg(long)]
        min_rating: Option<f64>,

        /// Keep only brands containing this text (repeatable)
        #[arg(long)]
        brand: Vec<String>,

        /// Keep only stores containing this text (repeatable)
        #[arg(long)]
        store: Vec<String>,

        /// Force a refetch even when results are already loaded
        #[arg(long)]
        refresh: bool,

        /// Print cache and provider diagnostics after the results
        #[arg(long)]
        diagnostics: bool,
    },

    /// Interactive session: search once, then page and filter live
    Shell,
}
