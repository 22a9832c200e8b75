use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Client for the asynchronous property recommendation service
#[derive(Debug, Parser)]
#[command(name = "recs")]
#[command(
    about = "Submit recommendation jobs, follow their progress and manage saved properties",
    long_about = None
)]
pub struct Cli {
    /// RON configuration file (defaults to ./recs.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Service base URL, overriding the configuration file
    #[arg(long, global = true, env = "RECS_BASE_URL")]
    pub base_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also append log output to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate recommendations for a profile and wait for the result
    Recommend {
        /// Profile to generate recommendations for
        #[arg(long)]
        profile_id: String,

        /// Skip AI enrichment
        #[arg(long)]
        basic: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Directory to write a JSON export into
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the current status of a job
    Status { job_id: String },

    /// Fetch the result of a finished job
    Result {
        job_id: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a property to the user's list
    Save { property_id: String },

    /// Remove a property from the user's list
    Unsave { property_id: String },
}
