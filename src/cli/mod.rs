use clap::{Parser, Subcommand};

use crate::search::{DisplayRange, MAX_RESULT_COUNT};

mod commands;
mod errors;
mod handlers;
mod validation;

pub use handlers::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find stocks whose business matches a description
    Search {
        /// What the company does, in plain words
        #[clap(allow_hyphen_values = true)]
        text: String,

        /// Number of results
        #[clap(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..=MAX_RESULT_COUNT as u64))]
        count: Option<u64>,

        /// Restrict to one sector ("Any Sector" for no restriction)
        #[clap(short, long)]
        sector: Option<String>,

        /// Market cap range as MIN..MAX, in the configured unit (billions by default)
        #[clap(short, long)]
        market_cap: Option<DisplayRange>,

        /// Volume range as MIN..MAX, in the configured unit (millions by default)
        #[clap(short, long)]
        volume: Option<DisplayRange>,

        /// Print results as json
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Start the HTTP search service
    Serve {
        /// Address to listen on
        #[clap(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },

    /// List the sectors a search can be restricted to
    Sectors {},

    /// Print the active configuration
    Config {},
}
