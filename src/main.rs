use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod config;
mod embeddings;
mod factory;
mod render;
mod search;
#[cfg(test)]
mod tests;
mod web;

fn main() -> anyhow::Result<()> {
    // PINECONE_API_KEY and friends may live in .env
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Search {
            text,
            count,
            sector,
            market_cap,
            volume,
            json,
        } => cli::handle_search(text, count, sector, market_cap, volume, json),

        cli::Command::Serve { addr } => cli::handle_serve(addr),

        cli::Command::Sectors {} => cli::handle_sectors(),

        cli::Command::Config {} => cli::handle_config(),
    }
}
