use anyhow::Result;

use crate::{
    cli::{
        commands::{format_config, format_sectors, SearchCommand, SearchCommandParams},
        validation::validate_listen_addr,
    },
    factory::AppFactory,
    search::DisplayRange,
    web,
};

pub fn handle_search(
    text: String,
    count: Option<u64>,
    sector: Option<String>,
    market_cap: Option<DisplayRange>,
    volume: Option<DisplayRange>,
    json: bool,
) -> Result<()> {
    let config = AppFactory::load_config()?;
    let service = AppFactory::create_search_service(&config)?;

    let params = SearchCommandParams {
        text,
        count: count.map(|c| c as usize),
        sector,
        market_cap,
        volume,
        json,
    };

    let search_command = SearchCommand::new(params, &service)?;
    search_command.execute(&service).map_err(|e| anyhow::anyhow!(e))
}

pub fn handle_serve(addr: String) -> Result<()> {
    validate_listen_addr(&addr)?;

    let config = AppFactory::load_config()?;
    let service = AppFactory::create_search_service(&config)?;
    web::start_daemon(service, &addr)
}

pub fn handle_sectors() -> Result<()> {
    print!("{}", format_sectors());
    Ok(())
}

pub fn handle_config() -> Result<()> {
    let config = AppFactory::load_config()?;
    print!("{}", format_config(&config)?);
    Ok(())
}
