use crate::{
    cli::{errors::CliResult, validation::*},
    config::Config,
    render,
    search::{DisplayRange, SearchOutcome, SearchQuery, SearchService, Sector, ANY_SECTOR},
};

/// Command for one stock search
#[derive(Debug, Clone)]
pub struct SearchCommand {
    pub query: SearchQuery,
    pub json: bool,
}

/// Parameters for creating a search command
#[derive(Debug, Clone, Default)]
pub struct SearchCommandParams {
    pub text: String,
    pub count: Option<usize>,
    pub sector: Option<String>,
    pub market_cap: Option<DisplayRange>,
    pub volume: Option<DisplayRange>,
    pub json: bool,
}

impl SearchCommand {
    /// Fill unset options from the service defaults: full ranges, any sector,
    /// the configured result count.
    pub fn new(params: SearchCommandParams, service: &SearchService) -> CliResult<Self> {
        validate_search_text(&params.text)?;

        let count = params.count.unwrap_or(service.default_result_count());
        let mut query = service.default_query(params.text.trim(), count);

        if let Some(sector) = params.sector {
            query.sector = Sector::parse_selection(&sector)?;
        }
        if let Some(market_cap) = params.market_cap {
            query.market_cap = market_cap;
        }
        if let Some(volume) = params.volume {
            query.volume = volume;
        }

        Ok(Self {
            query,
            json: params.json,
        })
    }

    pub fn execute(self, service: &SearchService) -> CliResult<()> {
        let outcome = service.search(&self.query)?;
        print!("{}", format_outcome(&outcome, self.json)?);
        Ok(())
    }
}

/// Cards for the terminal, or the result list as pretty json.
pub fn format_outcome(outcome: &SearchOutcome, json: bool) -> CliResult<String> {
    if json {
        let mut out = serde_json::to_string_pretty(outcome.results())?;
        out.push('\n');
        return Ok(out);
    }
    Ok(render::cards(outcome))
}

pub fn format_sectors() -> String {
    let mut out = format!("{ANY_SECTOR}\n");
    for sector in Sector::ALL {
        out.push_str(sector.as_str());
        out.push('\n');
    }
    out
}

pub fn format_config(config: &Config) -> CliResult<String> {
    let mut out = format!("# {}\n", config.base_path().join("config.yaml").display());
    out.push_str(&serde_yml::to_string(config).map_err(anyhow::Error::from)?);
    Ok(out)
}
