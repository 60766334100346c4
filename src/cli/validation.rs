use std::net::SocketAddr;

use crate::cli::errors::{CliError, CliResult};

/// Longest description accepted from the command line
const MAX_TEXT_LENGTH: usize = 2000;

/// Validates the free-text description
pub fn validate_search_text(text: &str) -> CliResult<()> {
    if text.trim().is_empty() {
        return Err(CliError::validation("text", "Search text cannot be empty"));
    }

    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(CliError::validation(
            "text",
            format!("Search text cannot exceed {MAX_TEXT_LENGTH} characters"),
        ));
    }

    Ok(())
}

/// Validates a listen address like `127.0.0.1:8080`
pub fn validate_listen_addr(addr: &str) -> CliResult<()> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| CliError::validation("addr", format!("'{addr}' is not a valid HOST:PORT")))
}
