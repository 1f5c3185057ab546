//! Command implementations

pub mod optimize;
pub mod template;
pub mod test_prompt;

use std::sync::Arc;

use spo_engine::SpoConfig;
use spo_llm::{CompletionClient, OpenAiCompatibleClient, ScriptedClient};

use crate::error::CliResult;

/// Live provider client, or an offline echo client for dry runs.
pub(crate) fn completion_client(
    config: &SpoConfig,
    dry_run: bool,
) -> CliResult<Arc<dyn CompletionClient>> {
    if dry_run {
        tracing::info!("Dry run: completions are echoed locally");
        return Ok(Arc::new(ScriptedClient::echo()));
    }

    let client = OpenAiCompatibleClient::new(&config.provider)?;
    tracing::debug!(endpoint = client.endpoint(), "Using provider");
    Ok(Arc::new(client))
}
