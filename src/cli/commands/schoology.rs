//! `schoology` command

use super::common::{finish_extraction, OutputArgs};
use crate::adapters::lms::schoology::SchoologyApi;
use crate::adapters::lms::{AuthStrategy, ClientSettings, RequestBudget, RequestClient};
use crate::config::{secret_string, ToolkitConfig};
use crate::core::extract::{RunSummary, SchoologyExtractor};
use crate::domain::Result;
use clap::Args;

const PROVIDER: &str = "Schoology";

/// Arguments for the schoology command
#[derive(Args, Debug)]
pub struct SchoologyArgs {
    /// Schoology API base URL
    #[arg(
        short,
        long,
        env = "SCHOOLOGY_BASE_URL",
        default_value = "https://api.schoology.com/v1"
    )]
    pub base_url: String,

    /// OAuth consumer key
    #[arg(short = 'k', long, env = "SCHOOLOGY_KEY")]
    pub client_key: String,

    /// OAuth consumer secret
    #[arg(long, env = "SCHOOLOGY_SECRET", hide_env_values = true)]
    pub client_secret: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl SchoologyArgs {
    /// Execute the schoology command
    pub async fn execute(&self, config: &ToolkitConfig) -> anyhow::Result<i32> {
        tracing::info!(
            base_url = %self.base_url,
            rate_limit_requests = config.schoology.rate_limit_requests,
            rate_limit_period_seconds = config.schoology.rate_limit_period_seconds,
            "Starting Schoology extraction"
        );
        Ok(finish_extraction(PROVIDER, self.run(config).await))
    }

    async fn run(&self, config: &ToolkitConfig) -> Result<RunSummary> {
        let client = RequestClient::new(
            PROVIDER,
            self.base_url.as_str(),
            AuthStrategy::oauth1(
                self.client_key.as_str(),
                secret_string(self.client_secret.clone()),
            ),
            ClientSettings::from_config(&config.http),
        )?
        .with_budget(RequestBudget::from_config(&config.schoology));
        let ctx = self.output.extraction(PROVIDER).await?;

        SchoologyExtractor::new(SchoologyApi::new(client))
            .run(ctx)
            .await
    }
}
