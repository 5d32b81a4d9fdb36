//! `canvas` command

use super::common::{check_date, finish_extraction, OutputArgs};
use crate::adapters::lms::canvas::CanvasApi;
use crate::adapters::lms::{AuthStrategy, ClientSettings, RequestClient};
use crate::config::{secret_string, ToolkitConfig};
use crate::core::extract::{CanvasExtractor, CanvasOptions, RunSummary};
use crate::domain::Result;
use clap::Args;

const PROVIDER: &str = "Canvas";

/// Arguments for the canvas command
#[derive(Args, Debug)]
pub struct CanvasArgs {
    /// Canvas base URL, e.g. https://canvas.example.edu
    #[arg(short, long, env = "CANVAS_BASE_URL")]
    pub base_url: String,

    /// API access token
    #[arg(short, long, env = "CANVAS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// First day of the extraction window (YYYY-MM-DD)
    #[arg(short, long, env = "START_DATE")]
    pub start_date: String,

    /// Last day of the extraction window (YYYY-MM-DD)
    #[arg(short, long, env = "END_DATE")]
    pub end_date: String,

    /// Fetch courses, sections, users and enrollments through GraphQL
    #[arg(long, env = "CANVAS_USE_GRAPHQL")]
    pub use_graphql: bool,

    /// Root account for the GraphQL path
    #[arg(long, env = "CANVAS_ACCOUNT_ID", default_value = "1")]
    pub account_id: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl CanvasArgs {
    /// Execute the canvas command
    pub async fn execute(&self, config: &ToolkitConfig) -> anyhow::Result<i32> {
        tracing::info!(base_url = %self.base_url, graphql = self.use_graphql, "Starting Canvas extraction");
        Ok(finish_extraction(PROVIDER, self.run(config).await))
    }

    async fn run(&self, config: &ToolkitConfig) -> Result<RunSummary> {
        check_date("--start-date", &self.start_date)?;
        check_date("--end-date", &self.end_date)?;

        let client = RequestClient::new(
            PROVIDER,
            self.base_url.as_str(),
            AuthStrategy::bearer(secret_string(self.access_token.clone())),
            ClientSettings::from_config(&config.http),
        )?;
        let ctx = self.output.extraction(PROVIDER).await?;

        let options = CanvasOptions {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            use_graphql: self.use_graphql,
            account_id: self.account_id.clone(),
        };
        CanvasExtractor::new(CanvasApi::new(client), options)
            .run(ctx)
            .await
    }
}
