//! `google` command

use super::common::{check_date, finish_extraction, OutputArgs};
use crate::adapters::lms::google::{GoogleApi, CLASSROOM_BASE_URL};
use crate::adapters::lms::{
    AuthStrategy, ClientSettings, RequestClient, ServiceAccountAuth, ServiceAccountKey,
};
use crate::config::{secret_string, ToolkitConfig};
use crate::core::extract::{GoogleExtractor, GoogleOptions, RunSummary};
use crate::domain::Result;
use clap::Args;

const PROVIDER: &str = "Google";

/// Arguments for the google command
#[derive(Args, Debug)]
pub struct GoogleArgs {
    /// Classroom API base URL
    #[arg(short, long, env = "CLASSROOM_BASE_URL", default_value = CLASSROOM_BASE_URL)]
    pub base_url: String,

    /// Service-account key file (JSON)
    #[arg(
        long,
        env = "GOOGLE_SERVICE_ACCOUNT_FILE",
        default_value = "service-account.json"
    )]
    pub service_account_file: String,

    /// Domain account the service account acts for
    #[arg(short = 'a', long, env = "CLASSROOM_ACCOUNT")]
    pub classroom_account: Option<String>,

    /// Pre-issued access token; replaces the service-account flow
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// First day of the extraction window (YYYY-MM-DD)
    #[arg(short, long, env = "START_DATE")]
    pub start_date: Option<String>,

    /// Last day of the extraction window (YYYY-MM-DD)
    #[arg(short, long, env = "END_DATE")]
    pub end_date: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl GoogleArgs {
    /// Execute the google command
    pub async fn execute(&self, config: &ToolkitConfig) -> anyhow::Result<i32> {
        tracing::info!(
            base_url = %self.base_url,
            account = self.classroom_account.as_deref().unwrap_or("-"),
            "Starting Google Classroom extraction"
        );
        Ok(finish_extraction(PROVIDER, self.run(config).await))
    }

    fn auth(&self) -> Result<AuthStrategy> {
        if let Some(token) = &self.access_token {
            return Ok(AuthStrategy::Static(secret_string(token.clone())));
        }
        let key = ServiceAccountKey::from_file(&self.service_account_file)?;
        Ok(AuthStrategy::google(ServiceAccountAuth::new(
            key,
            self.classroom_account.clone(),
        )))
    }

    async fn run(&self, config: &ToolkitConfig) -> Result<RunSummary> {
        if let Some(start) = &self.start_date {
            check_date("--start-date", start)?;
        }
        if let Some(end) = &self.end_date {
            check_date("--end-date", end)?;
        }

        let client = RequestClient::new(
            PROVIDER,
            self.base_url.as_str(),
            self.auth()?,
            ClientSettings::from_config(&config.http),
        )?;
        let ctx = self.output.extraction(PROVIDER).await?;

        let options = GoogleOptions {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
        };
        GoogleExtractor::new(GoogleApi::new(client), options)
            .run(ctx)
            .await
    }
}
