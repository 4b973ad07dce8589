use crate::config::toml_config::EngineConfig;
use crate::core::estimator::EstimationStrategy;
use crate::domain::model::AggregationRequest;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{validate_local_path, PathKind, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "review-engine")]
#[command(about = "Aggregate recent reviews and estimate spending for a place")]
pub struct CliConfig {
    #[arg(long, help = "Places API place id")]
    pub place_id: Option<String>,

    #[arg(long, help = "Place name to search when no place id is known")]
    pub name: Option<String>,

    #[arg(long, help = "Local review snapshot (JSON)")]
    pub cache_file: Option<String>,

    #[arg(long, help = "Only keep reviews from the last N days [default: 30]")]
    pub window_days: Option<u32>,

    #[arg(long, help = "Maximum number of reviews to show [default: 10]")]
    pub limit: Option<usize>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_PLACES_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "FIRESTORE_PROJECT_ID")]
    pub firestore_project: Option<String>,

    #[arg(long, value_enum)]
    pub strategy: Option<EstimationStrategy>,

    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 載入設定檔（若有指定），再以命令列參數覆寫
    pub fn load_engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📄 Loading configuration from {}", path.display());
                EngineConfig::from_file(path)?
            }
            None => EngineConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            config.places.api_key = Some(key.clone());
        }
        if let Some(project) = self.firestore_project.as_ref().filter(|p| !p.trim().is_empty()) {
            config.expenses.project_id = Some(project.clone());
        }
        if let Some(strategy) = self.strategy {
            config.estimate.strategy = strategy;
        }
        if let Some(days) = self.window_days {
            config.display.window_days = days;
        }
        if let Some(limit) = self.limit {
            config.display.limit = limit;
        }
    }

    pub fn request(&self, config: &EngineConfig) -> AggregationRequest {
        AggregationRequest {
            place_id: self.place_id.clone(),
            display_name: self.name.clone(),
            window_days: config.display.window_days,
            local_cache_path: self.cache_file.clone(),
            display_limit: config.display.limit,
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let has_target = [&self.place_id, &self.name, &self.cache_file]
            .iter()
            .any(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()));
        if !has_target {
            return Err(EngineError::Config {
                message: "one of --place-id, --name or --cache-file is required".to_string(),
            });
        }

        if let Some(path) = &self.cache_file {
            validate_local_path("cache_file", path, PathKind::File)?;
        }
        Ok(())
    }
}
