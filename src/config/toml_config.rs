use crate::core::estimator::{EstimationStrategy, SpendingEstimator, DEFAULT_CEILING};
use crate::domain::model::{DEFAULT_DISPLAY_LIMIT, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{
    validate_base_url, validate_local_path, validate_non_empty_string, validate_nonzero,
    validate_range, PathKind, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub places: PlacesConfig,
    pub expenses: ExpensesConfig,
    pub estimate: EstimateConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub language: String,
    pub connect_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            api_key: None,
            language: "zh-TW".to_string(),
            connect_timeout_seconds: 10,
            read_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpensesConfig {
    pub base_url: String,
    /// 未設定時不查詢 Firestore，只用本地快取的消費欄位
    pub project_id: Option<String>,
    pub collection: String,
}

impl Default for ExpensesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            project_id: None,
            collection: "restaurants".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    pub ceiling: u32,
    pub strategy: EstimationStrategy,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            strategy: EstimationStrategy::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub limit: usize,
    pub window_days: u32,
    /// 相對的快取檔路徑以此目錄為起點
    pub cache_dir: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_DISPLAY_LIMIT,
            window_days: DEFAULT_WINDOW_DAYS,
            cache_dir: ".".to_string(),
        }
    }
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);
        let mut config: Self = toml::from_str(&processed_content)?;
        config.drop_unresolved_secrets();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${GOOGLE_PLACES_API_KEY})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 未被替換的 ${VAR} 不能當成金鑰或專案名稱送出
    fn drop_unresolved_secrets(&mut self) {
        for (field, value) in [
            ("places.api_key", &mut self.places.api_key),
            ("expenses.project_id", &mut self.expenses.project_id),
        ] {
            let unresolved = value
                .as_deref()
                .is_some_and(|v| v.trim().is_empty() || ENV_PLACEHOLDER.is_match(v));
            if unresolved {
                tracing::warn!("{} is not set, ignoring placeholder value", field);
                *value = None;
            }
        }
    }

    pub fn estimator(&self) -> SpendingEstimator {
        SpendingEstimator::new(self.estimate.ceiling, self.estimate.strategy)
    }

    pub fn cache_dir(&self) -> &str {
        &self.display.cache_dir
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_base_url("places.base_url", &self.places.base_url)?;
        validate_non_empty_string("places.language", &self.places.language)?;
        validate_nonzero(
            "places.connect_timeout_seconds",
            self.places.connect_timeout_seconds,
        )?;
        validate_nonzero("places.read_timeout_seconds", self.places.read_timeout_seconds)?;

        validate_base_url("expenses.base_url", &self.expenses.base_url)?;
        validate_non_empty_string("expenses.collection", &self.expenses.collection)?;
        if self.expenses.collection.contains('/') {
            return Err(EngineError::InvalidConfigValue {
                field: "expenses.collection".to_string(),
                value: self.expenses.collection.clone(),
                reason: "Collection id cannot contain '/'".to_string(),
            });
        }

        validate_nonzero("estimate.ceiling", u64::from(self.estimate.ceiling))?;

        validate_nonzero("display.limit", self.display.limit as u64)?;
        validate_range("display.window_days", self.display.window_days, 1, MAX_WINDOW_DAYS)?;
        validate_local_path(
            "display.cache_dir",
            &self.display.cache_dir,
            PathKind::Directory,
        )?;

        Ok(())
    }
}

impl ConfigProvider for EngineConfig {
    fn places_base_url(&self) -> &str {
        &self.places.base_url
    }

    fn places_api_key(&self) -> Option<&str> {
        self.places.api_key.as_deref()
    }

    fn language(&self) -> &str {
        &self.places.language
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.places.connect_timeout_seconds)
    }

    fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.places.read_timeout_seconds)
    }

    fn firestore_base_url(&self) -> &str {
        &self.expenses.base_url
    }

    fn firestore_project(&self) -> Option<&str> {
        self.expenses.project_id.as_deref()
    }

    fn firestore_collection(&self) -> &str {
        &self.expenses.collection
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();

        assert_eq!(config, EngineConfig::default());
        assert_eq!(
            config.places_base_url(),
            "https://maps.googleapis.com/maps/api/place"
        );
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
        assert_eq!(config.firestore_collection(), "restaurants");
        assert_eq!(config.estimator(), SpendingEstimator::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[places]
base_url = "http://127.0.0.1:9000"
api_key = "abc"
language = "en"
read_timeout_seconds = 5

[expenses]
project_id = "java2025"

[estimate]
ceiling = 5000
strategy = "mode"

[display]
limit = 3
window_days = 7
cache_dir = "reviews_data"
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.places_api_key(), Some("abc"));
        assert_eq!(config.language(), "en");
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.firestore_project(), Some("java2025"));
        assert_eq!(config.estimate.strategy, EstimationStrategy::Mode);
        assert_eq!(config.display.limit, 3);
        assert_eq!(config.cache_dir(), "reviews_data");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REVIEW_ENGINE_TEST_KEY", "from-env");

        let toml_content = r#"
[places]
api_key = "${REVIEW_ENGINE_TEST_KEY}"

[expenses]
project_id = "${REVIEW_ENGINE_TEST_UNSET_PROJECT}"
"#;

        let config = EngineConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.places_api_key(), Some("from-env"));
        assert_eq!(config.firestore_project(), None);

        std::env::remove_var("REVIEW_ENGINE_TEST_KEY");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = EngineConfig::from_toml_str("[places]\nbase_url = \"invalid-url\"").unwrap();
        assert!(invalid_url.validate().is_err());

        let zero_limit = EngineConfig::from_toml_str("[display]\nlimit = 0").unwrap();
        assert!(zero_limit.validate().is_err());

        let zero_ceiling = EngineConfig::from_toml_str("[estimate]\nceiling = 0").unwrap();
        assert!(zero_ceiling.validate().is_err());

        let bad_collection =
            EngineConfig::from_toml_str("[expenses]\ncollection = \"a/b\"").unwrap();
        assert!(bad_collection.validate().is_err());
    }

    #[test]
    fn test_unknown_strategy_is_toml_error() {
        let err = EngineConfig::from_toml_str("[estimate]\nstrategy = \"median\"").unwrap_err();
        assert!(matches!(err, EngineError::Toml(_)));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[display]\nwindow_days = 90\n")
            .unwrap();

        let config = EngineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.display.window_days, 90);
    }
}
