//! Application configuration. API credentials, batch size, file locations.

use serde::Deserialize;
use std::path::PathBuf;

/// Default pages per batch when neither BATCH_SIZE nor --batch-size is set.
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Azure DevOps organization name. Read from AZURE_DEVOPS_ORG.
    pub azure_devops_org: Option<String>,
    /// Azure DevOps project name. Read from AZURE_DEVOPS_PROJECT.
    pub azure_devops_project: Option<String>,
    /// Personal Access Token with wiki read scope. Read from AZURE_DEVOPS_TOKEN.
    pub azure_devops_token: Option<String>,
    /// Wiki to migrate when the project has several. Read from AZURE_WIKI_NAME.
    #[serde(default)]
    pub azure_wiki_name: Option<String>,

    /// Base URL of the target MediaWiki. Read from MEDIAWIKI_URL.
    pub mediawiki_url: Option<String>,
    /// MediaWiki bot/user account. Read from MEDIAWIKI_USERNAME.
    pub mediawiki_username: Option<String>,
    /// MediaWiki account password. Read from MEDIAWIKI_PASSWORD.
    pub mediawiki_password: Option<String>,

    /// Pages per batch (default 50). Read from BATCH_SIZE.
    #[serde(default)]
    pub batch_size: Option<usize>,

    /// Resume checkpoint path (default .migration_checkpoint.json). Read from CHECKPOINT_FILE.
    #[serde(default)]
    pub checkpoint_file: Option<String>,

    /// Directory for generated reports (default reports). Read from REPORT_DIR.
    #[serde(default)]
    pub report_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::default());
        if let Ok(path) = std::env::var("WIKI_MIGRATE_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // BATCH_SIZE arrives as a string through the environment source; parse explicitly
        if let Ok(s) = std::env::var("BATCH_SIZE") {
            if let Ok(n) = s.parse::<usize>() {
                cfg.batch_size = Some(n);
            }
        }
        Ok(cfg)
    }

    /// Returns pages per batch. Defaults to DEFAULT_BATCH_SIZE if unset or invalid.
    pub fn batch_size_or_default(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Returns the checkpoint file path. Defaults to .migration_checkpoint.json.
    pub fn checkpoint_file_or_default(&self) -> PathBuf {
        PathBuf::from(
            self.checkpoint_file
                .clone()
                .unwrap_or_else(|| ".migration_checkpoint.json".to_string()),
        )
    }

    /// Returns the report directory. Defaults to ./reports.
    pub fn report_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.report_dir.clone().unwrap_or_else(|| "reports".to_string()))
    }

    /// Returns the MediaWiki base URL with any trailing slash trimmed.
    pub fn mediawiki_base_url(&self) -> Option<String> {
        self.mediawiki_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
    }

    /// Names of required Azure DevOps variables that are missing or blank.
    pub fn missing_azure_vars(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.azure_devops_org) {
            missing.push("AZURE_DEVOPS_ORG");
        }
        if is_blank(&self.azure_devops_project) {
            missing.push("AZURE_DEVOPS_PROJECT");
        }
        if is_blank(&self.azure_devops_token) {
            missing.push("AZURE_DEVOPS_TOKEN");
        }
        missing
    }

    /// Names of required MediaWiki variables that are missing or blank.
    pub fn missing_mediawiki_vars(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.mediawiki_url) {
            missing.push("MEDIAWIKI_URL");
        }
        if is_blank(&self.mediawiki_username) {
            missing.push("MEDIAWIKI_USERNAME");
        }
        if is_blank(&self.mediawiki_password) {
            missing.push("MEDIAWIKI_PASSWORD");
        }
        missing
    }

    /// Returns true if the Azure DevOps side is fully configured.
    pub fn is_azure_configured(&self) -> bool {
        self.missing_azure_vars().is_empty()
    }

    /// Returns true if the MediaWiki side is fully configured.
    pub fn is_mediawiki_configured(&self) -> bool {
        self.missing_mediawiki_vars().is_empty()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    !matches!(value.as_deref(), Some(s) if !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vars_listed_together() {
        let cfg = AppConfig {
            azure_devops_org: Some("contoso".to_string()),
            azure_devops_token: Some("   ".to_string()),
            ..Default::default()
        };

        let missing = cfg.missing_azure_vars();
        assert_eq!(missing, vec!["AZURE_DEVOPS_PROJECT", "AZURE_DEVOPS_TOKEN"]);
        assert!(!cfg.is_azure_configured());
    }

    #[test]
    fn test_mediawiki_configured() {
        let cfg = AppConfig {
            mediawiki_url: Some("https://wiki.example.org".to_string()),
            mediawiki_username: Some("migrator".to_string()),
            mediawiki_password: Some("secret".to_string()),
            ..Default::default()
        };

        assert!(cfg.is_mediawiki_configured());
        assert!(cfg.missing_mediawiki_vars().is_empty());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let cfg = AppConfig {
            mediawiki_url: Some("https://wiki.example.org/".to_string()),
            ..Default::default()
        };

        assert_eq!(
            cfg.mediawiki_base_url().as_deref(),
            Some("https://wiki.example.org")
        );
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.batch_size_or_default(), DEFAULT_BATCH_SIZE);
        assert_eq!(
            cfg.checkpoint_file_or_default(),
            PathBuf::from(".migration_checkpoint.json")
        );
        assert_eq!(cfg.report_dir_or_default(), PathBuf::from("reports"));
    }
}
