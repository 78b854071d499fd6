use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::client::Credentials;
use crate::error::{Result, SyncError};

pub const LOCAL_CONFIG_FILE: &str = "ado-sync.toml";
const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct Config {
    /// Project name used in tags; defaults to the ADO project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub ado: AdoSection,
    #[serde(default)]
    pub figma: FigmaSection,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct AdoSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct FigmaSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,
}

impl Config {
    /// Load from `explicit`, else `./ado-sync.toml`, else the user config
    /// file. No file at all yields an empty config.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let local = PathBuf::from(LOCAL_CONFIG_FILE);
                if local.exists() {
                    local
                } else {
                    Self::config_path()?
                }
            }
        };

        if !path.exists() {
            if explicit.is_some() {
                return Err(SyncError::FileNotFound(path));
            }
            return Ok(Config::default());
        }

        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SyncError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| SyncError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the config to `path`, creating missing parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let save_error = |source| SyncError::ConfigSave {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(save_error)?;
        }

        let contents = toml::to_string(self)?;
        std::fs::write(path, contents).map_err(save_error)
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "ado-sync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(SyncError::NoConfigDir)
    }

    /// ADO credentials with env vars taking precedence over the config file.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    fn credentials_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let pick = |var: &str, file: &Option<String>| {
            env(var)
                .or_else(|| file.clone())
                .filter(|value| !value.trim().is_empty())
        };

        let organization = pick("ADO_ORGANIZATION", &self.ado.organization);
        let project = pick("ADO_PROJECT", &self.ado.project);
        let pat = pick("ADO_PAT", &self.ado.pat);

        match (organization, project, pat) {
            (Some(organization), Some(project), Some(pat)) => {
                Ok(Credentials::new(organization, project, pat))
            }
            (organization, project, pat) => {
                let missing = [
                    ("organization", organization.is_none()),
                    ("project", project.is_none()),
                    ("pat", pat.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(SyncError::MissingCredentials { missing })
            }
        }
    }

    pub fn figma_pat(&self) -> Result<String> {
        std::env::var("FIGMA_PAT")
            .ok()
            .or_else(|| self.figma.pat.clone())
            .filter(|pat| !pat.trim().is_empty())
            .ok_or(SyncError::MissingFigmaToken)
    }

    /// Name used in tags: explicit argument, then `name`, then the ADO project.
    pub fn project_name(&self, explicit: Option<&str>, ado_project: Option<&str>) -> Option<String> {
        explicit
            .or(self.name.as_deref())
            .or(ado_project)
            .map(String::from)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_parse_full_file() {
        let config = parse(
            r#"
            name = "Web Shop"
            output_dir = "out"

            [ado]
            organization = "contoso"
            project = "Shop"
            pat = "secret"

            [figma]
            pat = "figd_x"
            "#,
        );

        let creds = config.credentials_with(|_| None).unwrap();
        assert_eq!(creds.organization, "contoso");
        assert_eq!(config.output_dir(), PathBuf::from("out"));
        assert_eq!(config.project_name(None, Some(&creds.project)).as_deref(), Some("Web Shop"));
        assert_eq!(config.project_name(Some("Other"), None).as_deref(), Some("Other"));
        assert_eq!(Config::default().project_name(None, Some("Shop")).as_deref(), Some("Shop"));
    }

    #[test]
    fn test_missing_settings_are_named() {
        let config = parse("[ado]\norganization = \"contoso\"\n");
        match config.credentials_with(|_| None) {
            Err(SyncError::MissingCredentials { missing }) => {
                assert_eq!(missing, vec!["project", "pat"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_env_takes_precedence() {
        let config = parse("[ado]\norganization = \"file-org\"\nproject = \"P\"\npat = \"file-pat\"\n");
        let creds = config
            .credentials_with(|key| (key == "ADO_ORGANIZATION").then(|| "env-org".to_string()))
            .unwrap();
        assert_eq!(creds.organization, "env-org");
        assert_eq!(creds.project, "P");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output_dir(), PathBuf::from("output"));
        assert!(config.credentials_with(|_| None).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(Config::load(Some(path.as_path())), Err(SyncError::FileNotFound(_))));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.ado.project = Some("Shop".into());

        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.ado.project.as_deref(), Some("Shop"));
    }

    #[test]
    fn test_save_failure_is_a_save_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let err = Config::default()
            .save(&blocker.join("config.toml"))
            .unwrap_err();
        assert!(matches!(err, SyncError::ConfigSave { .. }));
        assert!(err.to_string().starts_with("Failed to save config file at"));
    }

    #[test]
    fn test_serializes_without_empty_keys() {
        let mut config = Config::default();
        config.ado.organization = Some("contoso".into());
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("[ado]"));
        assert!(text.contains("organization = \"contoso\""));
        assert!(!text.contains("pat"));
    }
}
