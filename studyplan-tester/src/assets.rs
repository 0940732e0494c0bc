//! Catalog and status sources for the tester.
//!
//! A bundled UTN Sistemas curriculum and sample student ship with the binary;
//! `--catalog`, `--status` and `--config` override them with JSON files.
use std::fs;
use std::path::{Path, PathBuf};
use studyplan_core::{
    Catalog, CatalogError, CatalogProvider, SimulationConfig, SimulationError, StatusMap,
    StatusStore,
};
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../assets/utn-sistemas.json");
const BUNDLED_STATUS: &str = include_str!("../assets/sample-status.json");
pub const BUNDLED_CAREER: &str = "utn-sistemas";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog")]
    Catalog(#[from] CatalogError),
    #[error("invalid status map")]
    Status(#[source] serde_json::Error),
    #[error("invalid simulation config")]
    Config(#[from] SimulationError),
    #[error("the bundled status map is read-only")]
    ReadOnly,
}

/// JSON files on disk, falling back to the bundled assets.
#[derive(Debug, Clone, Default)]
pub struct JsonAssets {
    catalog_path: Option<PathBuf>,
    status_path: Option<PathBuf>,
}

impl JsonAssets {
    pub const fn new(catalog_path: Option<PathBuf>, status_path: Option<PathBuf>) -> Self {
        Self {
            catalog_path,
            status_path,
        }
    }

    pub fn career_label(&self) -> String {
        self.catalog_path.as_ref().map_or_else(
            || BUNDLED_CAREER.to_string(),
            |path| {
                path.file_stem().map_or_else(
                    || path.display().to_string(),
                    |stem| stem.to_string_lossy().into_owned(),
                )
            },
        )
    }
}

fn read(path: &Path) -> Result<String, AssetError> {
    fs::read_to_string(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl CatalogProvider for JsonAssets {
    type Error = AssetError;

    fn load_catalog(&self, career: &str) -> Result<Catalog, Self::Error> {
        log::debug!("loading catalog for {career}");
        let json = match &self.catalog_path {
            Some(path) => read(path)?,
            None => BUNDLED_CATALOG.to_string(),
        };
        Ok(Catalog::from_json(&json)?)
    }
}

impl StatusStore for JsonAssets {
    type Error = AssetError;

    fn load_status(&self, student: &str) -> Result<StatusMap, Self::Error> {
        log::debug!("loading status for {student}");
        let json = match &self.status_path {
            Some(path) if !path.exists() => return Ok(StatusMap::new()),
            Some(path) => read(path)?,
            None => BUNDLED_STATUS.to_string(),
        };
        StatusMap::from_json(&json).map_err(AssetError::Status)
    }

    fn save_status(&self, _student: &str, status: &StatusMap) -> Result<(), Self::Error> {
        let Some(path) = &self.status_path else {
            return Err(AssetError::ReadOnly);
        };
        let json = serde_json::to_string_pretty(status).map_err(AssetError::Status)?;
        fs::write(path, json).map_err(|source| AssetError::Write {
            path: path.clone(),
            source,
        })
    }
}

/// Load a simulation config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<SimulationConfig, AssetError> {
    match path {
        Some(path) => Ok(SimulationConfig::from_json(&read(path)?)?),
        None => Ok(SimulationConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyplan_core::{StatusValue, Term};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("studyplan-tester-{}-{name}", std::process::id()))
    }

    #[test]
    fn bundled_catalog_is_consistent() {
        let assets = JsonAssets::default();
        let catalog = assets.load_catalog(BUNDLED_CAREER).unwrap();
        assert_eq!(catalog.len(), 36);
        assert!(catalog.warnings().is_empty(), "{:?}", catalog.warnings());
        assert!(catalog.is_acyclic());
        assert_eq!(catalog.get("1").unwrap().term, Term::FullYear);
        assert_eq!(catalog.get("28").unwrap().term, Term::First);
        assert_eq!(catalog.years().len(), 5);
        assert_eq!(assets.career_label(), BUNDLED_CAREER);
    }

    #[test]
    fn bundled_status_parses_aliases() {
        let status = JsonAssets::default().load_status("sample").unwrap();
        assert_eq!(status.get("17"), StatusValue::PendingFinal);
        assert_eq!(status.get("12"), StatusValue::InProgress);
        assert_eq!(status.get("36"), StatusValue::NotStarted);
    }

    #[test]
    fn bundled_status_cannot_be_saved() {
        let err = JsonAssets::default()
            .save_status("sample", &StatusMap::new())
            .unwrap_err();
        assert!(matches!(err, AssetError::ReadOnly));
    }

    #[test]
    fn file_status_roundtrips() {
        let path = temp_path("status.json");
        let _ = fs::remove_file(&path);
        let assets = JsonAssets::new(None, Some(path.clone()));
        assert!(assets.load_status("me").unwrap().is_empty());

        let status: StatusMap = [("1", StatusValue::Approved)].into_iter().collect();
        assets.save_status("me", &status).unwrap();
        assert_eq!(assets.load_status("me").unwrap(), status);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_catalog_file_reports_path() {
        let assets = JsonAssets::new(Some(PathBuf::from("/nonexistent/plan.json")), None);
        let err = assets.load_catalog("plan").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/plan.json"));
        assert_eq!(assets.career_label(), "plan");
    }

    #[test]
    fn config_defaults_without_path() {
        assert_eq!(load_config(None).unwrap(), SimulationConfig::default());
        let path = temp_path("config.json");
        fs::write(&path, r#"{"maxHorizon": 0}"#).unwrap();
        assert!(matches!(load_config(Some(&path)), Err(AssetError::Config(_))));
        fs::remove_file(&path).unwrap();
    }
}
