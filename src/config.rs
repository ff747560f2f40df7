//! Project configuration, layered the way the teacher's `config.rs` does:
//! built-in defaults → `.codegraph/config.json` → `CODEGRAPH_`-prefixed
//! environment variables.

use crate::error::{IndexError, IndexResult};
use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DOT_DIR: &str = ".codegraph";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,
    #[serde(default)]
    pub frameworks_hint: Vec<String>,
    #[serde(default = "default_true")]
    pub enable_embeddings: bool,
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_exact_margin")]
    pub auto_pick_exact_margin: f32,
    #[serde(default = "default_fuzzy_margin")]
    pub auto_pick_fuzzy_margin: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            auto_pick_exact_margin: default_exact_margin(),
            auto_pick_fuzzy_margin: default_fuzzy_margin(),
        }
    }
}

fn default_version() -> u32 {
    1
}
fn default_project_name() -> String {
    "project".to_string()
}
fn default_include() -> Vec<String> {
    vec!["**/*".to_string()]
}
fn default_exclude() -> Vec<String> {
    vec![
        "**/.git/**".into(),
        "**/node_modules/**".into(),
        "**/target/**".into(),
        "**/dist/**".into(),
        "**/build/**".into(),
        "**/.codegraph/**".into(),
    ]
}
fn default_max_file_size() -> u64 {
    2 * 1024 * 1024
}
fn default_true() -> bool {
    true
}
fn default_parallel_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}
fn default_exact_margin() -> f32 {
    0.3
}
fn default_fuzzy_margin() -> f32 {
    0.2
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: default_version(),
            project_name: default_project_name(),
            include: default_include(),
            exclude: default_exclude(),
            max_file_size: default_max_file_size(),
            languages: default_languages(),
            frameworks_hint: Vec::new(),
            enable_embeddings: true,
            parallel_workers: default_parallel_workers(),
            search: SearchConfig::default(),
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut m = HashMap::new();
    for (name, exts) in [
        ("rust", vec!["rs"]),
        ("python", vec!["py"]),
        ("javascript", vec!["js", "jsx", "mjs"]),
        ("typescript", vec!["ts", "tsx"]),
        ("go", vec!["go"]),
        ("java", vec!["java"]),
    ] {
        m.insert(
            name.to_string(),
            LanguageConfig { enabled: true, extensions: exts.into_iter().map(String::from).collect() },
        );
    }
    m
}

impl Settings {
    /// Layer defaults, on-disk config, and environment variables.
    pub fn load(project_root: &Path) -> IndexResult<Self> {
        let config_path = project_root.join(DOT_DIR).join(CONFIG_FILE);
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));
        if config_path.exists() {
            figment = figment.merge(Json::file(&config_path));
        }
        figment = figment.merge(
            Env::prefixed("CODEGRAPH_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
        );
        figment
            .extract()
            .map_err(|e| IndexError::ConfigError { reason: e.to_string() })
    }

    /// Walk up from `start` looking for a `.codegraph/` directory.
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut dir = Some(start);
        while let Some(d) = dir {
            if d.join(DOT_DIR).is_dir() {
                return Some(d.to_path_buf());
            }
            dir = d.parent();
        }
        None
    }

    /// Atomic write: temp-file-then-rename, per spec §9.
    pub fn save(&self, project_root: &Path) -> IndexResult<()> {
        let dot_dir = project_root.join(DOT_DIR);
        std::fs::create_dir_all(&dot_dir)
            .map_err(|e| IndexError::FileWrite { path: dot_dir.clone(), source: e })?;
        let final_path = dot_dir.join(CONFIG_FILE);
        let tmp_path = dot_dir.join(format!("{CONFIG_FILE}.tmp.{}", std::process::id()));
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| IndexError::General(format!("serializing config: {e}")))?;
        let write_result = std::fs::write(&tmp_path, contents);
        if let Err(e) = write_result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(IndexError::FileWrite { path: tmp_path, source: e });
        }
        std::fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            IndexError::FileWrite { path: final_path.clone(), source: e }
        })
    }

    pub fn init_config_file(project_root: &Path, force: bool) -> IndexResult<()> {
        let final_path = project_root.join(DOT_DIR).join(CONFIG_FILE);
        if final_path.exists() && !force {
            return Err(IndexError::ConfigError {
                reason: format!("{} already exists; pass --force to overwrite", final_path.display()),
            });
        }
        Settings::default().save(project_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_has_expected_languages() {
        let settings = Settings::default();
        assert!(settings.languages.contains_key("rust"));
        assert_eq!(settings.version, 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.project_name = "demo".into();
        settings.save(dir.path()).unwrap();
        let loaded = Settings::load(dir.path()).unwrap();
        assert_eq!(loaded.project_name, "demo");
    }

    #[test]
    fn init_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        Settings::init_config_file(dir.path(), false).unwrap();
        assert!(Settings::init_config_file(dir.path(), false).is_err());
        assert!(Settings::init_config_file(dir.path(), true).is_ok());
    }

    #[test]
    fn find_project_root_walks_up_ancestors() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(DOT_DIR)).unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(Settings::find_project_root(&nested), Some(dir.path().to_path_buf()));
    }
}
