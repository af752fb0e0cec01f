use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub player_name: String,
    pub selected_dates: Vec<String>,
    pub question_count: usize,
    pub round_secs: u32,
    pub countdown_secs: u32,
    pub feedback_delay_ms: u64,
    pub time_up_delay_ms: u64,
    pub skip_delay_ms: u64,
    pub peer_poll_ms: u64,
    pub peer_act_chance: f64,
    pub computer_accuracy: f64,
    pub computer_min_reaction_secs: u32,
    pub computer_max_reaction_secs: u32,
    pub share_base_url: String,
    pub muted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            selected_dates: vec!["Apr. 1".to_string()],
            question_count: 10,
            round_secs: 10,
            countdown_secs: 3,
            feedback_delay_ms: 2000,
            time_up_delay_ms: 1500,
            skip_delay_ms: 500,
            peer_poll_ms: 1000,
            peer_act_chance: 0.3,
            computer_accuracy: 0.8,
            computer_min_reaction_secs: 2,
            computer_max_reaction_secs: 7,
            share_base_url: "https://vocab-duel.app/".to_string(),
            muted: false,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::config_path()
            .unwrap_or_else(|| PathBuf::from("vocab_duel_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("ignoring unreadable config {}: {e}", self.path.display());
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            player_name: "Mei".into(),
            selected_dates: vec!["Apr. 3".into(), "Apr. 7".into()],
            question_count: 5,
            muted: true,
            ..Config::default()
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "player_name": "Kai", "round_secs": 15 }"#).unwrap();

        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.player_name, "Kai");
        assert_eq!(loaded.round_secs, 15);
        assert_eq!(loaded.question_count, 10);
        assert_eq!(loaded.selected_dates, vec!["Apr. 1".to_string()]);
    }

    #[test]
    fn malformed_or_missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());

        fs::write(&path, "not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }
}
