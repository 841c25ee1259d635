pub mod config {
    use anyhow::Context;
    use serde::Deserialize;
    use std::fs;
    use std::path::{Path, PathBuf};

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_port")]
        pub port: u16,
        /// Full path of the data file; takes precedence over directory and file name.
        #[serde(default)]
        pub data_path: Option<String>,
        #[serde(default = "default_data_directory")]
        pub data_directory: String,
        #[serde(default = "default_data_file_name")]
        pub data_file_name: String,
        #[serde(default = "default_cors_origins")]
        pub cors_origins: Vec<String>,
        /// Directory receiving the daily rolling log file.
        #[serde(default = "default_log_directory")]
        pub log_directory: String,
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                port: default_port(),
                data_path: None,
                data_directory: default_data_directory(),
                data_file_name: default_data_file_name(),
                cors_origins: default_cors_origins(),
                log_directory: default_log_directory(),
            }
        }
    }

    impl Config {
        /// Loads configuration from `TODOAPI_`-prefixed environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::load(environment())
        }

        fn load(environment: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(environment)
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Path of the JSON data file. Relative paths resolve against the working directory.
        pub fn data_file_path(&self) -> PathBuf {
            match self.data_path.as_deref().map(str::trim) {
                Some(path) if !path.is_empty() => PathBuf::from(path),
                _ => Path::new(&self.data_directory).join(&self.data_file_name),
            }
        }
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("TODOAPI")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("cors_origins")
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_data_directory() -> String {
        "data".to_string()
    }

    fn default_data_file_name() -> String {
        "todos.json".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec![
            "http://localhost:5173".to_string(),
            "http://localhost:3000".to_string(),
            "http://localhost:5174".to_string(),
        ]
    }

    fn default_log_directory() -> String {
        "logs".to_string()
    }

    /// Creates the directory holding `data_file` and proves it accepts writes
    /// by writing and removing a probe file.
    pub fn ensure_writable(data_file: &Path) -> anyhow::Result<()> {
        let directory = match data_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory).with_context(|| {
            format!("Cannot create data directory '{}'", directory.display())
        })?;

        let probe = directory.join(format!("write-test-{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&probe, "test")
            .and_then(|_| fs::remove_file(&probe))
            .with_context(|| {
                format!("Data directory '{}' is not writable", directory.display())
            })?;
        tracing::debug!("Data directory {} is writable", directory.display());
        Ok(())
    }

}
pub mod health;
pub mod logging;
pub mod todo;
pub mod web;
