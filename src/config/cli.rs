use crate::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "taskflow")]
#[command(about = "Todo tracking service with file attachments")]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(long, short, env = "TASKFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override server.port")]
    pub port: Option<u16>,

    #[arg(long, help = "Override logging.level")]
    pub log_level: Option<String>,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[arg(long, help = "Enable debug logging")]
    pub verbose: bool,
}

impl CliArgs {
    /// Flags take precedence over both the file and the environment.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.to_ascii_lowercase();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
    }

    pub fn load_config(&self) -> crate::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        config.apply_env_overrides()?;
        self.apply_to(&mut config);
        Ok(config)
    }
}
