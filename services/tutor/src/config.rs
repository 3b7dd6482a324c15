use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the language model is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelSource {
    /// Download (or reuse the cache of) a Hugging Face Hub repository.
    Hub { model_id: String, revision: String },
    /// A directory holding `config.json`, `model.safetensors` and `tokenizer.json`.
    Local(PathBuf),
}

/// Defines the supported speech output backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SpeechBackend {
    /// `say` on macOS, `espeak-ng`/`espeak` elsewhere.
    Auto,
    Espeak,
    Say,
    /// Print only.
    Silent,
}

impl FromStr for SpeechBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            "say" => Ok(Self::Say),
            "silent" | "none" => Ok(Self::Silent),
            other => Err(format!("unknown speech backend '{other}'")),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub model: ModelSource,
    pub speech_backend: SpeechBackend,
    /// Speaking rate in words per minute.
    pub speech_rate: u32,
    /// Fixed sampler seed; random when unset.
    pub seed: Option<u64>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let model = match std::env::var("TUTOR_MODEL_DIR") {
            Ok(dir) if !dir.trim().is_empty() => ModelSource::Local(PathBuf::from(dir)),
            _ => ModelSource::Hub {
                model_id: std::env::var("TUTOR_MODEL_ID").unwrap_or_else(|_| "gpt2".to_string()),
                revision: std::env::var("TUTOR_MODEL_REVISION")
                    .unwrap_or_else(|_| "main".to_string()),
            },
        };

        let backend_str =
            std::env::var("TUTOR_SPEECH_BACKEND").unwrap_or_else(|_| "auto".to_string());
        let speech_backend = backend_str
            .parse::<SpeechBackend>()
            .map_err(|e| ConfigError::InvalidValue("TUTOR_SPEECH_BACKEND".to_string(), e))?;

        let speech_rate = match std::env::var("TUTOR_SPEECH_RATE") {
            Ok(rate_str) => parse_rate(&rate_str).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TUTOR_SPEECH_RATE".to_string(),
                    format!("'{}' is not a positive integer", rate_str),
                )
            })?,
            Err(_) => tutor_core::speech::DEFAULT_RATE,
        };

        let seed = match std::env::var("TUTOR_SEED") {
            Ok(seed_str) => Some(seed_str.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("TUTOR_SEED".to_string(), e.to_string())
            })?),
            Err(_) => None,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            model,
            speech_backend,
            speech_rate,
            seed,
            log_level,
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn apply(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.model_dir {
            self.model = ModelSource::Local(dir.clone());
        }
        if let Some(backend) = cli.speech {
            self.speech_backend = backend;
        }
        if let Some(rate) = cli.rate {
            self.speech_rate = rate;
        }
        if let Some(seed) = cli.seed {
            self.seed = Some(seed);
        }
    }
}

fn parse_rate(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok().filter(|rate| *rate > 0)
}

/// Command-line overrides. Every flag is optional; with none given the
/// environment (or its defaults) decides.
#[derive(Parser, Debug, Default)]
#[command(name = "tutor", version, about = "A spoken AI teaching assistant")]
pub struct Cli {
    /// Load the model from this directory instead of the Hub
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Speech output backend
    #[arg(long, value_enum)]
    pub speech: Option<SpeechBackend>,

    /// Speaking rate in words per minute
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate: Option<u32>,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("TUTOR_MODEL_DIR");
            env::remove_var("TUTOR_MODEL_ID");
            env::remove_var("TUTOR_MODEL_REVISION");
            env::remove_var("TUTOR_SPEECH_BACKEND");
            env::remove_var("TUTOR_SPEECH_RATE");
            env::remove_var("TUTOR_SEED");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    fn test_speech_backend_from_str() {
        assert_eq!("auto".parse::<SpeechBackend>(), Ok(SpeechBackend::Auto));
        assert_eq!("eSpeak-NG".parse::<SpeechBackend>(), Ok(SpeechBackend::Espeak));
        assert_eq!("say".parse::<SpeechBackend>(), Ok(SpeechBackend::Say));
        assert_eq!("none".parse::<SpeechBackend>(), Ok(SpeechBackend::Silent));
        assert!("festival".parse::<SpeechBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(
            config.model,
            ModelSource::Hub {
                model_id: "gpt2".to_string(),
                revision: "main".to_string(),
            }
        );
        assert_eq!(config.speech_backend, SpeechBackend::Auto);
        assert_eq!(config.speech_rate, 150);
        assert_eq!(config.seed, None);
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("TUTOR_MODEL_ID", "distilgpt2");
            env::set_var("TUTOR_MODEL_REVISION", "v1");
            env::set_var("TUTOR_SPEECH_BACKEND", "silent");
            env::set_var("TUTOR_SPEECH_RATE", "180");
            env::set_var("TUTOR_SEED", "42");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(
            config.model,
            ModelSource::Hub {
                model_id: "distilgpt2".to_string(),
                revision: "v1".to_string(),
            }
        );
        assert_eq!(config.speech_backend, SpeechBackend::Silent);
        assert_eq!(config.speech_rate, 180);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_model_dir_takes_precedence() {
        clear_env_vars();
        unsafe {
            env::set_var("TUTOR_MODEL_DIR", "/models/gpt2");
            env::set_var("TUTOR_MODEL_ID", "ignored");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.model, ModelSource::Local(PathBuf::from("/models/gpt2")));
    }

    #[test]
    #[serial]
    fn test_config_invalid_speech_rate() {
        for bad in ["fast", "0", "-3"] {
            clear_env_vars();
            unsafe {
                env::set_var("TUTOR_SPEECH_RATE", bad);
            }

            let err = Config::from_env().unwrap_err();
            let ConfigError::InvalidValue(var, _) = err;
            assert_eq!(var, "TUTOR_SPEECH_RATE");
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_backend() {
        clear_env_vars();
        unsafe {
            env::set_var("TUTOR_SPEECH_BACKEND", "festival");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, msg) = err;
        assert_eq!(var, "TUTOR_SPEECH_BACKEND");
        assert!(msg.contains("festival"));
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        let ConfigError::InvalidValue(var, _) = err;
        assert_eq!(var, "RUST_LOG");
    }

    #[test]
    #[serial]
    fn test_cli_overrides_environment() {
        clear_env_vars();
        unsafe {
            env::set_var("TUTOR_SPEECH_RATE", "120");
        }
        let mut config = Config::from_env().expect("Config should load successfully");

        let cli = Cli::parse_from([
            "tutor",
            "--model-dir",
            "./weights",
            "--speech",
            "silent",
            "--rate",
            "200",
            "--seed",
            "7",
        ]);
        config.apply(&cli);

        assert_eq!(config.model, ModelSource::Local(PathBuf::from("./weights")));
        assert_eq!(config.speech_backend, SpeechBackend::Silent);
        assert_eq!(config.speech_rate, 200);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_empty_cli_changes_nothing() {
        let cli = Cli::parse_from(["tutor"]);
        assert!(cli.model_dir.is_none());
        assert!(cli.speech.is_none());
        assert!(cli.rate.is_none());
        assert!(cli.seed.is_none());
    }

    #[test]
    fn test_cli_rejects_zero_rate() {
        assert!(Cli::try_parse_from(["tutor", "--rate", "0"]).is_err());
    }
}
