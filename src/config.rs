use serde::{Deserialize, Serialize};

use std::{collections::HashMap, env, fs, path::Path};

pub const DEFAULT_SUBJECT: &str = "AI Generated Email";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Name of the deployment; selects the origin allow-list in `cors`.
    #[serde(default = "default_environment")]
    pub environment: String,
    pub completion: CompletionConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub cors: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_relay")]
    pub relay: String,
    pub username: String,
    pub password: String,
    /// Falls back to `username` when absent.
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default = "default_subject")]
    pub default_subject: String,
}

impl Config {
    /// Origins allowed for the active environment, without trailing slashes.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors
            .get(&self.environment)
            .map(|origins| {
                origins
                    .iter()
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl MailConfig {
    pub fn sender(&self) -> &str {
        self.sender.as_deref().unwrap_or(&self.username)
    }
}

fn default_port() -> u16 {
    5001
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama3-70b-8192".to_string()
}

fn default_relay() -> String {
    "smtp.gmail.com".to_string()
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_dev_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
    ]
}

/// Flat view of the process environment, matched by `envy` on lowercased names.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    groq_api_key: String,
    email_user: String,
    email_pass: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_environment")]
    app_env: String,
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
    #[serde(default = "default_base_url")]
    completion_base_url: String,
    #[serde(default = "default_model")]
    completion_model: String,
    #[serde(default = "default_relay")]
    smtp_relay: String,
}

impl From<EnvConfig> for Config {
    fn from(env_cfg: EnvConfig) -> Self {
        let origins = env_cfg.allowed_origins.unwrap_or_else(|| {
            if env_cfg.app_env == "development" {
                default_dev_origins()
            } else {
                Vec::new()
            }
        });

        let mut cors = HashMap::new();
        cors.insert(env_cfg.app_env.clone(), origins);

        Self {
            port: env_cfg.port,
            environment: env_cfg.app_env,
            completion: CompletionConfig {
                api_key: env_cfg.groq_api_key,
                base_url: env_cfg.completion_base_url,
                model: env_cfg.completion_model,
            },
            mail: MailConfig {
                relay: env_cfg.smtp_relay,
                username: env_cfg.email_user,
                password: env_cfg.email_pass,
                sender: None,
                default_subject: default_subject(),
            },
            cors,
        }
    }
}

fn load_from_env() -> Result<Config, envy::Error> {
    envy::from_env::<EnvConfig>().map(Config::from)
}

fn load_from_file(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&contents)?;

    // APP_ENV overrides the file so one file can serve every deployment
    if let Ok(environment) = env::var("APP_ENV") {
        config.environment = environment;
    }

    Ok(config)
}

const CONFIG_ENV: &str = "AI_EMAIL_CONFIG";
const LOCAL_CONFIG: &str = "config.yaml";
const EXAMPLE_CONFIG: &str = "config.example.yaml";

/// Files tried in order: the one named by `AI_EMAIL_CONFIG`, then the local
/// and example files in the working directory.
fn config_candidates(requested: Option<&str>) -> Vec<&str> {
    let mut candidates: Vec<&str> = requested.into_iter().collect();
    for path in [LOCAL_CONFIG, EXAMPLE_CONFIG] {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let requested = env::var(CONFIG_ENV).ok();
    let candidates = config_candidates(requested.as_deref());

    if let Some(path) = requested.as_deref().filter(|p| !Path::new(p).exists()) {
        tracing::warn!("{CONFIG_ENV} names '{path}', which does not exist");
    }

    if let Some(path) = candidates.iter().copied().find(|p| Path::new(p).exists()) {
        if path == EXAMPLE_CONFIG {
            tracing::warn!(
                "Reading placeholder settings from '{path}'; \
                 copy it to '{LOCAL_CONFIG}' and fill in real credentials before sending mail"
            );
        } else {
            tracing::info!("Reading settings from '{path}'");
        }
        return load_from_file(path);
    }

    tracing::info!("No settings file present, reading GROQ_API_KEY, EMAIL_USER and EMAIL_PASS");
    load_from_env().map_err(|e| {
        format!(
            "cannot configure the email backend: none of {candidates:?} exists \
             and the environment lacks required keys ({e})"
        )
        .into()
    })
}
