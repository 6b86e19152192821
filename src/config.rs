use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::models::{DeviceKey, TemperatureUnit};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "rtl_433/+/events";
const CONFIG_FILE_NAME: &str = "omni00.toml";

/// Monitor Omni multisensor reports published by rtl_433 over MQTT
#[derive(Debug, Default, Parser)]
#[command(name = "omni00", version, long_about = None)]
pub struct Args {
    /// MQTT hostname to connect to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// MQTT port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// rtl_433 MQTT event topic to subscribe to
    #[arg(short = 'T', long)]
    pub topic: Option<String>,

    /// Broker as a URL, e.g. mqtt://pi4.local:1883
    #[arg(short = 'U', long)]
    pub url: Option<String>,

    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Display temperatures in Celsius
    #[arg(short = 'C', long, conflicts_with = "fahrenheit")]
    pub celsius: bool,

    /// Display temperatures in Fahrenheit
    #[arg(short = 'F', long)]
    pub fahrenheit: bool,

    /// MQTT username, if the broker needs one
    #[arg(short, long, env = "OMNI_MQTT_USERNAME")]
    pub username: Option<String>,

    /// MQTT password, if the broker needs one
    #[arg(short, long, env = "OMNI_MQTT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log actions and messages while running
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    topic: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LocaleSection {
    celsius: Option<bool>,
}

/// Layout of `omni00.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    server: ServerSection,
    locale: LocaleSection,
    aliases: HashMap<String, String>,
}

impl FileConfig {
    pub fn from_toml_str(contents: &str, path: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|source| Error::ConfigFile {
            path: path.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }
}

/// Device key to location label mapping, case-insensitive on the key
#[derive(Debug, Clone, Default)]
pub struct Aliases(HashMap<String, String>);

impl Aliases {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Aliases(
            entries
                .into_iter()
                .map(|(key, label)| (key.trim().to_lowercase(), label.trim().to_string()))
                .filter(|(key, label)| !key.is_empty() && !label.is_empty())
                .collect(),
        )
    }

    /// Location label for `key`, or the key itself when no alias exists
    pub fn resolve(&self, key: &DeviceKey) -> String {
        self.0
            .get(&key.as_str().to_lowercase())
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub unit: TemperatureUnit,
    pub aliases: Aliases,
    pub debug: bool,
}

/// Parse the command line, with `.env` loaded first so credentials can come from it
pub fn parse_args() -> Args {
    dotenv::dotenv().ok();
    Args::parse()
}

impl MonitorConfig {
    /// Build the configuration from the config file and the command line
    pub fn load(args: Args) -> Result<Self> {
        let file = match find_config_file(args.config.as_deref())? {
            Some(path) => {
                info!("Reading configuration from {}", path.display());
                FileConfig::load(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                FileConfig::default()
            }
        };

        Self::resolve(args, file)
    }

    /// Layer defaults, file values and command-line values, later wins
    pub fn resolve(args: Args, file: FileConfig) -> Result<Self> {
        let mut host = file.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let mut port = file.server.port.unwrap_or(DEFAULT_PORT);

        if let Some(url) = &args.url {
            let (url_host, url_port) = parse_broker_url(url)?;
            host = url_host;
            port = url_port;
        }
        if let Some(h) = args.host {
            host = h;
        }
        if let Some(p) = args.port {
            port = p;
        }

        let topic = args
            .topic
            .or(file.server.topic)
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let username = args.username.or(file.server.username).filter(|u| !u.is_empty());
        let password = args.password.or(file.server.password).filter(|p| !p.is_empty());

        let unit = if args.fahrenheit {
            TemperatureUnit::Fahrenheit
        } else if args.celsius {
            TemperatureUnit::Celsius
        } else {
            match file.locale.celsius {
                Some(false) => TemperatureUnit::Fahrenheit,
                _ => TemperatureUnit::Celsius,
            }
        };

        let config = MonitorConfig {
            host,
            port,
            topic,
            username,
            password,
            unit,
            aliases: Aliases::new(file.aliases),
            debug: args.debug,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("MQTT host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("MQTT port must be greater than 0".into()));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::Config("MQTT topic must not be empty".into()));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(Error::Config("MQTT password given without a username".into()));
        }
        Ok(())
    }
}

/// Locate the config file. An explicit path must exist; otherwise the
/// working directory and then the home directory are searched.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::Config(format!(
            "Configuration file {} not found",
            path.display()
        )));
    }

    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Ok(home) = env::var("HOME") {
        let home = PathBuf::from(home);
        candidates.push(home.join(".config").join(CONFIG_FILE_NAME));
        candidates.push(home.join(CONFIG_FILE_NAME));
    }

    Ok(candidates.into_iter().find(|p| p.is_file()))
}

/// Split an `mqtt://host:port` URL into host and port
pub fn parse_broker_url(raw: &str) -> Result<(String, u16)> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Invalid MQTT URL {}: {}", raw, e)))?;

    if !matches!(url.scheme(), "mqtt" | "tcp") {
        return Err(Error::Config(format!(
            "Invalid MQTT URL {}: scheme must be mqtt:// or tcp://",
            raw
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::Config(format!("Invalid MQTT URL {}: missing host", raw)))?;

    Ok((host.to_string(), url.port().unwrap_or(DEFAULT_PORT)))
}
