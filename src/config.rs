use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use url::Url;

pub const KEYRING_SERVICE: &str = "bstash-api-key";
pub const KEYRING_USER: &str = "Buildstash";

pub const DEFAULT_BUILDSTASH_BASE_URL: &str = "https://app.buildstash.com";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    pub default_stream: Option<String>,
    pub buildstash_base_url: Option<Url>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    default_stream: Option<String>,
    buildstash_base_url: Option<Url>,
    buildstash_api_key: Option<String>,
}

pub struct Config {
    pub default_stream: Option<String>,
    pub buildstash_base_url: Url,
    pub buildstash_api_key: String,
}

fn merge_config(base: ConfigFile, override_config: ConfigEnv) -> Result<Config> {
    let default_stream = override_config.default_stream.or(base.default_stream);

    let buildstash_base_url = override_config
        .buildstash_base_url
        .or(base.buildstash_base_url)
        .unwrap_or_else(|| {
            Url::parse(DEFAULT_BUILDSTASH_BASE_URL).expect("default base URL is valid")
        });

    let buildstash_api_key = if let Some(api_key) = override_config.buildstash_api_key {
        api_key
    } else {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        let api_key = entry
            .get_secret()
            .context("API key not specified via environment variable nor present in OS keyring")?;
        String::from_utf8(api_key)?
    };

    Ok(Config {
        default_stream,
        buildstash_base_url,
        buildstash_api_key,
    })
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    let env_config = envy::from_env::<ConfigEnv>().unwrap_or_default();

    let file_config = if let Ok(config) = fs::read_to_string(config_file_path()?) {
        toml::from_str(&config)?
    } else {
        ConfigFile::default()
    };

    merge_config(file_config, env_config)
}

pub fn write_config(config: ConfigFile) -> Result<()> {
    let path = config_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(&config)?)?;
    Ok(())
}

fn config_file_path() -> Result<std::path::PathBuf> {
    let project_dirs = directories::ProjectDirs::from("com", "buildstash", "bstash")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    Ok(project_dirs.config_dir().join("config.toml"))
}

pub fn set_api_key_keyring(api_key: String) -> Result<()> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
    entry.set_secret(api_key.as_bytes())?;
    println!("API key set for use with bstash");
    Ok(())
}
