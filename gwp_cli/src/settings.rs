use crate::error::CliError;
use gwp::{self_signed_config, DtlsConfig, ExtendedMasterSecretType, TransportConfig};
use libgwp::{Config, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Contents of the `--config` YAML file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub transport: TransportConfig,
    pub dtls: DtlsSettings,
    /// The configuration values the server hands out in answer to a config poll.
    pub config_values: BTreeMap<String, ConfigValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DtlsSettings {
    /// Names the self-signed certificate is issued for.
    pub server_names: Vec<String>,
    /// Accept any peer certificate. The test gateway needs this to talk to a self-signed server.
    pub insecure_skip_verify: bool,
    pub extended_master_secret: ExtendedMasterSecret,
}

impl Default for DtlsSettings {
    fn default() -> Self {
        Self {
            server_names: vec!["localhost".to_string()],
            insecure_skip_verify: false,
            extended_master_secret: ExtendedMasterSecret::Require,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedMasterSecret {
    Disable,
    Request,
    #[default]
    Require,
}

impl From<ExtendedMasterSecret> for ExtendedMasterSecretType {
    fn from(value: ExtendedMasterSecret) -> Self {
        match value {
            ExtendedMasterSecret::Disable => ExtendedMasterSecretType::Disable,
            ExtendedMasterSecret::Request => ExtendedMasterSecretType::Request,
            ExtendedMasterSecret::Require => ExtendedMasterSecretType::Require,
        }
    }
}

/// A configuration value as written in YAML: a bare integer, float or string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i32),
    Float(f32),
    Text(String),
}

impl From<&ConfigValue> for Value {
    fn from(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Int(v) => Value::from(*v),
            ConfigValue::Float(v) => Value::from(*v),
            ConfigValue::Text(v) => Value::from(v.as_str()),
        }
    }
}

impl Settings {
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let settings = serde_yml::from_reader(reader)?;
        Ok(settings)
    }

    /// Load the settings file if one was given, otherwise use the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self, CliError> {
        match path {
            Some(path) => Self::try_load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_yml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn dtls_config(&self) -> Result<DtlsConfig, CliError> {
        let dtls = &self.dtls;
        let config = self_signed_config(
            dtls.server_names.clone(),
            dtls.extended_master_secret.into(),
            dtls.insecure_skip_verify,
        )?;
        Ok(config)
    }

    /// The configured values, or a small demonstration set when none are configured.
    pub fn config_values(&self) -> BTreeMap<String, ConfigValue> {
        if !self.config_values.is_empty() {
            return self.config_values.clone();
        }
        BTreeMap::from([
            ("foo".to_string(), ConfigValue::Float(23.5)),
            ("bar".to_string(), ConfigValue::Int(12_345_678)),
            ("baz".to_string(), ConfigValue::Text("wohoo".to_string())),
        ])
    }

    /// Answer a config poll for `fields`. No fields means everything.
    pub fn config_for(&self, fields: &[String]) -> Config {
        self.config_values()
            .iter()
            .filter(|(key, _)| fields.is_empty() || fields.contains(*key))
            .fold(Config::default(), |config, (key, value)| config.with(key.as_str(), Value::from(value)))
    }
}
