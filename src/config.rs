use crate::error::Error;
use crate::overrides::OverrideTable;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_upstream_url")]
    pub upstream_json_url: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub upstream_timeout: Duration,
    /// Raw override map `domain -> { "A" | "AAAA" -> [address literal] }`.
    /// Address literals are parsed by their own family's parser during
    /// deserialization; [`Config::override_table`] validates the result.
    #[serde(default)]
    pub overrides: HashMap<String, HashMap<String, Vec<IpAddr>>>,
}

// Default upstream matching the original deployment.
fn default_upstream_url() -> String {
    "https://security.cloudflare-dns.com/dns-query".to_string()
}

impl Config {
    /// Load a [`Config`] from the JSON file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the path can't be opened or read, and
    /// [`Error::InvalidJSON`] if the content doesn't deserialize.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        Ok(conf)
    }

    /// Build the validated override table from the raw configuration map.
    ///
    /// # Errors
    ///
    /// See [`OverrideTable::from_entries`].
    pub fn override_table(&self) -> Result<OverrideTable, Error> {
        OverrideTable::from_entries(&self.overrides)
    }
}
