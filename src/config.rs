use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

fn listen() -> String {
    "0.0.0.0:2112".into()
}

fn bpf_object() -> PathBuf {
    "./ebpf/retrans.o".into()
}

#[derive(Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    general: General,
}

#[derive(Deserialize)]
pub struct General {
    #[serde(default = "listen")]
    listen: String,

    // path to the pre-built BPF object carrying the retransmit tracepoint
    // program and the perf event map
    #[serde(default = "bpf_object")]
    bpf_object: PathBuf,
}

impl Default for General {
    fn default() -> Self {
        Self {
            listen: listen(),
            bpf_object: bpf_object(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when no
    /// path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("no config file given, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("unable to open config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        // surface a bad listen address at load time, not at bind time
        config.general.listen()?;

        Ok(config)
    }

    pub fn general(&self) -> &General {
        &self.general
    }
}

impl General {
    pub fn listen(&self) -> Result<SocketAddr> {
        self.listen
            .to_socket_addrs()
            .with_context(|| format!("bad listen address: {}", self.listen))?
            .next()
            .ok_or_else(|| anyhow!("could not resolve listen address: {}", self.listen))
    }

    pub fn bpf_object(&self) -> &Path {
        &self.bpf_object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(
            config.general().listen().unwrap(),
            "0.0.0.0:2112".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            config.general().bpf_object(),
            Path::new("./ebpf/retrans.o")
        );
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [general]
            listen = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.general().listen().unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            config.general().bpf_object(),
            Path::new("./ebpf/retrans.o")
        );
    }
}
