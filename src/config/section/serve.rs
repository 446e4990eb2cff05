//! `[serve]` section configuration.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # 0.0.0.0 to expose on the LAN
//! port = 5277
//! watch = true                # rebuild on component changes
//! targeted = true             # regenerate only affected documents when possible
//! timeout_secs = 120          # bound for one regenerate or bundle call
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub interface: IpAddr,
    pub port: u16,
    pub watch: bool,
    pub targeted: bool,
    pub timeout_secs: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
            watch: true,
            targeted: true,
            timeout_secs: 120,
        }
    }
}

impl ServeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.timeout_secs == 0 {
            diag.error("serve.timeout_secs", "must be greater than zero");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn serve_config() {
        let config = test_parse_config(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nwatch = false\ntargeted = false\ntimeout_secs = 5",
        );
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.serve.port, 8080);
        assert!(!config.serve.watch);
        assert!(!config.serve.targeted);
        assert_eq!(config.serve.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn serve_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.serve.port, 5277);
        assert!(config.serve.watch);
        assert!(config.serve.targeted);
        assert_eq!(config.serve.timeout_secs, 120);
    }
}
