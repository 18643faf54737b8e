use std::path::PathBuf;

use clap::Parser;

/// Runtime settings for a storage server.
///
/// A storage node listens on two ports: clients use the client port for
/// size/read/write, the naming server uses the command port for
/// create/delete/copy. Both ports serve the same routes. The node also
/// needs to know where the naming server's registration port is and what
/// address to advertise for itself.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Port serving client byte operations.
    pub client_port: u16,
    /// Port serving naming-server commands.
    pub command_port: u16,
    /// Host the naming server runs on.
    pub naming_host: String,
    /// The naming server's registration port.
    pub naming_port: u16,
    /// Address this node reports as its own during registration.
    pub advertise_ip: String,
    /// Directory all stored files live under.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            client_port: 7000,
            command_port: 7001,
            naming_host: "127.0.0.1".to_string(),
            naming_port: 8090,
            advertise_ip: "127.0.0.1".to_string(),
            root: PathBuf::from("./atlasfs-data"),
        }
    }
}

impl StorageConfig {
    pub fn with_client_port(mut self, port: u16) -> Self {
        self.client_port = port;
        self
    }

    pub fn with_command_port(mut self, port: u16) -> Self {
        self.command_port = port;
        self
    }

    pub fn with_naming_host(mut self, host: impl Into<String>) -> Self {
        self.naming_host = host.into();
        self
    }

    pub fn with_naming_port(mut self, port: u16) -> Self {
        self.naming_port = port;
        self
    }

    pub fn with_advertise_ip(mut self, ip: impl Into<String>) -> Self {
        self.advertise_ip = ip.into();
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Endpoint registrations are POSTed to.
    pub fn registration_url(&self) -> String {
        format!("http://{}:{}/register", self.naming_host, self.naming_port)
    }
}

#[derive(Parser)]
#[command(name = "atlasfs-storage", about = "AtlasFS storage server")]
pub struct Cli {
    /// Port for client byte operations
    #[arg(long, default_value_t = 7000)]
    pub client_port: u16,
    /// Port for naming-server commands
    #[arg(long, default_value_t = 7001)]
    pub command_port: u16,
    /// Naming server host
    #[arg(long, default_value = "127.0.0.1")]
    pub naming_host: String,
    /// Naming server registration port
    #[arg(long, default_value_t = 8090)]
    pub naming_port: u16,
    /// IP address to advertise to the naming server
    #[arg(long, default_value = "127.0.0.1")]
    pub advertise_ip: String,
    /// Directory to store files under
    #[arg(long, default_value = "./atlasfs-data")]
    pub root: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig::default()
            .with_client_port(self.client_port)
            .with_command_port(self.command_port)
            .with_naming_host(self.naming_host.clone())
            .with_naming_port(self.naming_port)
            .with_advertise_ip(self.advertise_ip.clone())
            .with_root(self.root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = StorageConfig::default();
        assert_eq!(config.client_port, 7000);
        assert_eq!(config.command_port, 7001);
        assert_eq!(config.naming_port, 8090);
    }

    #[test]
    fn test_registration_url() {
        let config = StorageConfig::default()
            .with_naming_host("10.0.0.9")
            .with_naming_port(8091);
        assert_eq!(config.registration_url(), "http://10.0.0.9:8091/register");
    }
}
