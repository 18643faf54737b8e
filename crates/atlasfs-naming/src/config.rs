use clap::Parser;

/// Runtime settings for the naming server.
///
/// The server listens on two ports: clients use the service port for
/// namespace operations, storage nodes use the registration port to
/// announce themselves. Both ports serve the same routes.
#[derive(Debug, Clone)]
pub struct NamingConfig {
    /// Port serving client namespace operations.
    pub service_port: u16,
    /// Port accepting storage node registrations.
    pub registration_port: u16,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            service_port: 8080,
            registration_port: 8090,
        }
    }
}

impl NamingConfig {
    pub fn with_service_port(mut self, port: u16) -> Self {
        self.service_port = port;
        self
    }

    pub fn with_registration_port(mut self, port: u16) -> Self {
        self.registration_port = port;
        self
    }
}

#[derive(Parser)]
#[command(name = "atlasfs-naming", about = "AtlasFS naming server")]
pub struct Cli {
    /// Port for client namespace operations
    #[arg(long, default_value_t = 8080)]
    pub service_port: u16,
    /// Port for storage node registration
    #[arg(long, default_value_t = 8090)]
    pub registration_port: u16,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn naming_config(&self) -> NamingConfig {
        NamingConfig::default()
            .with_service_port(self.service_port)
            .with_registration_port(self.registration_port)
    }
}
