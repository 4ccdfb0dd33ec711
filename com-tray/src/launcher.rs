//! Terminal emulator launching

use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;

use crate::settings::Settings;

/// Placeholder replaced by the port name
pub const PORT_PLACEHOLDER: &str = "::port::";
/// Placeholder replaced by the baud rate
pub const BAUD_PLACEHOLDER: &str = "::baud::";

/// Errors launching a terminal
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The requested terminal alias is not configured
    #[error("no terminal named '{0}' is configured")]
    UnknownTerminal(String),

    /// The terminal process could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Substitute the port and baud placeholders in an argument string
pub fn parse_arg_string(port: &str, baud: u32, template: &str) -> String {
    template
        .replace(PORT_PLACEHOLDER, port)
        .replace(BAUD_PLACEHOLDER, &baud.to_string())
}

/// A fully resolved terminal command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Build a command from an argument template
    ///
    /// The template is split on whitespace before substitution, so a port
    /// name containing spaces stays a single argument.
    pub fn from_template(program: &str, template: &str, port: &str, baud: u32) -> Self {
        Self {
            program: program.to_string(),
            args: template
                .split_whitespace()
                .map(|arg| parse_arg_string(port, baud, arg))
                .collect(),
        }
    }

    /// Resolve the terminal configured for `port`
    pub fn for_port(settings: &Settings, port: &str) -> Result<Self, LaunchError> {
        let alias = settings.port_terminal(port);
        let app = settings
            .apps
            .get(alias)
            .ok_or_else(|| LaunchError::UnknownTerminal(alias.to_string()))?;
        Ok(Self::from_template(
            &app.path,
            &app.arguments,
            port,
            settings.port_baud(port),
        ))
    }

    /// Start the terminal without waiting for it, returning its pid
    pub fn spawn(&self) -> Result<u32, LaunchError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        info!("Launched {} {} (pid {})", self.program, self.args.join(" "), child.id());
        Ok(child.id())
    }
}
