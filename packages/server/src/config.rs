//! Command line and server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use arscene_runtime::{RuntimeConfig, Tag};
use clap::Parser;

use crate::codec::WireFormat;
use crate::connection::ConnectionConfig;
use crate::error::ServerError;

/// arscene - serve live Lua-driven AR scenes over a websocket
#[derive(Parser, Debug)]
#[command(name = "arscene")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Directory of programs (*.lua) with shared libraries under lib/
    #[arg(long, default_value = "programs")]
    pub programs: PathBuf,

    /// Milliseconds between simulation ticks
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// Milliseconds between broadcasts to each client
    #[arg(long, default_value_t = 100)]
    pub broadcast_ms: u64,

    /// Wire format for frames and instance state (msgpack, bincode or json)
    #[arg(long, default_value = "msgpack")]
    pub format: WireFormat,

    /// Create an instance at startup and bind it to a tag, e.g. 0=tictactoe
    #[arg(long = "spawn", value_name = "TAG=PROGRAM")]
    pub spawn: Vec<Spawn>,
}

/// An instance to create at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spawn {
    pub tag: Tag,
    pub program: String,
}

impl FromStr for Spawn {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, program) = s
            .split_once('=')
            .ok_or_else(|| ServerError::Config(format!("expected TAG=PROGRAM, got {:?}", s)))?;
        let tag = tag
            .trim()
            .parse::<Tag>()
            .map_err(|e| ServerError::Config(format!("bad tag in {:?}: {}", s, e)))?;
        let program = program.trim();
        if program.is_empty() {
            return Err(ServerError::Config(format!("missing program in {:?}", s)));
        }
        Ok(Spawn {
            tag,
            program: program.to_string(),
        })
    }
}

/// Everything the server needs once arguments are parsed.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub programs: PathBuf,
    pub runtime: RuntimeConfig,
    pub connection: ConnectionConfig,
    pub spawn: Vec<Spawn>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            programs: PathBuf::from("programs"),
            runtime: RuntimeConfig::default(),
            connection: ConnectionConfig::default(),
            spawn: Vec::new(),
        }
    }
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            bind: cli.bind,
            programs: cli.programs,
            runtime: RuntimeConfig {
                tick_interval: Duration::from_millis(cli.tick_ms.max(1)),
                ..RuntimeConfig::default()
            },
            connection: ConnectionConfig {
                format: cli.format,
                broadcast_interval: Duration::from_millis(cli.broadcast_ms.max(1)),
            },
            spawn: cli.spawn,
        }
    }
}
