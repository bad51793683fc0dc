use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ccplane", about = "Configuration control plane operator CLI", version)]
pub struct Cli {
    /// Base URL of a running control plane server. Required for every
    /// command except `serve`.
    #[arg(long, env = "CCPLANE_URL", global = true, default_value = "http://localhost:8080")]
    pub url: String,

    /// Bearer token for the server's `Authorization` header.
    #[arg(long, env = "CCPLANE_TOKEN", global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the control plane HTTP server in this process.
    Serve {
        /// Address to bind the HTTP listener to.
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,

        /// Port to bind the HTTP listener to.
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Postgres connection string. Omit to run against an in-memory,
        /// ephemeral store (local development and tests).
        #[arg(long, env = "CCPLANE_DATABASE_URL")]
        database_url: Option<String>,

        /// Path to a YAML settings file (spec.md §4.1–4.6 tunables). Falls
        /// back to defaults plus `CCPLANE_*` env overrides when omitted.
        #[arg(long)]
        config: Option<std::path::PathBuf>,

        /// Bearer token callers must present. Generated and printed once
        /// if omitted.
        #[arg(long, env = "CCPLANE_TOKEN")]
        bearer_token: Option<String>,
    },

    /// Trigger an admin refresh for a destination (`serviceId:instanceId`,
    /// `serviceId:*`, or `*:*`).
    Refresh {
        destination: String,
    },

    /// Invalidate one named cache, or every cache when omitted.
    CacheClear {
        #[arg(long)]
        cache_name: Option<String>,
    },

    /// Print current drift statistics.
    DriftStats,

    /// Send a single test heartbeat.
    Heartbeat {
        #[arg(long)]
        service_name: String,

        #[arg(long)]
        instance_id: String,

        #[arg(long)]
        config_hash: String,

        #[arg(long)]
        environment: String,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        version: Option<String>,

        /// Repeatable `key=value` metadata entries.
        #[arg(long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected `key=value`, got `{s}`")),
    }
}
