//! perun-rpc-call: perform one Perun RPC call and print the result.
//!
//! ```text
//! perun-rpc-call --rpc-url https://perun.example.org/krb/rpc/json/ \
//!     --recover --param id=42 usersManager/getUserById
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::Value;
use tracing::info;

use perun_rpc_client::{CallOutcome, ClientConfig, ClientFactory, RequestClient};
use perun_rpc_telemetry::{init_tracing, TelemetryConfig};

/// Perform a single Perun RPC call
#[derive(Parser, Debug)]
#[command(name = "perun-rpc-call", version)]
#[command(about = "Call a Perun RPC method and print the JSON result")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RPC URL prefix, overrides the config file and PERUN_RPC_URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Keep waiting by polling when a proxy cuts the call off
    #[arg(long)]
    recover: bool,

    /// Call parameter as key=value; the value is read as JSON if it parses
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Method path, e.g. usersManager/getUserById
    path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    init_tracing(&TelemetryConfig::for_service("perun-rpc-call"))?;

    let config = load_config(&args)?;
    let factory = ClientFactory::from_config(config).context("invalid configuration")?;

    let mut client = if args.recover {
        factory.client_with_recovery()
    } else {
        factory.client()
    };
    for param in &args.params {
        let (name, value) = parse_param(param)?;
        put_param(&mut client, name, value)?;
    }

    let handle = client.dispatch(&args.path);
    let cancel = handle.cancel_handle();

    let outcome = tokio::select! {
        outcome = handle.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            info!("Interrupted, call abandoned");
            CallOutcome::Abandoned
        }
    };

    match outcome {
        CallOutcome::Finished(value) => {
            let value = value.unwrap_or(Value::Null);
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        CallOutcome::Failed(error) => {
            eprintln!("{}", error);
            eprintln!("{}", serde_json::to_string_pretty(&error)?);
            Ok(ExitCode::FAILURE)
        }
        CallOutcome::Abandoned => Ok(ExitCode::from(130)),
    }
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => ClientConfig::default(),
    };

    let mut config = config.apply_env_overrides();
    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.clone();
    }
    Ok(config)
}

/// Split `key=value`, reading the value as JSON when possible
fn parse_param(param: &str) -> anyhow::Result<(&str, Value)> {
    let Some((name, raw)) = param.split_once('=') else {
        bail!("parameter '{}' is not in key=value form", param);
    };
    if name.is_empty() {
        bail!("parameter '{}' has an empty name", param);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name, value))
}

fn put_param(client: &mut RequestClient, name: &str, value: Value) -> anyhow::Result<()> {
    match value {
        Value::Bool(flag) => client.put(name, flag)?,
        Value::String(text) => client.put(name, text)?,
        Value::Number(number) if number.is_i64() => {
            client.put(name, number.as_i64().unwrap_or_default())?
        }
        other => client.put_struct(name, &other)?,
    };
    Ok(())
}
