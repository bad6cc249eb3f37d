// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Furnace hooks CLI
//!
//! Calls, dispatches and serves stack lifecycle hook plugins.
//!
//! Exit status is 2 when a pre hook vetoed the operation.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use furnace_plugins::hooks::{
    from_fn, DispatchReport, EndpointConfig, FailurePolicy, HookClient, HookKind, HookKindId,
    HookOutcome, LifecycleHook, LifecycleHooks, LoggingHook, PluginsConfig, PostCreate,
    PostDelete, PreCreate, PreDelete,
};
use furnace_plugins::{parse_listen_addr, PluginServer};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VETO_EXIT_CODE: i32 = 2;

#[derive(Parser)]
#[command(name = "furnace-hooks")]
#[command(about = "Furnace - stack lifecycle hook plugins", long_about = None)]
struct Cli {
    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call one hook on a plugin endpoint
    Invoke {
        /// Plugin endpoint, e.g. http://127.0.0.1:50051
        #[arg(long)]
        endpoint: String,

        /// Hook kind
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Treat a failed call as a veto
        #[arg(long)]
        fail_closed: bool,

        /// Report a failed call as an error instead of applying the failure policy
        #[arg(long)]
        strict: bool,

        /// Connect and request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Stack name
        stack: String,
    },

    /// Run every configured plugin of a kind
    Dispatch {
        /// Hook configuration file (TOML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Hook kind
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Stack name
        stack: String,
    },

    /// Serve a reference plugin implementing all four hooks
    Serve {
        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:50051")]
        listen: String,

        /// Stack name to veto in PreCreate and PreDelete (repeatable)
        #[arg(long = "deny")]
        deny: Vec<String>,
    },

    /// Print the effective hook configuration
    Config {
        /// Hook configuration file (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    PreCreate,
    PostCreate,
    PreDelete,
    PostDelete,
}

impl From<KindArg> for HookKindId {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::PreCreate => HookKindId::PreCreate,
            KindArg::PostCreate => HookKindId::PostCreate,
            KindArg::PreDelete => HookKindId::PreDelete,
            KindArg::PostDelete => HookKindId::PostDelete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "furnace_plugins=debug,furnace_hooks=debug"
    } else {
        "furnace_plugins=info,furnace_hooks=info"
    };
    // Logs go to stderr so that --json output stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Invoke {
            endpoint,
            kind,
            fail_closed,
            strict,
            timeout_ms,
            stack,
        } => {
            let mut endpoint = EndpointConfig::new(endpoint);
            if let Some(ms) = timeout_ms {
                endpoint = endpoint
                    .with_connect_timeout(Duration::from_millis(ms))
                    .with_request_timeout(Duration::from_millis(ms));
            }
            let policy = if fail_closed {
                FailurePolicy::FailClosed
            } else {
                FailurePolicy::FailOpen
            };

            let vetoed = match kind {
                KindArg::PreCreate => invoke::<PreCreate>(&endpoint, policy, strict, &stack).await?,
                KindArg::PostCreate => {
                    invoke::<PostCreate>(&endpoint, policy, strict, &stack).await?
                }
                KindArg::PreDelete => invoke::<PreDelete>(&endpoint, policy, strict, &stack).await?,
                KindArg::PostDelete => {
                    invoke::<PostDelete>(&endpoint, policy, strict, &stack).await?
                }
            };

            let kind = HookKindId::from(kind);
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "kind": kind.as_str(),
                        "stack": stack,
                        "abort": vetoed,
                    })
                );
            } else if kind.is_pre() {
                println!(
                    "{} {}: {}",
                    kind,
                    stack,
                    if vetoed { "abort" } else { "proceed" }
                );
            } else {
                println!("{} {}: done", kind, stack);
            }

            if vetoed {
                std::process::exit(VETO_EXIT_CODE);
            }
        }

        Commands::Dispatch {
            config: config_path,
            kind,
            stack,
        } => {
            let config = PluginsConfig::load(Some(config_path.clone())).with_context(|| {
                format!("Failed to load hook configuration from {}", config_path.display())
            })?;
            let hooks = LifecycleHooks::from_config(&config)?;

            let report = match kind {
                KindArg::PreCreate => hooks.pre_create.dispatch(&stack).await,
                KindArg::PostCreate => hooks.post_create.dispatch(&stack).await,
                KindArg::PreDelete => hooks.pre_delete.dispatch(&stack).await,
                KindArg::PostDelete => hooks.post_delete.dispatch(&stack).await,
            };

            print_report(&report, cli.json);

            if report.aborted() {
                std::process::exit(VETO_EXIT_CODE);
            }
        }

        Commands::Serve { listen, deny } => {
            let addr = parse_listen_addr(&listen)?;
            let denied: Arc<HashSet<String>> = Arc::new(deny.into_iter().collect());
            if denied.is_empty() {
                warn!("No --deny names given, pre hooks will approve every stack");
            }

            let create_denied = Arc::clone(&denied);
            let delete_denied = Arc::clone(&denied);
            let server = PluginServer::new()
                .with_hook::<PreCreate, _>(from_fn::<PreCreate, _>("deny-list", move |stack| {
                    let veto = create_denied.contains(stack);
                    info!(stack = %stack, veto, "PreCreate decision");
                    veto
                }))?
                .with_hook::<PostCreate, _>(LoggingHook::new("audit-log"))?
                .with_hook::<PreDelete, _>(from_fn::<PreDelete, _>("deny-list", move |stack| {
                    let veto = delete_denied.contains(stack);
                    info!(stack = %stack, veto, "PreDelete decision");
                    veto
                }))?
                .with_hook::<PostDelete, _>(LoggingHook::new("audit-log"))?;

            info!(%addr, denied = denied.len(), "Serving reference hook plugin");
            server.serve_with_shutdown(addr, shutdown_signal()).await?;
        }

        Commands::Config { config } => {
            let config = PluginsConfig::load(config).context("Failed to load hook configuration")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Call one hook and return whether it vetoed.
async fn invoke<K: HookKind>(
    endpoint: &EndpointConfig,
    policy: FailurePolicy,
    strict: bool,
    stack: &str,
) -> Result<bool> {
    let client = HookClient::<K>::connect_lazy(endpoint)
        .with_context(|| format!("Invalid plugin endpoint: {}", endpoint.uri))?
        .with_policy(policy);

    let outcome = if strict {
        client.try_execute(stack).await.map_err(|status| {
            anyhow!(
                "{} call to {} failed: {:?}: {}",
                K::NAME,
                endpoint.uri,
                status.code(),
                status.message()
            )
        })?
    } else {
        client.execute(stack).await
    };
    Ok(outcome.vetoes())
}

fn print_report(report: &DispatchReport, as_json: bool) {
    if as_json {
        let invocations: Vec<_> = report
            .invocations
            .iter()
            .map(|i| {
                json!({
                    "hook": i.hook_id,
                    "veto": i.vetoed,
                    "execution_time_us": i.execution_time_us,
                })
            })
            .collect();
        println!(
            "{}",
            json!({
                "kind": report.kind,
                "stack": report.stack,
                "abort": report.aborted(),
                "vetoed_by": report.vetoed_by,
                "invocations": invocations,
                "total_time_us": report.total_time_us,
            })
        );
        return;
    }

    println!("{} {}", report.kind, report.stack);
    if report.invocations.is_empty() {
        println!("  (no plugins configured)");
    }
    for invocation in &report.invocations {
        println!(
            "  {:<24} {:<8} {}us",
            invocation.hook_id,
            if invocation.vetoed { "veto" } else { "ok" },
            invocation.execution_time_us
        );
    }
    match &report.vetoed_by {
        Some(hook) => println!("Result: abort (vetoed by {})", hook),
        None => println!("Result: proceed"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_requires_config() {
        let missing = Cli::try_parse_from(["furnace-hooks", "dispatch", "--kind", "pre-create", "s"]);
        assert!(missing.is_err());

        let cli = Cli::try_parse_from([
            "furnace-hooks",
            "dispatch",
            "--config",
            "hooks.toml",
            "--kind",
            "pre-create",
            "prod-stack-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Dispatch { config, stack, .. } => {
                assert_eq!(config, PathBuf::from("hooks.toml"));
                assert_eq!(stack, "prod-stack-1");
            }
            _ => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_missing_config_file_fails_dispatch() {
        let result = PluginsConfig::load(Some(PathBuf::from("/nonexistent/typo.toml")));
        assert!(result.is_err());
    }
}
