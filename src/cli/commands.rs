//! Topology subcommand handlers

use anyhow::{Context, Result};
use clap::Args;
use std::io::Read;

use crate::config::{Config, LayoutConfig};
use crate::connection::{ConnectionEvent, ConnectionManager, FileTransport};
use crate::graph::{NamespaceSelection, NodeQuery};
use crate::layout::{LayoutDirection, LayoutEngine};
use crate::models::ResourceKind;
use crate::session::{SessionStatus, TopologySession};
use crate::view::{NamespaceSummary, RenderModel};

/// View options shared by `render` and `replay`
#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Namespace to show, or "all" (defaults to config defaultNamespace)
    #[arg(short = 'n', long)]
    pub namespace: Option<String>,

    /// Rank direction: TB or LR
    #[arg(long)]
    pub direction: Option<LayoutDirection>,

    /// Layout engine: layered or radial
    #[arg(long)]
    pub engine: Option<LayoutEngine>,

    /// Only nodes whose name or id contains this text
    #[arg(long)]
    pub search: Option<String>,

    /// Only nodes of this kind (repeatable)
    #[arg(long = "kind")]
    pub kinds: Vec<ResourceKind>,

    /// Only nodes carrying this key=value label (repeatable)
    #[arg(long = "label", value_parser = NodeQuery::parse_label)]
    pub labels: Vec<(String, String)>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl ViewArgs {
    fn query(&self) -> NodeQuery {
        NodeQuery {
            text: self.search.clone(),
            kinds: self.kinds.iter().copied().collect(),
            labels: self.labels.clone(),
        }
    }

    /// Session configured from `config`, with command-line overrides applied
    pub fn session(&self, config: &Config) -> TopologySession {
        let layout = LayoutConfig {
            engine: self.engine.unwrap_or(config.layout.engine),
            direction: self.direction.unwrap_or(config.layout.direction),
            ..config.layout.clone()
        };
        let selection = match &self.namespace {
            Some(ns) => ns.parse::<NamespaceSelection>().unwrap_or_default(),
            None => config.default_namespace.clone(),
        };

        let mut session = TopologySession::new(layout.strategy())
            .with_ingest_policy(config.ingest.policy())
            .with_direction(layout.direction)
            .with_selection(selection);
        session.set_query(self.query());
        session
    }

    fn to_json(&self, model: &RenderModel) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(model)
        } else {
            serde_json::to_string(model)
        };
        json.context("Failed to serialize render model")
    }
}

/// Read a whole payload from a file, or stdin for `-`
pub fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))
    }
}

/// `render`: one payload in, one render model out
pub fn handle_render(input: &str, args: &ViewArgs, config: &Config) -> Result<()> {
    let raw = read_input(input)?;
    let mut session = args.session(config);
    session
        .ingest(&raw)
        .with_context(|| format!("Failed to ingest {}", input))?;

    let json = args.to_json(session.render())?;
    println!("{}", json);
    Ok(())
}

/// `namespaces`: print the namespace index
pub fn handle_namespaces(input: &str, config: &Config) -> Result<()> {
    let raw = read_input(input)?;
    let snapshot = crate::ingest::ingest_with_policy(&raw, &config.ingest.policy())
        .with_context(|| format!("Failed to ingest {}", input))?;

    let index = NamespaceSummary::index(&snapshot);
    let width = index.iter().map(|ns| ns.id.len()).max().unwrap_or(0).max(9);
    println!("{:<width$}  {:>5}  {:>4}  NAME", "NAMESPACE", "NODES", "PODS");
    for ns in index {
        println!(
            "{:<width$}  {:>5}  {:>4}  {}",
            ns.id, ns.node_count, ns.pod_count, ns.name
        );
    }
    Ok(())
}

/// `replay`: stream a newline-delimited file through the connection manager
pub async fn handle_replay(input: &str, args: &ViewArgs, config: &Config) -> Result<()> {
    let transport = FileTransport::from_arg(input);
    let endpoint = transport.endpoint()?;
    let (mut manager, mut events) =
        ConnectionManager::new(transport, endpoint, config.reconnect.policy());
    let mut session = args.session(config);

    manager.connect();
    loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => replay_event(&mut session, event, args)?,
            _ = manager.wait() => break,
            _ = tokio::signal::ctrl_c() => {
                manager.disconnect();
                break;
            }
        }
    }
    while let Ok(event) = events.try_recv() {
        replay_event(&mut session, event, args)?;
    }

    tracing::info!("Replay finished with status {}", session.status());
    match session.status() {
        SessionStatus::Failed(reason) => Err(anyhow::anyhow!("Replay failed: {}", reason)),
        _ => Ok(()),
    }
}

fn replay_event(
    session: &mut TopologySession,
    event: ConnectionEvent,
    args: &ViewArgs,
) -> Result<()> {
    match &event {
        ConnectionEvent::Reconnecting {
            attempt,
            max_attempts,
        } => eprintln!("reconnecting ({}/{})", attempt, max_attempts),
        ConnectionEvent::Error(e) => eprintln!("connection: {}", e),
        _ => {}
    }

    let is_message = matches!(event, ConnectionEvent::Message(_));
    if session.apply(event) {
        let json = args.to_json(session.render())?;
        println!("{}", json);
    } else if is_message {
        if let Some(notice) = session.notice() {
            eprintln!("skipped message: {}", notice);
        }
        session.dismiss_notice();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{"namespaces": {"web": {"nodes": [{"id": "pod", "type": "pod"}]}}}"#;

    #[test]
    fn test_session_uses_configured_engine() {
        let mut config = Config::default();
        config.layout.engine = LayoutEngine::Radial;

        let mut session = ViewArgs::default().session(&config);
        session.ingest(PAYLOAD).unwrap();
        let model = session.render();
        // Radial puts the first member straight above its root
        assert!(model.node("pod").unwrap().position.y < model.node("web").unwrap().position.y);
    }

    #[test]
    fn test_engine_flag_overrides_config() {
        let mut config = Config::default();
        config.layout.engine = LayoutEngine::Radial;
        let args = ViewArgs {
            engine: Some(LayoutEngine::Layered),
            namespace: Some("web".to_string()),
            ..ViewArgs::default()
        };

        let mut session = args.session(&config);
        assert_eq!(session.selection(), &NamespaceSelection::namespace("web"));
        session.ingest(PAYLOAD).unwrap();
        let model = session.render();
        assert!(model.node("web").unwrap().position.y < model.node("pod").unwrap().position.y);
    }
}
