//! Development shell: serves one guest runtime over WebSocket.
//!
//! Point a guest page's bridge at the printed URL; every message it sends is
//! dispatched as if it came from an embedded web view, and host replies come
//! back as `cobalt.execute(..);` text frames.
//!
//! Usage: cargo run --example dev_shell [--debug] [--port N]

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use anyhow::Context;
use cobalt_bridge::{
    BridgeChannel, BridgeHooks, CallbackId, GuestServer, Host, Screen, ScreenDescriptor,
    ScreenHost, ScreenId, Shell, Transition, UiControls, UiThread,
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const ROUTES: &str = r#"{
    "controllers": {
        "default": { "kind": "Web" },
        "modal": { "kind": "Web", "bars": { "visible": { "top": false } } }
    }
}"#;

// ============================================================================
// Collaborators
// ============================================================================

/// Screen host that only logs.
struct LoggingScreens;

impl ScreenHost for LoggingScreens {
    fn open(&self, screen: &Screen, descriptor: &ScreenDescriptor, transition: Transition) {
        info!(screen = %screen.id, page = %descriptor.page, ?transition, "Open screen");
    }

    fn close(&self, screen: &Screen, transition: Transition) {
        info!(screen = %screen.id, ?transition, "Close screen");
    }

    fn current_page(&self, _screen: ScreenId) -> Option<String> {
        None
    }

    fn knows_kind(&self, kind: &str) -> bool {
        kind == "Web"
    }
}

/// Hooks and UI controls that log.
struct Console;

impl BridgeHooks for Console {
    fn on_ready(&self, channel: &BridgeChannel) {
        info!(version = ?channel.guest_version(), "Guest ready");
    }

    fn on_unhandled_event(
        &self,
        _channel: &BridgeChannel,
        event: &str,
        data: Option<&Value>,
        _callback: Option<&CallbackId>,
    ) -> bool {
        info!(event, ?data, "Guest event");
        true
    }

    fn on_unhandled_message(&self, _channel: &BridgeChannel, message: &Value) {
        info!(%message, "Unhandled message");
    }
}

impl UiControls for Console {
    fn show_toast(&self, text: &str) {
        info!(text, "Toast");
    }
}

// ============================================================================
// Main
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "cobalt_bridge=debug,cobalt::guest=info"
    } else {
        "cobalt_bridge=info,cobalt::guest=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(true)
        .init();
}

fn port_arg(args: &[String]) -> anyhow::Result<u16> {
    match args.iter().position(|a| a == "--port") {
        Some(i) => args
            .get(i + 1)
            .context("--port needs a value")?
            .parse()
            .context("--port must be a number"),
        None => Ok(0),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    init_logging(args.iter().any(|a| a == "--debug"));

    let shell = Shell::builder()
        .routes_json(ROUTES)
        .screen_host(Arc::new(LoggingScreens))
        .executor(Arc::new(UiThread::spawn()))
        .build()?;

    let root = shell.navigation().register_root(None, "index.html")?;
    let channel = shell.open_channel(root);

    let server = GuestServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), port_arg(&args)?).await?;
    println!("Guest URL: {}", server.ws_url());

    let connection = server.accept(channel.clone()).await?;
    let console = Arc::new(Console);
    channel.attach(
        Host::new(connection.sink())
            .with_hooks(console.clone())
            .with_ui(console),
    );
    channel.resume();

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    connection.shutdown();
    shell.close();
    Ok(())
}
