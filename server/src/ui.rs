//! Embedded UI shell.

use taskboard_proxy::RemoteClient;
use taskboard_types::Mode;

use crate::health::VERSION;

const INDEX_HTML: &str = include_str!("assets/index.html");

/// Render the shell. In ui-proxy mode the peer's health is fetched first; a failed
/// check renders a degraded banner, never an error page.
pub async fn render(mode: Mode, peer: Option<&RemoteClient>) -> String {
    let banner = match peer {
        None => String::new(),
        Some(peer) => match peer.health().await {
            Ok(health) => format!(
                r#"<div class="banner">Connected to API at {} ({}, mode {}, v{})</div>"#,
                escape(peer.base_url()),
                escape(&health.hostname),
                escape(&health.mode),
                escape(&health.version),
            ),
            Err(err) => {
                tracing::warn!(peer = peer.base_url(), error = %err, "Peer health check failed");
                format!(
                    r#"<div class="banner degraded">API at {} is unavailable: {}</div>"#,
                    escape(peer.base_url()),
                    escape(&err.to_string()),
                )
            }
        },
    };
    fill(mode, &banner)
}

fn fill(mode: Mode, banner: &str) -> String {
    INDEX_HTML
        .replace("{{MODE}}", mode.as_str())
        .replace("{{VERSION}}", VERSION)
        .replace("{{PEER_BANNER}}", banner)
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
