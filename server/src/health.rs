//! Health report and host identity.

use std::sync::OnceLock;

use chrono::Utc;
use taskboard_types::{HealthReport, format_timestamp};

use crate::compose::Composition;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[must_use]
pub fn report(composition: &Composition) -> HealthReport {
    HealthReport {
        status: "healthy".to_string(),
        timestamp: format_timestamp(Utc::now()),
        hostname: hostname().to_string(),
        version: VERSION.to_string(),
        mode: composition.mode.as_str().to_string(),
        database_type: composition.items.database_type().to_string(),
        api_base_url: composition.items.api_base_url().to_string(),
    }
}

/// Host name, resolved once per process.
pub fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        system_hostname()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    })
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is writable for buf.len() bytes; gethostname NUL-terminates on success
    // when the name fits, and we cap the read at the buffer length either way.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..end].to_vec()).ok()
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}
