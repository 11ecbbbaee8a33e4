//! Static route table.
//!
//! The table for a mode is built once at startup. Routes a mode does not serve
//! are simply absent, so they resolve like any unknown path.

use hyper::Method;
use taskboard_types::{ItemId, Mode};

/// What a matched route does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ui,
    List,
    Create,
    Delete,
    SetStatus,
    Resolve,
    Unresolve,
    SetPosition,
    Reorder,
    Health,
    Metrics,
}

impl Operation {
    /// Operations fulfilled by the items capability (local store or peer).
    #[must_use]
    pub const fn is_item_operation(self) -> bool {
        !matches!(self, Operation::Ui | Operation::Health | Operation::Metrics)
    }
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    pattern: &'static str,
    operation: Operation,
}

/// Outcome of resolving one request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched {
        operation: Operation,
        id: Option<ItemId>,
    },
    /// The path exists but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

fn item_routes() -> [Route; 8] {
    [
        route(Method::GET, "/api/items", Operation::List),
        route(Method::POST, "/api/items", Operation::Create),
        route(Method::POST, "/api/items/reorder", Operation::Reorder),
        route(Method::DELETE, "/api/items/:id", Operation::Delete),
        route(Method::POST, "/api/items/:id/status", Operation::SetStatus),
        route(Method::POST, "/api/items/:id/resolve", Operation::Resolve),
        route(Method::POST, "/api/items/:id/unresolve", Operation::Unresolve),
        route(Method::POST, "/api/items/:id/position", Operation::SetPosition),
    ]
}

impl RouteTable {
    /// Routes served on the main port for `mode`.
    ///
    /// `/metrics` is included only when it has no port of its own.
    #[must_use]
    pub fn for_mode(mode: Mode, metrics_on_main_port: bool) -> Self {
        let mut routes = Vec::with_capacity(11);
        if mode.serves_ui() {
            routes.push(route(Method::GET, "/", Operation::Ui));
        }
        routes.extend(item_routes());
        routes.push(route(Method::GET, "/health", Operation::Health));
        if metrics_on_main_port {
            routes.push(route(Method::GET, "/metrics", Operation::Metrics));
        }
        Self { routes }
    }

    /// The dedicated scrape listener serves `/metrics` and nothing else.
    #[must_use]
    pub fn metrics_only() -> Self {
        Self {
            routes: vec![route(Method::GET, "/metrics", Operation::Metrics)],
        }
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let path = path.split('?').next().unwrap_or(path);
        let mut allowed = Vec::new();
        for route in &self.routes {
            let Some(id) = match_pattern(route.pattern, path) else {
                continue;
            };
            if route.method == *method {
                return Resolution::Matched {
                    operation: route.operation,
                    id,
                };
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }
        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    #[must_use]
    pub fn serves(&self, operation: Operation) -> bool {
        self.routes.iter().any(|r| r.operation == operation)
    }
}

fn route(method: Method, pattern: &'static str, operation: Operation) -> Route {
    Route {
        method,
        pattern,
        operation,
    }
}

/// `Some(id)` on a match; the inner `Option` is the `:id` parameter if the pattern has one.
fn match_pattern(pattern: &str, path: &str) -> Option<Option<ItemId>> {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    let mut id = None;
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return Some(id),
            (Some(":id"), Some(segment)) => {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                id = Some(segment.parse().ok()?);
            }
            (Some(expected), Some(segment)) if expected == segment => {}
            _ => return None,
        }
    }
}
