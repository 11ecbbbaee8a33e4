/// Collapse numeric path segments into `:id` so request paths are safe as labels.
///
/// `/api/items/42/resolve` becomes `/api/items/:id/resolve`. Query strings are dropped.
#[must_use]
pub fn normalize_route(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
