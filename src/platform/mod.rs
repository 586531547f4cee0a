//! Platform abstraction layer
//!
//! Browser implementations of the engine's seams live in `web` (wasm32):
//! - `RafScheduler`: frames from `requestAnimationFrame`
//! - `DomInputSource`: keyboard, pointer, blur and visibility listeners
//!
//! Native builds drive the engine with `ManualScheduler` and the headless
//! surfaces instead. Routing is shared by both.

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Game id named by a location hash: `#/play/<id>` or `#<id>`
pub fn route_from_hash(hash: &str) -> Option<&str> {
    let path = hash.trim_start_matches('#');
    let id = path
        .strip_prefix("/play/")
        .unwrap_or_else(|| path.trim_start_matches('/'));
    let id = id.trim_end_matches('/');
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_from_hash() {
        assert_eq!(route_from_hash("#/play/dodge"), Some("dodge"));
        assert_eq!(route_from_hash("#/play/merge/"), Some("merge"));
        assert_eq!(route_from_hash("#simon"), Some("simon"));
        assert_eq!(route_from_hash("#/stop"), Some("stop"));
        assert_eq!(route_from_hash(""), None);
        assert_eq!(route_from_hash("#"), None);
        assert_eq!(route_from_hash("#/play/"), None);
        assert_eq!(route_from_hash("#/settings/audio"), None);
    }
}
