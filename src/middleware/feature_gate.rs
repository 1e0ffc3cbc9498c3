use axum::Router;

/// Merge the route group produced by `build` only when `enabled`.
///
/// A disabled group is never registered, so its paths fall through to the
/// router's 404 for the life of the process.
pub fn mount_group<S, F>(router: Router<S>, enabled: bool, name: &str, build: F) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    F: FnOnce() -> Router<S>,
{
    if enabled {
        tracing::debug!("{} routes enabled", name);
        router.merge(build())
    } else {
        tracing::info!("{} routes disabled", name);
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn disabled_group_is_never_built() {
        let built = Cell::new(false);
        let _router: Router = mount_group(Router::new(), false, "billing", || {
            built.set(true);
            Router::new()
        });
        assert!(!built.get());
    }
}
