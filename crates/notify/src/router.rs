use crate::metrics;
use chainwatch_registry::SubscriptionRegistry;
use chainwatch_types::{Request, Response, StatusCode, commands};
use tracing::debug;

/// Serves the subscription commands of the query service.
///
/// | command | body |
/// |---|---|
/// | `subscribe.key`, `unsubscribe.key` | 32-byte payment key |
/// | `subscribe.stealth`, `unsubscribe.stealth` | `[bits:1][blocks]` |
///
/// Every response body is the 4-byte status. Other commands are answered
/// with [`StatusCode::NotFound`].
#[derive(Debug, Clone)]
pub struct Router {
    registry: SubscriptionRegistry,
}

impl Router {
    /// Create a router over `registry`.
    pub const fn new(registry: SubscriptionRegistry) -> Self {
        Self { registry }
    }

    /// Serve one request.
    pub fn handle(&self, request: &Request) -> Response {
        let (label, response) = match request.command.as_str() {
            commands::SUBSCRIBE_KEY => {
                (commands::SUBSCRIBE_KEY, self.registry.handle_key_request(request, false))
            }
            commands::UNSUBSCRIBE_KEY => {
                (commands::UNSUBSCRIBE_KEY, self.registry.handle_key_request(request, true))
            }
            commands::SUBSCRIBE_STEALTH => {
                (commands::SUBSCRIBE_STEALTH, self.registry.handle_stealth_request(request, false))
            }
            commands::UNSUBSCRIBE_STEALTH => {
                (commands::UNSUBSCRIBE_STEALTH, self.registry.handle_stealth_request(request, true))
            }
            _ => {
                debug!(command = %request.command, route = %request.route, "unknown command");
                ("unknown", Response::status(request, StatusCode::NotFound))
            }
        };
        metrics::inc_requests(label);
        response
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chainwatch_config::NotifierConfig;
    use chainwatch_types::Route;
    use tokio_util::sync::CancellationToken;

    fn router() -> Router {
        Router::new(SubscriptionRegistry::without_purge(
            &NotifierConfig::default(),
            CancellationToken::new(),
        ))
    }

    fn status(router: &Router, command: &str, body: &[u8]) -> StatusCode {
        let request = Request::new(command, Route::new(&b"client"[..], 1), body.to_vec());
        router.handle(&request).status_code().unwrap()
    }

    #[test]
    fn routes_commands() {
        let router = router();
        assert_eq!(status(&router, commands::SUBSCRIBE_KEY, &[1; 32]), StatusCode::Success);
        assert_eq!(status(&router, commands::SUBSCRIBE_STEALTH, &[8, 1]), StatusCode::Success);
        assert_eq!(router.registry.key_count(), 1);
        assert_eq!(router.registry.stealth_count(), 1);

        assert_eq!(status(&router, commands::UNSUBSCRIBE_KEY, &[1; 32]), StatusCode::Success);
        assert_eq!(status(&router, commands::UNSUBSCRIBE_STEALTH, &[8, 1]), StatusCode::Success);
        assert!(router.registry.is_empty());
    }

    #[test]
    fn unknown_and_malformed() {
        let router = router();
        assert_eq!(status(&router, "blockchain.fetch_history", &[]), StatusCode::NotFound);
        assert_eq!(status(&router, commands::SUBSCRIBE_KEY, &[1; 20]), StatusCode::BadStream);
        assert_eq!(status(&router, commands::SUBSCRIBE_STEALTH, &[40, 1]), StatusCode::BadStream);
        assert!(router.registry.is_empty());
    }
}
