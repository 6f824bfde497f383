use crate::{RegistryInner, metrics};
use chainwatch_types::{DecodeResult, Request, Response, StatusCode, StealthPrefix, decode_key};
use tracing::debug;

impl RegistryInner {
    /// Serve a `subscribe.key` or `unsubscribe.key` request.
    ///
    /// A body that is not exactly 32 bytes is answered with
    /// [`StatusCode::BadStream`] and leaves the registry untouched.
    pub fn handle_key_request(&self, request: &Request, unsubscribe: bool) -> Response {
        let status = decoded(request, decode_key(&request.body), |key| {
            self.subscribe_key(request.route.clone(), key, unsubscribe)
        });
        Response::status(request, status)
    }

    /// Serve a `subscribe.stealth` or `unsubscribe.stealth` request.
    ///
    /// The body is `[bits:1][blocks]`. A bit length outside [8, 32] or a
    /// body of the wrong size is answered with [`StatusCode::BadStream`]
    /// and leaves the registry untouched.
    pub fn handle_stealth_request(&self, request: &Request, unsubscribe: bool) -> Response {
        let status = decoded(request, StealthPrefix::decode(&request.body), |prefix| {
            self.subscribe_stealth(request.route.clone(), prefix, unsubscribe)
        });
        Response::status(request, status)
    }
}

fn decoded<T>(
    request: &Request,
    result: DecodeResult<T>,
    apply: impl FnOnce(T) -> StatusCode,
) -> StatusCode {
    match result {
        Ok(value) => apply(value),
        Err(err) => {
            debug!(
                %err,
                command = %request.command,
                route = %request.route,
                "malformed subscription request"
            );
            metrics::inc_rejected();
            StatusCode::from(&err)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::SubscriptionRegistry;
    use alloy_primitives::B256;
    use chainwatch_config::NotifierConfig;
    use chainwatch_types::{Request, Route, StatusCode, commands};
    use tokio_util::sync::CancellationToken;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::without_purge(&NotifierConfig::default(), CancellationToken::new())
    }

    fn request(command: &str, body: &[u8]) -> Request {
        Request::new(command, Route::new(&b"client"[..], 42), body.to_vec())
    }

    #[test]
    fn key_request() {
        let registry = registry();
        let req = request(commands::SUBSCRIBE_KEY, &[0; 32]);
        let response = registry.handle_key_request(&req, false);
        assert_eq!(response.status_code().unwrap(), StatusCode::Success);
        assert_eq!(response.route, req.route);
        assert_eq!(registry.key_routes(&B256::ZERO), vec![req.route.clone()]);

        let req = request(commands::UNSUBSCRIBE_KEY, &[0; 32]);
        assert_eq!(
            registry.handle_key_request(&req, true).status_code().unwrap(),
            StatusCode::Success
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn malformed_key_request_does_not_mutate() {
        let registry = registry();
        for len in [0, 31, 33] {
            let req = request(commands::SUBSCRIBE_KEY, &vec![0; len]);
            assert_eq!(
                registry.handle_key_request(&req, false).status_code().unwrap(),
                StatusCode::BadStream
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn stealth_request() {
        let registry = registry();
        let req = request(commands::SUBSCRIBE_STEALTH, &[8, 0xab]);
        assert_eq!(
            registry.handle_stealth_request(&req, false).status_code().unwrap(),
            StatusCode::Success
        );
        assert_eq!(registry.stealth_routes(&B256::repeat_byte(0xab)), vec![req.route.clone()]);
        assert!(registry.stealth_routes(&B256::repeat_byte(0xac)).is_empty());
    }

    #[test]
    fn malformed_stealth_request_does_not_mutate() {
        let registry = registry();
        let bodies: [&[u8]; 5] = [&[], &[7, 0xab], &[33, 1, 2, 3, 4, 5], &[9, 0xab], &[8, 0xab, 0]];
        for body in bodies {
            let req = request(commands::SUBSCRIBE_STEALTH, body);
            assert_eq!(
                registry.handle_stealth_request(&req, false).status_code().unwrap(),
                StatusCode::BadStream,
                "{body:?}"
            );
        }
        assert!(registry.is_empty());
    }
}
