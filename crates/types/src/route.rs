use alloy_primitives::hex;
use bytes::Bytes;

/// Where to send a subscriber's notifications.
///
/// `address` is the transport identity of the subscriber's reply channel,
/// `id` the correlation token of the request that created the subscription.
/// Both are opaque to the registry; two routes are the same subscriber when
/// both fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route {
    /// Transport identity of the reply destination.
    pub address: Bytes,
    /// Request correlation token.
    pub id: u32,
}

impl Route {
    /// Create a route.
    pub fn new(address: impl Into<Bytes>, id: u32) -> Self {
        Self { address: address.into(), id }
    }
}

impl core::fmt::Display for Route {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", hex::encode(&self.address), self.id)
    }
}
