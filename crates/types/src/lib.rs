#![doc = include_str!("../README.md")]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod chain;
pub use chain::{Block, BlockHeader, Transaction, TxOutput};

mod error;
pub use error::{DecodeError, DecodeResult};

mod frame;
pub use frame::{BlockEvent, Event, Frame, HeartbeatEvent, TransactionEvent};

mod prefix;
pub use prefix::{MAX_PREFIX_BITS, MIN_PREFIX_BITS, StealthPrefix};

mod request;
pub use request::{Notification, NotificationKind, Request, Response, commands, decode_key};

mod route;
pub use route::Route;

mod status;
pub use status::StatusCode;

/// Height carried by notifications for transactions that are not yet in a
/// block.
pub const UNCONFIRMED_HEIGHT: u32 = u32::MAX;

/// Size in bytes of a payment key, transaction hash or stealth value.
pub const HASH_SIZE: usize = 32;
