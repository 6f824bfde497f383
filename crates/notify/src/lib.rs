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

mod dispatch;
pub use dispatch::{DispatchReport, Dispatcher};

mod metrics;

mod router;
pub use router::Router;

mod transport;
pub use transport::{EventSource, ReplySink, TransportError, memory};

#[cfg(feature = "zmq")]
pub use transport::zmq;

mod worker;
pub use worker::{NotificationWorker, Worker, WorkerError, WorkerHandle};
