#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for xfer
//!
//! This crate issues HTTP transfers and turns every outcome into a
//! [`Response`] value. Failures at the network or protocol level never
//! surface as `Err`; callers inspect [`Response::is_success`] instead.
//!
//! The moving parts:
//! - [`Request`] describes one transfer (verb, headers, body, timeout,
//!   certificate validator, cancellation token, progress sink, handler)
//! - [`RequestDispatcher`] sends it through a [`Transport`] and classifies
//!   the result
//! - a progress monitor task polls [`ProgressState`] while the transfer runs
//! - [`NetClient`] is the reqwest-backed transport; the dispatcher serves
//!   `file://` URLs itself and hands everything else to its transport

mod client;
mod dispatch;
mod handler;
mod monitor;
mod progress;
mod request;
mod response;
mod tls;
mod transport;

pub use client::{NetClient, NetConfig};
pub use dispatch::RequestDispatcher;
pub use handler::{MediaSink, ResponseHandler};
pub use progress::{EventProgress, ProgressSink, ProgressState};
pub use request::{Body, Headers, Method, Request};
pub use response::{Response, INVALID_CREDENTIALS, INVALID_HEADERS};
pub use transport::local::{file_url, local_path};
pub use transport::{ByteStream, CertificateValidator, Transport, TransportRequest, TransportResponse};

pub use tokio_util::sync::CancellationToken;
