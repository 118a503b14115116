//! `MsgPack` RPC transport over length-delimited TCP frames.
//!
//! Serves the same three operations as the HTTP transport (`PROCESS`,
//! `PROCESS_BATCH`, `HEALTH`) through the same dispatcher, and shares the
//! HTTP module's shutdown controller.

pub mod client;
pub mod codec;
pub mod server;
pub mod service;

pub use client::{RpcClient, RpcClientError};
pub use codec::{framed, FramedConnection, DEFAULT_MAX_FRAME_BYTES};
pub use server::{RpcConfig, RpcServer};
pub use service::RpcService;
