//! HTTP serving layer: multipart upload in, feature JSON out.

pub mod handlers;
pub mod server;
