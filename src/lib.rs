//! pushrtc publishes a local camera to a media server over RTP.
//!
//! A push stream wires capture, H.264 encoding and an RTP sink into a
//! [`media::MediaChain`], then runs one offer/answer round against the
//! server's HTTP signaling endpoint. ICE, packet egress, cameras and the
//! encoder backend are supplied by the host through traits.
//!
//! The crate ships one binary, `pushrtc_answer`, which builds the push
//! answer for an offer file without touching the network.

/// Handles configuration loading and management.
pub mod config;
/// Task queues, shared context, errors and observer callbacks.
pub mod core;
/// Top-level facade: camera sources and push streams.
pub mod engine;
/// Logging utilities for the application.
pub mod log;
/// Media chain graph: nodes, pins and frames.
pub mod media;
/// Peer connection: offer/answer and ICE transport setup.
pub mod pc;
/// The camera → encoder → network push pipeline.
pub mod push;
/// RTP packet parsing and building.
pub mod rtp;
/// RTP payload formats (H.264 packetization).
pub mod rtp_format;
/// SDP (Session Description Protocol) parsing and building.
pub mod sdp;
/// HTTP signaling client for the push/answer/stop exchange.
pub mod signaling_client;

pub use engine::{DeviceInfo, Engine, EngineDeps, VideoDeviceInfo};
