//! Builds the push answer for an SDP offer read from a file and prints it.
//!
//! No network traffic: ICE calls are only logged.

use std::sync::{Arc, Weak};
use std::{env, fs, process};

use pushrtc::{
    config::Config,
    log::{LogSink, TracingLogSink, init_tracing},
    pc::{
        IceAgent, IceComponent, IceParameters, IceStateListener, PeerConnection,
        RtcOfferAnswerOptions,
    },
    sdp::Candidate,
};

/// Stands in for a real ICE stack by tracing what it is asked to do.
struct LoggingIceAgent;

impl IceAgent for LoggingIceAgent {
    fn create_transport(&self, mid: &str, component: IceComponent) {
        tracing::info!("create transport mid={mid} component={}", component.id());
    }

    fn set_remote_ice_params(&self, mid: &str, _component: IceComponent, params: &IceParameters) {
        tracing::info!("remote ice params mid={mid} ufrag={}", params.ufrag);
    }

    fn set_local_ice_params(&self, mid: &str, _component: IceComponent, params: &IceParameters) {
        tracing::info!("local ice params mid={mid} ufrag={}", params.ufrag);
    }

    fn add_remote_candidate(&self, mid: &str, _component: IceComponent, candidate: &Candidate) {
        tracing::info!(
            "remote candidate mid={mid} {}:{} typ {}",
            candidate.address,
            candidate.port,
            candidate.cand_type.as_sdp_str()
        );
    }

    fn set_state_listener(&self, _listener: Weak<dyn IceStateListener>) {}
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let (offer_path, config_path) = match args.len() {
        2 => (&args[1], None),
        3 => (&args[1], Some(&args[2])),
        _ => {
            eprintln!("Usage:");
            eprintln!("  {} OFFER.sdp [CONFIG.toml]", args[0]);
            process::exit(1);
        }
    };

    let config = match config_path {
        Some(path) => Config::load(path),
        None => Config::load("pushrtc.toml"),
    }
    .unwrap_or_else(|e| {
        eprintln!("Error loading config: {e}. Using empty config.");
        Config::empty()
    });

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("[pushrtc_answer] logging disabled: {e}");
    }

    let offer = match fs::read_to_string(offer_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("[pushrtc_answer] cannot read {offer_path}: {e}");
            process::exit(1);
        }
    };

    let logger: Arc<dyn LogSink> = Arc::new(TracingLogSink);
    let mut pc = PeerConnection::new(Arc::new(LoggingIceAgent), config.rtp, logger);
    let answer = pc
        .set_remote_sdp(&offer)
        .and_then(|_| pc.create_answer(&RtcOfferAnswerOptions::push_video()));
    match answer {
        Ok(sdp) => print!("{sdp}"),
        Err(e) => {
            eprintln!("[pushrtc_answer] {e}");
            process::exit(2);
        }
    }
}
