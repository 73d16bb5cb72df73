use anyhow::{Context, Result};
use mockview::{
    CaptureConfig, Config, InterviewConfig, InterviewSession, MicInput, RodioOutput,
    SessionConfig, Speaker, WsLiveTransport,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/mockview")?;

    info!("mockview v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Model: {}, voice: {}", cfg.live.model, cfg.live.voice);

    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY must be set to reach the live endpoint")?;

    let session_config = SessionConfig {
        model: cfg.live.model.clone(),
        voice: cfg.live.voice.clone(),
        input_sample_rate: cfg.audio.input_sample_rate,
        output_sample_rate: cfg.audio.output_sample_rate,
        channels: cfg.audio.channels,
        frame_size: cfg.audio.frame_size,
        ..SessionConfig::default()
    };

    let capture_config = CaptureConfig {
        sample_rate: cfg.audio.input_sample_rate,
        channels: cfg.audio.channels,
        frame_size: cfg.audio.frame_size,
    };

    let transport = Arc::new(WsLiveTransport::new(cfg.live.endpoint.clone(), api_key));
    let input = Box::new(MicInput::new(capture_config));
    let output = Arc::new(RodioOutput::new());

    let session = InterviewSession::new(session_config, transport, input, output);

    let interview = InterviewConfig {
        role: std::env::var("INTERVIEW_ROLE").unwrap_or_else(|_| "Software Engineer".to_string()),
        company: std::env::var("INTERVIEW_COMPANY").unwrap_or_else(|_| "Acme".to_string()),
        experience_level: std::env::var("INTERVIEW_LEVEL")
            .unwrap_or_else(|_| "mid-level".to_string()),
    };

    session.start(interview).await?;
    info!("Interview session running; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    session.stop().await?;

    for item in session.transcript() {
        let speaker = match item.speaker {
            Speaker::User => "you",
            Speaker::Model => "interviewer",
        };
        println!("[{}] {}", speaker, item.text);
    }

    Ok(())
}
