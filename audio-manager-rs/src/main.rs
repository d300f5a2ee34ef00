//! Command-line front end for the audio endpoint adapter.
//!
//! `audio-manager list | status | mic-volume [level] | watch`

use anyhow::{bail, Context, Result};
use audio_manager_rs::{
    create_event_channel, AdapterConfig, AudioManager, ChannelController, ControllerEvent,
    DeviceInfo, PlatformBackend,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_devices(title: &str, devices: &[DeviceInfo], current_id: &str) {
    println!("{title}:");
    for device in devices {
        let marker = if device.id == current_id { '*' } else { ' ' };
        println!(" {marker} {}  [{}]", device.name, device.id);
    }
}

fn print_status(manager: &AudioManager<PlatformBackend>) {
    println!(
        "Playback:   {} [{}]",
        manager.playback_dev_name(),
        manager.playback_dev_id()
    );
    if manager.is_mic_valid() {
        println!(
            "Microphone: {} [{}] volume {:.0}%{}",
            manager.mic_dev_name(),
            manager.mic_dev_id(),
            manager.mic_volume() * 100.0,
            if manager.mic_muted() { " (muted)" } else { "" }
        );
    } else {
        println!("Microphone: none");
    }
    if !manager.has_policy_config() {
        println!("Default device selection unavailable on this system");
    }
}

fn run(command: &str, args: &[String]) -> Result<()> {
    #[cfg(windows)]
    let _com = audio_manager_rs::platform::ComGuard::new(
        audio_manager_rs::platform::ComApartment::MultiThreaded,
    )?;

    let (tx, rx) = create_event_channel();
    let manager = AudioManager::new_platform(
        Arc::new(ChannelController::new(tx)),
        AdapterConfig::default(),
    )
    .context("Failed to initialize audio endpoints")?;

    match command {
        "list" => {
            print_devices(
                "Playback devices",
                &manager.playback_devices(),
                &manager.playback_dev_id(),
            );
            print_devices(
                "Recording devices",
                &manager.recording_devices(),
                &manager.mic_dev_id(),
            );
        }
        "status" => print_status(&manager),
        "mic-volume" => {
            if let Some(level) = args.first() {
                let level: f32 = level
                    .parse()
                    .with_context(|| format!("Invalid volume level: {level}"))?;
                if !manager.set_mic_volume(level) {
                    bail!("Could not set microphone volume");
                }
            }
            println!("{:.2}", manager.mic_volume());
        }
        "watch" => {
            print_status(&manager);
            info!("Watching endpoint changes (Ctrl+C to exit)");
            for event in rx {
                match event {
                    ControllerEvent::NewPlaybackDevice => {
                        info!(device = %manager.playback_dev_name(), "New playback device")
                    }
                    ControllerEvent::NewRecordingDevice => {
                        info!(device = %manager.mic_dev_name(), "New recording device")
                    }
                    ControllerEvent::NewMirrorDevice => info!("New mirror device"),
                    ControllerEvent::DeviceAdded => info!("Device added"),
                    ControllerEvent::DeviceRemoved => info!("Device removed"),
                }
            }
        }
        other => bail!("Unknown command: {other}"),
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("Usage: audio-manager list | status | mic-volume [level] | watch");
    };

    run(command, rest)
}
