use crate::audio::CpalDevices;
use crate::config::Config;
use crate::fingerprint::{AcrCloudIdentifier, HmacSha1Signer};
use crate::messages::ControlCommand;
use crate::playback::{PlaybackDispatcher, SpotifyClient};
use crate::services::{Controller, CpalRecorder, Services, StartOutcome};

use anyhow::Result;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "Commands: devices | start [device name] | stop | status | quit";

pub struct App {
    config: Config,
    controller: Controller,
    command_rx: mpsc::Receiver<ControlCommand>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let services = Self::build_services(&config)?;
        let controller = Controller::new(Arc::new(CpalDevices), services, config.loop_settings()?);
        let command_rx = Self::setup_command_input();

        Ok(Self {
            config,
            controller,
            command_rx,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        self.print_devices().await;
        println!("{}", HELP);

        loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    tracing::debug!("Control command: {:?}", command);
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.controller.shutdown().await;
        tracing::info!("Shutdown complete");
        Ok(())
    }

    async fn handle_command(&mut self, command: ControlCommand) -> ControlFlow<()> {
        match command {
            ControlCommand::Start(name) => {
                let name = name.or_else(|| self.config.device.clone());
                match self.controller.start(name.as_deref()).await {
                    Ok(StartOutcome::Started(device)) => {
                        println!("Listening on {}", device.name);
                    }
                    Ok(StartOutcome::AlreadyRunning) => println!("Already listening"),
                    Err(e) => {
                        tracing::warn!("Start failed: {}", e);
                        eprintln!("Cannot start: {}", e);
                    }
                }
            }
            ControlCommand::Stop => {
                if self.controller.stop() {
                    println!("Stopping after the current cycle");
                }
            }
            ControlCommand::Devices => self.print_devices().await,
            ControlCommand::Status => match (self.controller.is_running(), self.controller.selected_device()) {
                (true, Some(device)) => println!("Listening on {}", device.name),
                _ => println!("Idle"),
            },
            ControlCommand::Quit => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    async fn print_devices(&self) {
        match self.controller.refresh_devices().await {
            Ok(devices) if devices.is_empty() => println!("No input devices found"),
            Ok(devices) => {
                println!("Input devices:");
                for device in devices {
                    println!(
                        "  {} ({} channel(s))",
                        device.name, device.max_input_channels
                    );
                }
            }
            Err(e) => {
                tracing::warn!("Failed to list devices: {}", e);
                eprintln!("Cannot list devices: {}", e);
            }
        }
    }

    fn build_services(config: &Config) -> Result<Services> {
        let signer = HmacSha1Signer::new(&config.acrcloud.access_secret)?;
        let identifier = AcrCloudIdentifier::new(
            &config.acrcloud.host,
            &config.acrcloud.access_key,
            Box::new(signer),
            Duration::from_secs(config.identify_timeout),
        )?;

        let streaming = SpotifyClient::new(
            &config.spotify.api_base,
            &config.spotify.accounts_url,
            config.spotify_credentials()?,
            Duration::from_secs(config.dispatch_timeout),
        )?;

        Ok(Services {
            recorder: Arc::new(CpalRecorder),
            identifier: Arc::new(identifier),
            dispatcher: Arc::new(PlaybackDispatcher::new(streaming)),
        })
    }

    fn setup_command_input() -> mpsc::Receiver<ControlCommand> {
        let (command_tx, command_rx) = mpsc::channel(10);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match ControlCommand::parse(&line) {
                        Some(command) => {
                            if command_tx.send(command).await.is_err() {
                                break;
                            }
                        }
                        None => println!("{}", HELP),
                    },
                    Ok(None) => {
                        tracing::debug!("Control input closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Failed to read control input: {}", e);
                        break;
                    }
                }
            }
        });

        command_rx
    }
}
