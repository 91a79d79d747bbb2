//! CPAL-based output device for desktop platforms (Linux, macOS, Windows)
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated owner
//! thread for its whole life. The device talks to that thread over a command
//! channel: `start` maps to `Stream::play`, `stop` to `Stream::pause`.
//! Dropping the device closes the channel, which drops the stream and joins
//! the thread.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::DeviceConfig;
use crate::error::AudioError;

use super::{AudioDevice, SineTone};

enum StreamCommand {
    Play(mpsc::Sender<Result<(), AudioError>>),
    Pause(mpsc::Sender<Result<(), AudioError>>),
}

/// Default output device driven through a thread-owned cpal stream.
pub struct CpalOutputDevice {
    name: String,
    commands: Option<mpsc::Sender<StreamCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalOutputDevice {
    /// Open the default output device and build a paused output stream.
    ///
    /// Blocks until the owner thread has built the stream (or failed to).
    pub fn open(config: &DeviceConfig) -> Result<Self, AudioError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let config = config.clone();

        let worker = thread::Builder::new()
            .name("cpal-output".to_string())
            .spawn(move || match build_stream(&config) {
                Ok((stream, name)) => {
                    if ready_tx.send(Ok(name)).is_ok() {
                        run_stream(stream, command_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })?;

        let name = ready_rx.recv().map_err(|_| AudioError::StreamClosed)??;

        Ok(Self {
            name,
            commands: Some(command_tx),
            worker: Some(worker),
        })
    }

    fn request(
        &self,
        make: fn(mpsc::Sender<Result<(), AudioError>>) -> StreamCommand,
    ) -> Result<(), AudioError> {
        let commands = self.commands.as_ref().ok_or(AudioError::StreamClosed)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        commands
            .send(make(reply_tx))
            .map_err(|_| AudioError::StreamClosed)?;
        reply_rx.recv().map_err(|_| AudioError::StreamClosed)?
    }
}

impl AudioDevice for CpalOutputDevice {
    fn start(&mut self) -> Result<(), AudioError> {
        self.request(StreamCommand::Play)
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.request(StreamCommand::Pause)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for CpalOutputDevice {
    fn drop(&mut self) {
        // Closing the channel ends run_stream, which drops the stream
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[CpalOutputDevice] Stream owner thread panicked");
            }
        }
    }
}

fn run_stream(stream: cpal::Stream, commands: mpsc::Receiver<StreamCommand>) {
    for command in commands {
        match command {
            StreamCommand::Play(reply) => {
                let result = stream.play().map_err(|e| AudioError::HardwareError {
                    details: format!("Failed to play output stream: {}", e),
                });
                let _ = reply.send(result);
            }
            StreamCommand::Pause(reply) => {
                let result = stream.pause().map_err(|e| AudioError::HardwareError {
                    details: format!("Failed to pause output stream: {}", e),
                });
                let _ = reply.send(result);
            }
        }
    }
    log::debug!("[CpalOutputDevice] Command channel closed, releasing stream");
}

fn build_stream(config: &DeviceConfig) -> Result<(cpal::Stream, String), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::DeviceUnavailable)?;
    let name = device
        .name()
        .unwrap_or_else(|_| "default output".to_string());

    let stream_config = select_stream_config(&device, config)?;
    let channels = stream_config.channels as usize;
    let mut tone = SineTone::new(config.tone_hz, stream_config.sample_rate.0, config.amplitude);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                tone.fill_interleaved(data, channels);
            },
            |err| log::error!("[CpalOutputDevice] Output stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

    // Some hosts start streams on creation; the guard decides when to play
    if let Err(err) = stream.pause() {
        log::debug!("[CpalOutputDevice] Initial pause not supported: {}", err);
    }

    Ok((stream, name))
}

/// Use the requested rate and channel count when the device supports them in
/// f32, otherwise fall back to the device default.
fn select_stream_config(
    device: &cpal::Device,
    config: &DeviceConfig,
) -> Result<cpal::StreamConfig, AudioError> {
    let supports_requested = device
        .supported_output_configs()
        .map(|configs| {
            configs.into_iter().any(|range| {
                range.sample_format() == cpal::SampleFormat::F32
                    && range.channels() == config.channels
                    && range.min_sample_rate().0 <= config.sample_rate
                    && range.max_sample_rate().0 >= config.sample_rate
            })
        })
        .unwrap_or(false);

    if supports_requested {
        return Ok(cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        });
    }

    let default_config =
        device
            .default_output_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

    if default_config.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::StreamOpenFailed {
            reason: format!(
                "Only F32 output is supported (device default is {:?})",
                default_config.sample_format()
            ),
        });
    }

    log::info!(
        "[CpalOutputDevice] Requested {} Hz x {} not supported, using device default",
        config.sample_rate,
        config.channels
    );
    Ok(default_config.into())
}
