//! Oboe-based output device for Android
//!
//! Opens a low-latency stereo output stream when created; `start` and `stop`
//! map directly to the Oboe stream calls. The render callback is real-time
//! safe: it only advances a [`SineTone`].

use oboe::{
    AudioOutputCallback, AudioOutputStreamSafe, AudioStream, AudioStreamAsync,
    AudioStreamBuilder, DataCallbackResult, Output, PerformanceMode, SharingMode, Stereo,
};

use crate::config::DeviceConfig;
use crate::error::AudioError;

use super::{AudioDevice, SineTone};

/// Render callback handed to Oboe.
struct ToneCallback {
    tone: SineTone,
}

impl AudioOutputCallback for ToneCallback {
    type FrameType = (f32, Stereo);

    fn on_audio_ready(
        &mut self,
        _stream: &mut dyn AudioOutputStreamSafe,
        frames: &mut [(f32, f32)],
    ) -> DataCallbackResult {
        for frame in frames.iter_mut() {
            let sample = self.tone.next_sample();
            *frame = (sample, sample);
        }
        DataCallbackResult::Continue
    }
}

/// Android output device backed by an Oboe stream.
pub struct OboeOutputDevice {
    name: String,
    stream: AudioStreamAsync<Output, ToneCallback>,
}

impl OboeOutputDevice {
    /// Open the output stream. The stream is created stopped.
    ///
    /// # Errors
    /// - `ContextNotInitialized` if `LifecycleBridge.nativeInit` has not run yet
    /// - `StreamOpenFailed` if Oboe refuses the stream
    pub fn open(config: &DeviceConfig) -> Result<Self, AudioError> {
        if !crate::android::context_initialized() {
            return Err(AudioError::ContextNotInitialized);
        }

        let callback = ToneCallback {
            tone: SineTone::new(config.tone_hz, config.sample_rate, config.amplitude),
        };

        let stream = AudioStreamBuilder::default()
            .set_performance_mode(PerformanceMode::LowLatency)
            .set_sharing_mode(SharingMode::Shared)
            .set_direction::<Output>()
            .set_sample_rate(config.sample_rate as i32)
            .set_channel_count::<Stereo>()
            .set_format::<f32>()
            .set_callback(callback)
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Output stream: {:?}", e),
            })?;

        Ok(Self {
            name: "oboe-output".to_string(),
            stream,
        })
    }
}

impl AudioDevice for OboeOutputDevice {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream.start().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to start output stream: {:?}", e),
        })
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.stream.stop().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to stop output stream: {:?}", e),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
