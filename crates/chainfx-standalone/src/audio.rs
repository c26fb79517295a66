//! CPAL duplex audio for the standalone host
//!
//! ```text
//! ┌──────────────────┐   push frames   ┌─────────────────────┐
//! │  Input Stream    │────────────────►│   Input Ring        │
//! │  (capture)       │                 │  (rtrb SPSC)        │
//! └──────────────────┘                 └──────────┬──────────┘
//!                                                 │ pop frames
//!                                                 ▼
//!                                      ┌─────────────────────┐
//!                                      │  Output Stream      │
//!                                      │  (owns AudioEngine) │
//!                                      └─────────────────────┘
//! ```
//!
//! The output callback owns the engine outright, so no lock is taken on
//! the audio path. Input underruns are filled with silence and counted.
//!
//! Without devices (`--no-audio`) an offline driver thread runs the engine
//! on silence at the configured block rate, so orders and state still flow.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use chainfx_core::engine::AudioEngine;
use chainfx_core::types::{StereoBuffer, StereoSample, MAX_BUFFER_SIZE, SAMPLE_RATE};

use crate::config::AudioSettings;
use crate::error::{AudioError, AudioResult};

/// Smallest input ring, in frames
const MIN_RING_FRAMES: usize = 4096;

/// Device-side glitch counters
#[derive(Debug, Default)]
pub struct XrunCounters {
    /// Input frames dropped because the ring was full
    pub input_overruns: AtomicU64,
    /// Output frames rendered from silence because the ring was empty
    pub input_underruns: AtomicU64,
}

/// What is driving the engine
enum Driver {
    Cpal {
        _input: Option<Stream>,
        _output: Stream,
    },
    Offline {
        stop: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
    },
}

/// Keeps the streams (or offline thread) alive; drop to stop audio
pub struct AudioHandle {
    driver: Driver,
    sample_rate: u32,
    buffer_size: u32,
    xruns: Arc<XrunCounters>,
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    pub fn xruns(&self) -> &Arc<XrunCounters> {
        &self.xruns
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.driver, Driver::Offline { .. })
    }
}

impl Drop for AudioHandle {
    fn drop(&mut self) {
        if let Driver::Offline { stop, thread } = &mut self.driver {
            stop.store(true, Ordering::Relaxed);
            if let Some(thread) = thread.take() {
                if thread.join().is_err() {
                    log::error!("Offline audio thread panicked");
                }
            }
        }
    }
}

/// Run the engine on silence from a plain thread, one block per period
pub fn start_offline(settings: &AudioSettings, mut engine: AudioEngine) -> AudioResult<AudioHandle> {
    let sample_rate = settings.sample_rate.unwrap_or(SAMPLE_RATE);
    let buffer_size = settings.buffer_size.clamp(16, MAX_BUFFER_SIZE as u32);
    let period = Duration::from_secs_f64(buffer_size as f64 / sample_rate as f64);

    engine.prepare(sample_rate, buffer_size as usize);
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let thread = std::thread::Builder::new()
        .name("chainfx-offline".to_string())
        .spawn(move || {
            let mut buffer = StereoBuffer::silence(buffer_size as usize);
            while !thread_stop.load(Ordering::Relaxed) {
                buffer.fill_silence();
                engine.process_block(&mut buffer);
                std::thread::sleep(period);
            }
        })
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    log::info!("Offline driver started: {}Hz, {} frames", sample_rate, buffer_size);
    Ok(AudioHandle {
        driver: Driver::Offline {
            stop,
            thread: Some(thread),
        },
        sample_rate,
        buffer_size,
        xruns: Arc::new(XrunCounters::default()),
    })
}

/// Open the devices, prepare `engine` and start streaming
pub fn start_audio(settings: &AudioSettings, mut engine: AudioEngine) -> AudioResult<AudioHandle> {
    let host = cpal::default_host();

    let output_device = match &settings.output_device {
        Some(name) => find_device(&host, name, false)?,
        None => host
            .default_output_device()
            .ok_or(AudioError::NoDefaultDevice("output"))?,
    };
    log::info!(
        "Using output device: {}",
        output_device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let target_rate = settings.sample_rate.unwrap_or(SAMPLE_RATE);
    let buffer_size = settings.buffer_size.clamp(16, MAX_BUFFER_SIZE as u32);
    let output_config = output_stream_config(&output_device, target_rate, buffer_size)?;
    let sample_rate = output_config.sample_rate.0;

    // Input is optional: without it the chain processes silence
    let input_device = match &settings.input_device {
        Some(name) => Some(find_device(&host, name, true)?),
        None => host.default_input_device(),
    };

    let xruns = Arc::new(XrunCounters::default());

    let (input_stream, input) = match input_device {
        Some(device) => {
            log::info!(
                "Using input device: {}",
                device.name().unwrap_or_else(|_| "Unknown".to_string())
            );
            let config = input_stream_config(&device, sample_rate, buffer_size)?;
            let ring_frames = (buffer_size as usize * 4).max(MIN_RING_FRAMES);
            let (producer, consumer) = rtrb::RingBuffer::<StereoSample>::new(ring_frames);
            let stream = build_input_stream(&device, &config, producer, Arc::clone(&xruns))?;
            (Some(stream), Some(consumer))
        }
        None => {
            log::warn!("No input device available, processing silence");
            (None, None)
        }
    };

    log::info!(
        "Audio config: {} output channels, {}Hz, {} frames (~{:.1}ms latency)",
        output_config.channels,
        sample_rate,
        buffer_size,
        (buffer_size as f32 / sample_rate as f32) * 1000.0
    );

    engine.prepare(sample_rate, buffer_size as usize);
    let callback = OutputCallback {
        engine,
        input,
        buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
        xruns: Arc::clone(&xruns),
    };
    let output_stream = build_output_stream(&output_device, &output_config, callback)?;

    if let Some(stream) = &input_stream {
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
    }
    output_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
    log::info!("Audio streams started");

    Ok(AudioHandle {
        driver: Driver::Cpal {
            _input: input_stream,
            _output: output_stream,
        },
        sample_rate,
        buffer_size,
        xruns,
    })
}

/// Find a device by exact name
fn find_device(host: &cpal::Host, name: &str, input: bool) -> AudioResult<cpal::Device> {
    let devices: Vec<cpal::Device> = if input {
        host.input_devices()
            .map_err(|e| AudioError::Enumerate(e.to_string()))?
            .collect()
    } else {
        host.output_devices()
            .map_err(|e| AudioError::Enumerate(e.to_string()))?
            .collect()
    };

    devices
        .into_iter()
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
}

/// Pick an f32 output config at `target_rate`, falling back to the
/// device's highest rate
fn output_stream_config(device: &cpal::Device, target_rate: u32, buffer_size: u32) -> AudioResult<StreamConfig> {
    let configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let best = configs
        .iter()
        .filter(|c| c.channels() >= 2)
        .find(|c| target_rate >= c.min_sample_rate().0 && target_rate <= c.max_sample_rate().0)
        .or_else(|| configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| configs.first())
        .ok_or_else(|| AudioError::ConfigError("No f32 output configuration".to_string()))?;

    let sample_rate = if target_rate >= best.min_sample_rate().0 && target_rate <= best.max_sample_rate().0 {
        cpal::SampleRate(target_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!("Output device doesn't support {}Hz, using {}Hz", target_rate, fallback.0);
        fallback
    };

    Ok(StreamConfig {
        channels: best.channels(),
        sample_rate,
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    })
}

/// Pick an f32 input config that matches the output rate exactly
fn input_stream_config(device: &cpal::Device, sample_rate: u32, buffer_size: u32) -> AudioResult<StreamConfig> {
    let configs: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let rate_ok = |c: &&cpal::SupportedStreamConfigRange| {
        sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0
    };
    let best = configs
        .iter()
        .filter(rate_ok)
        .max_by_key(|c| c.channels().min(2))
        .ok_or_else(|| {
            let input = configs.first().map(|c| c.max_sample_rate().0).unwrap_or(0);
            AudioError::SampleRateMismatch {
                input,
                output: sample_rate,
            }
        })?;

    Ok(StreamConfig {
        channels: best.channels(),
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    })
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: rtrb::Producer<StereoSample>,
    xruns: Arc<XrunCounters>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mut dropped = 0u64;
                let mut push = |frame: StereoSample| {
                    if producer.push(frame).is_err() {
                        dropped += 1;
                    }
                };

                match bytemuck::try_cast_slice::<f32, StereoSample>(data) {
                    Ok(frames) if channels == 2 => frames.iter().copied().for_each(&mut push),
                    _ => {
                        for frame in data.chunks(channels.max(1)) {
                            let left = frame[0];
                            let right = frame.get(1).copied().unwrap_or(left);
                            push(StereoSample::new(left, right));
                        }
                    }
                }

                if dropped > 0 {
                    xruns.input_overruns.fetch_add(dropped, Ordering::Relaxed);
                }
            },
            move |err| {
                log::error!("Input audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// State owned by the output callback
struct OutputCallback {
    engine: AudioEngine,
    /// Input ring; `None` when running output-only
    input: Option<rtrb::Consumer<StereoSample>>,
    /// Pre-allocated working buffer
    buffer: StereoBuffer,
    xruns: Arc<XrunCounters>,
}

impl OutputCallback {
    /// Render `data` (interleaved, `channels` per frame)
    fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for chunk in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
            let n_frames = chunk.len() / channels;
            self.pull_input(n_frames);
            self.engine.process_block(&mut self.buffer);
            self.write_output(chunk, channels);
        }
    }

    /// Fill the working buffer from the input ring, silence on underrun
    ///
    /// Output-only mode renders silence without counting underruns.
    fn pull_input(&mut self, n_frames: usize) {
        self.buffer.set_len_from_capacity(n_frames);
        let (left, right) = self.buffer.channels_mut();
        let Some(input) = self.input.as_mut() else {
            left.fill(0.0);
            right.fill(0.0);
            return;
        };
        let mut missing = 0u64;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let frame = match input.pop() {
                Ok(frame) => frame,
                Err(_) => {
                    missing += 1;
                    StereoSample::silence()
                }
            };
            *l = frame.left;
            *r = frame.right;
        }
        if missing > 0 {
            self.xruns.input_underruns.fetch_add(missing, Ordering::Relaxed);
        }
    }

    fn write_output(&self, data: &mut [f32], channels: usize) {
        if channels == 2 {
            if let Ok(frames) = bytemuck::try_cast_slice_mut::<f32, StereoSample>(data) {
                for (i, frame) in frames.iter_mut().enumerate() {
                    *frame = self.buffer.frame(i);
                }
                return;
            }
        }

        for (i, frame) in data.chunks_mut(channels).enumerate() {
            if i >= self.buffer.len() {
                frame.fill(0.0);
                continue;
            }
            let sample = self.buffer.frame(i);
            frame[0] = if channels == 1 {
                0.5 * (sample.left + sample.right)
            } else {
                sample.left
            };
            if channels > 1 {
                frame[1] = sample.right;
            }
            // Extra device channels stay silent
            for ch in frame.iter_mut().skip(2) {
                *ch = 0.0;
            }
        }
    }
}

fn build_output_stream(device: &cpal::Device, config: &StreamConfig, mut callback: OutputCallback) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                callback.render(data, channels);
            },
            move |err| {
                log::error!("Output audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainfx_core::config::EngineConfig;
    use chainfx_core::engine::create_engine;
    use chainfx_core::order::EffectId;

    fn callback(ring_frames: usize) -> (OutputCallback, rtrb::Producer<StereoSample>) {
        let (mut engine, controller) = create_engine(&EngineConfig::default());
        for id in EffectId::ALL {
            controller.set_bypass(id, true);
        }
        engine.prepare(48000, 256);
        let (producer, consumer) = rtrb::RingBuffer::new(ring_frames);
        let callback = OutputCallback {
            engine,
            input: Some(consumer),
            buffer: StereoBuffer::silence(MAX_BUFFER_SIZE),
            xruns: Arc::new(XrunCounters::default()),
        };
        (callback, producer)
    }

    #[test]
    fn test_passthrough_stereo() {
        let (mut cb, mut producer) = callback(64);
        for i in 0..8 {
            producer.push(StereoSample::new(i as f32 * 0.1, -(i as f32) * 0.1)).unwrap();
        }
        let mut data = vec![9.0f32; 16];
        cb.render(&mut data, 2);
        for i in 0..8 {
            assert!((data[2 * i] - i as f32 * 0.1).abs() < 1e-6);
            assert!((data[2 * i + 1] + i as f32 * 0.1).abs() < 1e-6);
        }
        assert_eq!(cb.xruns.input_underruns.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_underrun_renders_silence() {
        let (mut cb, mut producer) = callback(64);
        producer.push(StereoSample::mono(0.5)).unwrap();
        let mut data = vec![9.0f32; 8];
        cb.render(&mut data, 2);
        assert_eq!(&data[..2], &[0.5, 0.5]);
        assert!(data[2..].iter().all(|&s| s == 0.0));
        assert_eq!(cb.xruns.input_underruns.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_output_only_counts_no_underruns() {
        let (mut cb, _producer) = callback(64);
        cb.input = None;
        let mut data = vec![9.0f32; 16];
        cb.render(&mut data, 2);
        assert!(data.iter().all(|&s| s == 0.0));
        assert_eq!(cb.xruns.input_underruns.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_offline_driver_runs_engine() {
        let (engine, mut controller) = create_engine(&EngineConfig::default());
        let settings = AudioSettings {
            buffer_size: 64,
            ..Default::default()
        };
        let order = chainfx_core::order::ProcessingOrder::from_codes([4, 3, 2, 1, 0]);
        controller.request_order(order);

        let handle = start_offline(&settings, engine).unwrap();
        assert!(handle.is_offline());
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while controller.active_order() != order && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(controller.active_order(), order);
        drop(handle);
        assert!(controller.stats().callbacks > 0);
    }

    #[test]
    fn test_multichannel_output() {
        let (mut cb, mut producer) = callback(64);
        producer.push(StereoSample::new(0.25, 0.75)).unwrap();
        let mut data = vec![9.0f32; 4];
        cb.render(&mut data, 4);
        assert_eq!(data, vec![0.25, 0.75, 0.0, 0.0]);

        producer.push(StereoSample::new(0.25, 0.75)).unwrap();
        let mut mono = vec![9.0f32; 1];
        cb.render(&mut mono, 1);
        assert!((mono[0] - 0.5).abs() < 1e-6);
    }
}
