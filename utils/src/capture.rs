//! Microphone capture on a dedicated thread.
//!
//! The cpal stream lives on its own thread. The audio callback downmixes to
//! mono, publishes the current level and pushes samples into a lock-free ring
//! buffer that the thread drains until it is told to stop.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};

use crate::audio;

/// Seconds of audio the ring buffer holds between drains.
const BUFFER_SECONDS: usize = 2;
const DRAIN_INTERVAL: Duration = Duration::from_millis(20);

/// Mono samples captured at the device rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Recording {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Resamples to `sample_rate` and encodes as WAV.
    pub fn to_wav(&self, sample_rate: u32) -> anyhow::Result<Vec<u8>> {
        let samples = audio::resample(&self.samples, self.sample_rate, sample_rate)?;
        audio::encode_wav(&samples, sample_rate)
    }
}

pub struct MicCapture {
    stop_tx: mpsc::Sender<()>,
    level: Arc<AtomicU32>,
    worker: Option<JoinHandle<anyhow::Result<Recording>>>,
}

impl MicCapture {
    /// Opens the named input device, or the default one, and starts recording.
    /// Returns once the stream is running or has failed to start.
    pub fn start(device_name: Option<&str>) -> anyhow::Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let level = Arc::new(AtomicU32::new(0));

        let device_name = device_name.map(str::to_string);
        let thread_level = level.clone();
        let worker = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || record(device_name, thread_level, ready_tx, stop_rx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_tx,
                level,
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(anyhow::anyhow!("capture thread exited before starting"))
            }
        }
    }

    pub fn level(&self) -> f32 {
        f32::from_bits(self.level.load(Ordering::Relaxed))
    }

    /// Stops the stream and returns everything recorded.
    pub fn stop(mut self) -> anyhow::Result<Recording> {
        let _ = self.stop_tx.send(());
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| anyhow::anyhow!("capture thread panicked"))?,
            None => Err(anyhow::anyhow!("capture already stopped")),
        }
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn record(
    device_name: Option<String>,
    level: Arc<AtomicU32>,
    ready_tx: mpsc::Sender<anyhow::Result<()>>,
    stop_rx: mpsc::Receiver<()>,
) -> anyhow::Result<Recording> {
    let device = match crate::device::get_or_default_input(device_name.as_deref()) {
        Ok(device) => device,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return Ok(Recording::new(Vec::new(), 0));
        }
    };

    let opened = open_stream(&device, level);
    let (stream, mut consumer, sample_rate) = match opened {
        Ok(opened) => {
            let _ = ready_tx.send(Ok(()));
            opened
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return Ok(Recording::new(Vec::new(), 0));
        }
    };

    let mut samples = Vec::new();
    let mut scratch = vec![0.0f32; 4096];
    loop {
        match stop_rx.recv_timeout(DRAIN_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        drain(&mut consumer, &mut scratch, &mut samples);
    }
    drop(stream);
    drain(&mut consumer, &mut scratch, &mut samples);

    tracing::debug!("captured {} samples at {}hz", samples.len(), sample_rate);
    Ok(Recording::new(samples, sample_rate))
}

type SampleConsumer = ringbuf::HeapCons<f32>;

fn drain(consumer: &mut SampleConsumer, scratch: &mut [f32], samples: &mut Vec<f32>) {
    loop {
        let n = consumer.pop_slice(scratch);
        if n == 0 {
            break;
        }
        samples.extend_from_slice(&scratch[..n]);
    }
}

fn open_stream(
    device: &cpal::Device,
    level: Arc<AtomicU32>,
) -> anyhow::Result<(cpal::Stream, SampleConsumer, u32)> {
    let input_config = device.default_input_config()?.config();
    let channels = input_config.channels as usize;
    let sample_rate = input_config.sample_rate.0;
    tracing::info!("Input stream config: {:?}", &input_config);

    let buffer = audio::shared_buffer(sample_rate as usize * BUFFER_SECONDS);
    let (mut producer, consumer) = buffer.split();

    let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        let mono = audio::downmix(data, channels);
        level.store(audio::rms_level(&mono).to_bits(), Ordering::Relaxed);
        let pushed = producer.push_slice(&mono);
        if pushed < mono.len() {
            tracing::warn!("capture buffer full, dropped {} samples", mono.len() - pushed);
        }
    };

    let stream = device.build_input_stream(
        &input_config,
        input_data_fn,
        move |err| tracing::error!("An error occurred on input stream: {}", err),
        None,
    )?;
    stream.play()?;
    Ok((stream, consumer, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_duration_and_wav() {
        let recording = Recording::new(vec![0.25; 32_000], 32_000);

        assert_eq!(recording.duration(), Duration::from_secs(1));
        let wav = recording.to_wav(16_000).unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.len(), 16_000);
    }

    #[test]
    fn test_ring_buffer_drain_collects_everything() {
        let (mut producer, mut consumer) = audio::shared_buffer(8).split();
        producer.push_slice(&[0.1, 0.2, 0.3]);
        let mut scratch = vec![0.0; 2];
        let mut samples = Vec::new();

        drain(&mut consumer, &mut scratch, &mut samples);

        assert_eq!(samples, vec![0.1, 0.2, 0.3]);
    }
}
