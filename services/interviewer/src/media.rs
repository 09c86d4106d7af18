//! Device adapters: cpal microphone capture and rodio playback behind the
//! orchestrator's media traits.

use anyhow::Context;
use async_trait::async_trait;
use interview_realtime::media::{ActiveCapture, AudioOutput, Microphone, PlaybackDone, RecordedAudio};
use interview_realtime::types::audio::TRANSCRIPTION_SAMPLE_RATE;
use interview_realtime_utils::capture::MicCapture;
use interview_realtime_utils::player::SegmentPlayer;

pub struct CpalMicrophone {
    device: Option<String>,
}

impl CpalMicrophone {
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }
}

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn open(&self) -> anyhow::Result<Box<dyn ActiveCapture>> {
        let device = self.device.clone();
        let capture = tokio::task::spawn_blocking(move || MicCapture::start(device.as_deref()))
            .await
            .context("capture thread failed")??;
        tracing::debug!("microphone opened");
        Ok(Box::new(CpalCapture { capture }))
    }
}

struct CpalCapture {
    capture: MicCapture,
}

#[async_trait]
impl ActiveCapture for CpalCapture {
    fn level(&self) -> f32 {
        self.capture.level()
    }

    async fn finish(self: Box<Self>) -> anyhow::Result<RecordedAudio> {
        let capture = self.capture;
        let wav = tokio::task::spawn_blocking(move || {
            let recording = capture.stop()?;
            tracing::info!("recorded {:.1}s", recording.duration().as_secs_f32());
            recording.to_wav(TRANSCRIPTION_SAMPLE_RATE)
        })
        .await
        .context("capture thread failed")??;
        Ok(RecordedAudio::wav(wav))
    }

    fn discard(self: Box<Self>) {
        let capture = self.capture;
        // Dropping joins the capture thread.
        tokio::task::spawn_blocking(move || drop(capture));
    }
}

pub struct RodioOutput {
    player: SegmentPlayer,
}

impl RodioOutput {
    pub async fn open() -> anyhow::Result<Self> {
        let player = tokio::task::spawn_blocking(SegmentPlayer::spawn)
            .await
            .context("player thread failed")??;
        Ok(Self { player })
    }
}

impl AudioOutput for RodioOutput {
    fn play(&self, audio: Vec<u8>) -> PlaybackDone {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.player.play(
            audio,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(anyhow::anyhow!("player dropped the clip")))
        })
    }

    fn stop(&self) {
        self.player.stop();
    }
}
