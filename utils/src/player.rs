//! Plays encoded audio clips one at a time on a dedicated thread.
//!
//! The rodio output stream is opened once and owned by the player thread. Each
//! clip gets its own sink; completion is reported through the callback passed
//! to [`SegmentPlayer::play`].

use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub type Completion = Box<dyn FnOnce(anyhow::Result<()>) + Send>;

enum PlayerCommand {
    Play {
        audio: Vec<u8>,
        generation: u64,
        done: Completion,
    },
    Shutdown,
}

pub struct SegmentPlayer {
    commands: mpsc::Sender<PlayerCommand>,
    stop_generation: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl SegmentPlayer {
    /// Opens the default output device.
    pub fn spawn() -> anyhow::Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();
        let (commands, command_rx) = mpsc::channel();
        let stop_generation = Arc::new(AtomicU64::new(0));

        let generation = stop_generation.clone();
        let worker = std::thread::Builder::new()
            .name("segment-player".to_string())
            .spawn(move || run(ready_tx, command_rx, generation))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands,
                stop_generation,
                worker: Some(worker),
            }),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(anyhow::anyhow!("player thread exited before starting"))
            }
        }
    }

    /// Queues `audio`; `done` runs when it has finished, failed or been stopped.
    pub fn play(&self, audio: Vec<u8>, done: Completion) {
        let generation = self.stop_generation.load(Ordering::SeqCst);
        let command = PlayerCommand::Play {
            audio,
            generation,
            done,
        };
        if let Err(mpsc::SendError(PlayerCommand::Play { done, .. })) = self.commands.send(command) {
            done(Err(anyhow::anyhow!("player thread is gone")));
        }
    }

    /// Cuts off the clip currently playing and any clip queued before this call.
    pub fn stop(&self) {
        self.stop_generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for SegmentPlayer {
    fn drop(&mut self) {
        self.stop();
        let _ = self.commands.send(PlayerCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(
    ready_tx: mpsc::Sender<anyhow::Result<()>>,
    commands: mpsc::Receiver<PlayerCommand>,
    stop_generation: Arc<AtomicU64>,
) {
    let stream = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => {
            let _ = ready_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(anyhow::anyhow!("failed to open output stream: {}", e)));
            return;
        }
    };

    while let Ok(command) = commands.recv() {
        match command {
            PlayerCommand::Play {
                audio,
                generation,
                done,
            } => {
                let result = play_clip(&stream, audio, || {
                    stop_generation.load(Ordering::SeqCst) != generation
                });
                if let Err(e) = &result {
                    tracing::warn!("failed to play clip: {}", e);
                }
                done(result);
            }
            PlayerCommand::Shutdown => break,
        }
    }
    tracing::debug!("segment player stopped");
}

fn play_clip(
    stream: &rodio::OutputStream,
    audio: Vec<u8>,
    stopped: impl Fn() -> bool,
) -> anyhow::Result<()> {
    if stopped() {
        return Ok(());
    }
    let source = rodio::Decoder::new(Cursor::new(audio))?;
    let sink = rodio::Sink::connect_new(stream.mixer());
    sink.append(source);
    while !sink.empty() {
        if stopped() {
            sink.stop();
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}
