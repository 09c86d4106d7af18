//! Attention monitoring: landmark classification, the periodic probe task and
//! the session's distraction counter.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::Input;
use crate::types::GazeClass;

/// Minimum horizontal eye distance, in pixels, of a face looking at the camera.
const MIN_EYE_DISTANCE: f32 = 18.0;
/// Largest nose offset from the eye midpoint, relative to eye distance.
const MAX_NOSE_OFFSET_RATIO: f32 = 0.42;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The keypoints the classifier needs from one detected face.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaceLandmarks {
    pub left_eye: Option<Point>,
    pub right_eye: Option<Point>,
    pub nose_tip: Option<Point>,
}

/// Classifies the first detected face. A face with missing keypoints counts as `Ok`.
pub fn classify(faces: &[FaceLandmarks]) -> GazeClass {
    let Some(face) = faces.first() else {
        return GazeClass::NoFace;
    };
    let (Some(left), Some(right), Some(nose)) = (face.left_eye, face.right_eye, face.nose_tip) else {
        return GazeClass::Ok;
    };

    let mid_x = (left.x + right.x) / 2.0;
    let eye_distance = (right.x - left.x).abs();
    let ratio = (nose.x - mid_x).abs() / eye_distance.max(1.0);

    if eye_distance < MIN_EYE_DISTANCE || ratio > MAX_NOSE_OFFSET_RATIO {
        GazeClass::Away
    } else {
        GazeClass::Ok
    }
}

/// Counts look-away episodes: only a change from `Ok` into a warning counts.
#[derive(Debug, Default)]
pub struct DistractionCounter {
    count: u32,
    last: GazeClass,
}

impl DistractionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one probe result and returns whether it started a new episode.
    pub fn observe(&mut self, class: GazeClass) -> bool {
        let counted = class.is_warning() && !self.last.is_warning();
        if counted {
            self.count += 1;
        }
        self.last = class;
        counted
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last(&self) -> GazeClass {
        self.last
    }
}

/// A face landmark model bound to a camera.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FaceDetector: Send {
    async fn estimate(&mut self) -> anyhow::Result<Vec<FaceLandmarks>>;
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    initial_delay: Duration,
    period: Duration,
}

impl ProbeConfig {
    pub fn new(initial_delay: Duration, period: Duration) -> Self {
        Self {
            initial_delay,
            period,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(800), Duration::from_millis(1500))
    }
}

pub struct GazeProbe;

impl GazeProbe {
    /// Runs the probe until the task is aborted or the session stops listening.
    /// The period is measured from the end of one probe to the start of the next.
    pub fn spawn(
        mut detector: Box<dyn FaceDetector>,
        config: ProbeConfig,
        sink: mpsc::Sender<Input>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(config.initial_delay).await;
            loop {
                match detector.estimate().await {
                    Ok(faces) => {
                        let class = classify(&faces);
                        if sink.send(Input::Gaze(class)).await.is_err() {
                            tracing::debug!("session gone, stopping gaze probe");
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("gaze probe failed: {}", e),
                }
                tokio::time::sleep(config.period).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn facing(nose_x: f32, eye_distance: f32) -> FaceLandmarks {
        FaceLandmarks {
            left_eye: Some(Point::new(100.0, 50.0)),
            right_eye: Some(Point::new(100.0 + eye_distance, 50.0)),
            nose_tip: Some(Point::new(nose_x, 70.0)),
        }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(&[]), GazeClass::NoFace);
        assert_eq!(classify(&[facing(130.0, 60.0)]), GazeClass::Ok);
        // offset 25 / 60 = 0.416
        assert_eq!(classify(&[facing(155.0, 60.0)]), GazeClass::Ok);
        // offset 26 / 60 = 0.433
        assert_eq!(classify(&[facing(156.0, 60.0)]), GazeClass::Away);
        assert_eq!(classify(&[facing(108.0, 16.0)]), GazeClass::Away);
        assert_eq!(classify(&[FaceLandmarks::default()]), GazeClass::Ok);
    }

    #[test]
    fn test_continuous_look_away_counts_once() {
        let mut counter = DistractionCounter::new();
        let ticks = [
            GazeClass::Ok,
            GazeClass::Away,
            GazeClass::Away,
            GazeClass::NoFace,
            GazeClass::Ok,
            GazeClass::NoFace,
            GazeClass::Ok,
        ];

        let counted: Vec<bool> = ticks.iter().map(|class| counter.observe(*class)).collect();

        assert_eq!(counted, vec![false, true, false, false, false, true, false]);
        assert_eq!(counter.count(), 2);
        assert_eq!(counter.last(), GazeClass::Ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_ticks_after_delay_then_periodically() {
        // --- Arrange ---
        let mut detector = MockFaceDetector::new();
        detector
            .expect_estimate()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("camera not ready")));
        detector.expect_estimate().returning(|| Ok(vec![]));
        let (tx, mut rx) = mpsc::channel(8);
        let start = Instant::now();

        // --- Act ---
        let handle = GazeProbe::spawn(Box::new(detector), ProbeConfig::default(), tx);
        let first = rx.recv().await;
        let first_at = start.elapsed();
        let second = rx.recv().await;
        let second_at = start.elapsed();
        handle.abort();

        // --- Assert ---
        assert!(matches!(first, Some(Input::Gaze(GazeClass::NoFace))));
        assert!(matches!(second, Some(Input::Gaze(GazeClass::NoFace))));
        assert!(first_at >= Duration::from_millis(2300) && first_at < Duration::from_millis(2310));
        assert!(second_at >= Duration::from_millis(3800) && second_at < Duration::from_millis(3820));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_stops_when_session_is_gone() {
        let mut detector = MockFaceDetector::new();
        detector.expect_estimate().returning(|| Ok(vec![FaceLandmarks::default()]));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let handle = GazeProbe::spawn(Box::new(detector), ProbeConfig::default(), tx);

        assert!(handle.await.is_ok());
    }
}
