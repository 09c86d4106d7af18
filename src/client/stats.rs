#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    requests: u64,
    streams_opened: u64,
    bytes_received: u64,
    failures: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&mut self) {
        self.requests += 1;
    }

    pub(crate) fn record_stream(&mut self) {
        self.streams_opened += 1;
    }

    pub(crate) fn record_bytes(&mut self, len: usize) {
        self.bytes_received += len as u64;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn streams_opened(&self) -> u64 {
        self.streams_opened
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}
