//! Monotonic transfer-progress tracking.

use std::sync::Arc;

use parking_lot::Mutex;

/// Which transfer direction a progress sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressChannel {
    /// Request body transmission.
    Upload,
    /// Response body reception.
    Download,
}

type ProgressCallback = dyn Fn(f32) + Send + Sync;

struct ChannelState {
    last: f32,
    subscribers: Vec<Arc<ProgressCallback>>,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            last: 0.0,
            subscribers: Vec::new(),
        }
    }
}

/// Holds the last-reported upload/download fractions for one request and
/// notifies subscribers only when a sample strictly exceeds the last.
///
/// The dispatcher feeds this tracker once per scheduling tick with whatever
/// fractions the transport currently reports. Regressions and duplicate
/// samples are suppressed, so polling at arbitrary cadence produces at most
/// one notification per distinct increasing value.
pub struct ProgressTracker {
    upload: Mutex<ChannelState>,
    download: Mutex<ChannelState>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create a tracker with both channels at 0.0 and no subscribers.
    pub fn new() -> Self {
        Self {
            upload: Mutex::new(ChannelState::new()),
            download: Mutex::new(ChannelState::new()),
        }
    }

    /// Register a subscriber for one channel's increasing samples.
    pub fn subscribe(
        &self,
        channel: ProgressChannel,
        callback: impl Fn(f32) + Send + Sync + 'static,
    ) {
        self.channel(channel).lock().subscribers.push(Arc::new(callback));
    }

    /// The last value reported on a channel.
    pub fn last(&self, channel: ProgressChannel) -> f32 {
        self.channel(channel).lock().last
    }

    /// Feed a progress sample.
    ///
    /// If `value` strictly exceeds the channel's last value, the channel is
    /// updated and every subscriber is invoked with `value`; otherwise this
    /// is a no-op.
    pub fn report(&self, channel: ProgressChannel, value: f32) {
        let subscribers = {
            let mut state = self.channel(channel).lock();
            if value <= state.last {
                return;
            }
            state.last = value;
            state.subscribers.clone()
        };

        for subscriber in &subscribers {
            subscriber(value);
        }
    }

    fn channel(&self, channel: ProgressChannel) -> &Mutex<ChannelState> {
        match channel {
            ProgressChannel::Upload => &self.upload,
            ProgressChannel::Download => &self.download,
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("upload", &self.upload.lock().last)
            .field("download", &self.download.lock().last)
            .finish()
    }
}
