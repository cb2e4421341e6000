use std::collections::HashMap;
use std::time::Duration;

// ════════════════════════════════════════════════════════════════
//  Publish Settings
// ════════════════════════════════════════════════════════════════

/// What a publisher does when its flow-control limits are hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitExceededBehavior {
    #[default]
    Ignore,
    Block,
    SignalError,
}

/// Outstanding-message limits of a batching publisher.
/// `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowControlSettings {
    pub max_outstanding_messages: Option<usize>,
    pub max_outstanding_bytes: Option<usize>,
    pub limit_exceeded_behavior: LimitExceededBehavior,
}

impl Default for FlowControlSettings {
    fn default() -> Self {
        Self {
            max_outstanding_messages: Some(1000),
            max_outstanding_bytes: None,
            limit_exceeded_behavior: LimitExceededBehavior::Ignore,
        }
    }
}

/// Batching settings applied to a topic handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub delay_threshold: Duration,
    pub count_threshold: usize,
    pub byte_threshold: usize,
    pub num_workers: usize,
    pub timeout: Duration,
    pub flow_control: FlowControlSettings,
    pub enable_compression: bool,
    pub compression_bytes_threshold: usize,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            delay_threshold: Duration::from_millis(10),
            count_threshold: 100,
            byte_threshold: 1_000_000,
            num_workers: 25 * parallelism(),
            timeout: Duration::from_secs(60),
            flow_control: FlowControlSettings::default(),
            enable_compression: false,
            compression_bytes_threshold: 240,
        }
    }
}

/// Per-message metadata attached on publish.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageSettings {
    pub ordering_key: String,
    pub attributes: HashMap<String, String>,
}

impl MessageSettings {
    /// Ordering must be enabled on the topic whenever a key is set.
    pub fn enable_message_ordering(&self) -> bool {
        !self.ordering_key.is_empty()
    }
}

fn parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

// ════════════════════════════════════════════════════════════════
//  Publish Options
// ════════════════════════════════════════════════════════════════

/// Overlay of publish settings. Unset fields keep their defaults.
///
/// ```
/// use std::time::Duration;
/// use pubsub_api::PublishOptions;
///
/// let options = PublishOptions::new()
///     .with_delay_threshold(Duration::from_millis(50))
///     .with_ordering_key("user-42");
/// let (settings, message) = options.resolve();
/// assert_eq!(settings.delay_threshold, Duration::from_millis(50));
/// assert!(message.enable_message_ordering());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub delay_threshold: Option<Duration>,
    pub count_threshold: Option<usize>,
    pub byte_threshold: Option<usize>,
    pub num_workers: Option<usize>,
    pub timeout: Option<Duration>,
    pub flow_control: Option<FlowControlSettings>,
    pub enable_compression: Option<bool>,
    pub compression_bytes_threshold: Option<usize>,
    pub ordering_key: Option<String>,
    pub attributes: Option<HashMap<String, String>>,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_threshold(mut self, d: Duration) -> Self {
        self.delay_threshold = Some(d);
        self
    }

    pub fn with_count_threshold(mut self, n: usize) -> Self {
        self.count_threshold = Some(n);
        self
    }

    pub fn with_byte_threshold(mut self, n: usize) -> Self {
        self.byte_threshold = Some(n);
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = Some(n);
        self
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    pub fn with_flow_control(mut self, fc: FlowControlSettings) -> Self {
        self.flow_control = Some(fc);
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = Some(enabled);
        self
    }

    pub fn with_compression_bytes_threshold(mut self, n: usize) -> Self {
        self.compression_bytes_threshold = Some(n);
        self
    }

    pub fn with_ordering_key(mut self, key: impl Into<String>) -> Self {
        self.ordering_key = Some(key.into());
        self
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Overlay these options onto the defaults.
    pub fn resolve(&self) -> (PublishSettings, MessageSettings) {
        let mut settings = PublishSettings::default();
        let mut message = MessageSettings::default();
        self.apply(&mut settings, &mut message);
        (settings, message)
    }

    /// Overlay these options onto existing settings.
    pub fn apply(&self, settings: &mut PublishSettings, message: &mut MessageSettings) {
        if let Some(v) = self.delay_threshold {
            settings.delay_threshold = v;
        }
        if let Some(v) = self.count_threshold {
            settings.count_threshold = v;
        }
        if let Some(v) = self.byte_threshold {
            settings.byte_threshold = v;
        }
        if let Some(v) = self.num_workers {
            settings.num_workers = v;
        }
        if let Some(v) = self.timeout {
            settings.timeout = v;
        }
        if let Some(v) = &self.flow_control {
            settings.flow_control = v.clone();
        }
        if let Some(v) = self.enable_compression {
            settings.enable_compression = v;
        }
        if let Some(v) = self.compression_bytes_threshold {
            settings.compression_bytes_threshold = v;
        }
        if let Some(v) = &self.ordering_key {
            message.ordering_key = v.clone();
        }
        if let Some(v) = &self.attributes {
            message.attributes = v.clone();
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Receive Settings / Options
// ════════════════════════════════════════════════════════════════

/// Settings of a subscription receive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSettings {
    pub max_extension: Duration,
    pub max_extension_period: Duration,
    pub min_extension_period: Duration,
    pub max_outstanding_messages: usize,
    pub max_outstanding_bytes: usize,
    pub use_legacy_flow_control: bool,
    pub num_workers: usize,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            max_extension: Duration::from_secs(60 * 60),
            max_extension_period: Duration::ZERO,
            min_extension_period: Duration::ZERO,
            max_outstanding_messages: 1000,
            max_outstanding_bytes: 1_000_000_000,
            use_legacy_flow_control: false,
            num_workers: 10,
        }
    }
}

/// Overlay of receive settings. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    pub max_extension: Option<Duration>,
    pub max_extension_period: Option<Duration>,
    pub min_extension_period: Option<Duration>,
    pub max_outstanding_messages: Option<usize>,
    pub max_outstanding_bytes: Option<usize>,
    pub use_legacy_flow_control: Option<bool>,
    pub num_workers: Option<usize>,
}

impl ReceiveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_extension(mut self, d: Duration) -> Self {
        self.max_extension = Some(d);
        self
    }

    pub fn with_max_extension_period(mut self, d: Duration) -> Self {
        self.max_extension_period = Some(d);
        self
    }

    pub fn with_min_extension_period(mut self, d: Duration) -> Self {
        self.min_extension_period = Some(d);
        self
    }

    pub fn with_max_outstanding_messages(mut self, n: usize) -> Self {
        self.max_outstanding_messages = Some(n);
        self
    }

    pub fn with_max_outstanding_bytes(mut self, n: usize) -> Self {
        self.max_outstanding_bytes = Some(n);
        self
    }

    pub fn with_legacy_flow_control(mut self, enabled: bool) -> Self {
        self.use_legacy_flow_control = Some(enabled);
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = Some(n);
        self
    }

    /// Overlay these options onto the defaults.
    pub fn resolve(&self) -> ReceiveSettings {
        let mut settings = ReceiveSettings::default();
        self.apply(&mut settings);
        settings
    }

    pub fn apply(&self, settings: &mut ReceiveSettings) {
        if let Some(v) = self.max_extension {
            settings.max_extension = v;
        }
        if let Some(v) = self.max_extension_period {
            settings.max_extension_period = v;
        }
        if let Some(v) = self.min_extension_period {
            settings.min_extension_period = v;
        }
        if let Some(v) = self.max_outstanding_messages {
            settings.max_outstanding_messages = v;
        }
        if let Some(v) = self.max_outstanding_bytes {
            settings.max_outstanding_bytes = v;
        }
        if let Some(v) = self.use_legacy_flow_control {
            settings.use_legacy_flow_control = v;
        }
        if let Some(v) = self.num_workers {
            settings.num_workers = v;
        }
    }
}
