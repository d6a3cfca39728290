use crate::error::EventBusError;
use crate::presenter::{RecoveryAction, SuccessDisplay};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events published as the scanner view changes state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// Camera acquisition or processing in progress
    Loading {
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Live preview is up and frames are being sampled
    ScanningActive {
        width: u32,
        height: u32,
        timestamp: DateTime<Utc>,
    },
    /// A code is with the resolver
    Processing {
        code: String,
        timestamp: DateTime<Utc>,
    },
    /// The scan failed; `actions` lists what the user can do next
    Error {
        message: String,
        actions: Vec<RecoveryAction>,
        timestamp: DateTime<Utc>,
    },
    /// The code resolved to an entity
    Success {
        display: SuccessDisplay,
        navigate_to: String,
        timestamp: DateTime<Utc>,
    },
    /// Leave the scanner view for `target`
    Navigate {
        target: String,
        timestamp: DateTime<Utc>,
    },
    /// Scanning stopped by the user
    Stopped { timestamp: DateTime<Utc> },
    /// Application shutdown requested
    ShutdownRequested {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ScanEvent::Loading { timestamp, .. }
            | ScanEvent::ScanningActive { timestamp, .. }
            | ScanEvent::Processing { timestamp, .. }
            | ScanEvent::Error { timestamp, .. }
            | ScanEvent::Success { timestamp, .. }
            | ScanEvent::Navigate { timestamp, .. }
            | ScanEvent::Stopped { timestamp }
            | ScanEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ScanEvent::Loading { message, .. } => message.clone(),
            ScanEvent::ScanningActive { width, height, .. } => {
                format!("Scanning active ({}x{})", width, height)
            }
            ScanEvent::Processing { code, .. } => format!("Processing code {}", code),
            ScanEvent::Error {
                message, actions, ..
            } => {
                let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
                format!("{} [{}]", message, labels.join(", "))
            }
            ScanEvent::Success {
                display,
                navigate_to,
                ..
            } => format!(
                "{}: {} ({}) -> {}",
                display.title, display.display_name, display.display_id, navigate_to
            ),
            ScanEvent::Navigate { target, .. } => format!("Navigating to {}", target),
            ScanEvent::Stopped { .. } => "Scanning stopped".to_string(),
            ScanEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::Loading { .. } => "loading",
            ScanEvent::ScanningActive { .. } => "scanning_active",
            ScanEvent::Processing { .. } => "processing",
            ScanEvent::Error { .. } => "error",
            ScanEvent::Success { .. } => "success",
            ScanEvent::Navigate { .. } => "navigate",
            ScanEvent::Stopped { .. } => "stopped",
            ScanEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast bus carrying scanner events to any number of listeners
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScanEvent>,
    debug_logging: bool,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    pub fn with_debug_logging(capacity: usize) -> Self {
        Self {
            debug_logging: true,
            ..Self::new(capacity)
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers, returning how many received it
    pub fn publish(&self, event: ScanEvent) -> Result<usize, EventBusError> {
        match &event {
            ScanEvent::Error { message, .. } => warn!("Scan error: {}", message),
            ScanEvent::Success { navigate_to, .. } => {
                info!("Scan resolved, navigating to {}", navigate_to)
            }
            ScanEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason)
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    All,
    EventTypes(Vec<&'static str>),
    Custom(fn(&ScanEvent) -> bool),
}

impl EventFilter {
    pub fn matches(&self, event: &ScanEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Named receiver that only yields events passing its filter
pub struct EventReceiver {
    receiver: broadcast::Receiver<ScanEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(receiver: broadcast::Receiver<ScanEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<ScanEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!("Receiver '{}' received: {}", self.name, event.description());
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, missed);
                    return Err(EventBusError::Lagged { missed });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<ScanEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, missed);
                    return Err(EventBusError::Lagged { missed });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    error!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
