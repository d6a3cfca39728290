use crate::events::{EventBus, ScanEvent};
use crate::resolver::{EntityType, ResolvedEntity};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Next step offered to the user after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    RetryScan,
    ManualEntry,
}

impl RecoveryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::RetryScan => "Try Again",
            RecoveryAction::ManualEntry => "Enter Manually",
        }
    }
}

/// What the user sees when a code resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessDisplay {
    pub title: String,
    pub entity_type: EntityType,
    pub display_name: String,
    pub display_id: String,
    pub action_label: String,
}

impl From<&ResolvedEntity> for SuccessDisplay {
    fn from(entity: &ResolvedEntity) -> Self {
        Self {
            title: entity.entity_type.title(),
            entity_type: entity.entity_type,
            display_name: entity.display_name.clone(),
            display_id: entity.display_id.clone(),
            action_label: entity.entity_type.action_label(),
        }
    }
}

/// Reflects coordinator state into whatever the user is looking at
pub trait StatusPresenter: Send + Sync {
    fn loading(&self, message: &str);

    fn scanning_active(&self, dimensions: (u32, u32));

    fn processing(&self, code: &str);

    /// `actions` is never empty
    fn error(&self, message: &str, actions: &[RecoveryAction]);

    fn success(&self, display: &SuccessDisplay, navigate_to: &str);

    /// The post-success delay elapsed; leave for `target`
    fn navigate(&self, target: &str);

    fn stopped(&self);
}

/// Presenter that publishes every update on the event bus
#[derive(Clone)]
pub struct EventBusPresenter {
    bus: EventBus,
}

impl EventBusPresenter {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn emit(&self, event: ScanEvent) {
        // Nobody listening is normal while the view has no renderer attached
        if let Err(e) = self.bus.publish(event) {
            debug!("Status update not delivered: {}", e);
        }
    }
}

impl StatusPresenter for EventBusPresenter {
    fn loading(&self, message: &str) {
        self.emit(ScanEvent::Loading {
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn scanning_active(&self, dimensions: (u32, u32)) {
        self.emit(ScanEvent::ScanningActive {
            width: dimensions.0,
            height: dimensions.1,
            timestamp: Utc::now(),
        });
    }

    fn processing(&self, code: &str) {
        self.emit(ScanEvent::Processing {
            code: code.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn error(&self, message: &str, actions: &[RecoveryAction]) {
        self.emit(ScanEvent::Error {
            message: message.to_string(),
            actions: actions.to_vec(),
            timestamp: Utc::now(),
        });
    }

    fn success(&self, display: &SuccessDisplay, navigate_to: &str) {
        self.emit(ScanEvent::Success {
            display: display.clone(),
            navigate_to: navigate_to.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn navigate(&self, target: &str) {
        self.emit(ScanEvent::Navigate {
            target: target.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn stopped(&self) {
        self.emit(ScanEvent::Stopped {
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_display_from_entity() {
        let display = SuccessDisplay::from(&ResolvedEntity {
            entity_type: EntityType::Material,
            display_name: "Birch Plywood 18mm".to_string(),
            display_id: "MAT-00231".to_string(),
            navigate_to: "/scan/material/MAT-00231/".to_string(),
        });

        assert_eq!(display.title, "Material Detected");
        assert_eq!(display.action_label, "View Material Details");
        assert_eq!(display.display_id, "MAT-00231");
    }

    #[tokio::test]
    async fn test_presenter_publishes_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let presenter = EventBusPresenter::new(bus);

        presenter.loading("Starting camera...");
        presenter.error("Unknown code", &[RecoveryAction::RetryScan]);

        assert_eq!(rx.recv().await.unwrap().event_type(), "loading");
        match rx.recv().await.unwrap() {
            ScanEvent::Error { message, actions, .. } => {
                assert_eq!(message, "Unknown code");
                assert_eq!(actions, vec![RecoveryAction::RetryScan]);
            }
            other => panic!("Unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_presenter_without_listeners_is_silent() {
        let presenter = EventBusPresenter::new(EventBus::new(4));
        presenter.stopped();
        presenter.navigate("/jobs/42/");
    }
}
