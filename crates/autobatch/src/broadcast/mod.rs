pub mod catalogue_events;
pub mod notifications;

pub use catalogue_events::{CatalogueEvent, CatalogueEventBroadcaster, ChangeReason};
pub use notifications::{
    Notification, NotificationBroadcaster, NotificationKind, NotificationSink, Severity,
};
