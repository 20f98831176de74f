pub mod config;
pub mod console;
pub mod error;
pub mod face;
pub mod host;
pub mod offset;
pub mod registry;
pub mod render;
pub mod timezones;
pub mod widget;

pub use error::ClockError;
pub use face::{ClockFace, Hand, Page, WidgetId};
pub use registry::{ClockTemplate, Registry};
pub use timezones::{TimeZoneEntry, TimeZoneSource};
pub use widget::{Activation, ClockWidget};
