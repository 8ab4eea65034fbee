pub mod notifier;
pub mod registry;
pub mod scheduler;

pub use notifier::{ChannelNotifier, Notifier, Outbound};
pub use registry::SessionRegistry;
pub use scheduler::{Enqueued, Scheduler, SchedulerBuilder};
