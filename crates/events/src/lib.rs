//! Vigil notification delivery.
//!
//! - [`Notifier`]: bounded queue plus background worker that hands each
//!   [`NotificationEvent`](vigil_core::NotificationEvent) to every configured
//!   channel, isolating failures per channel.
//! - [`NotificationChannel`]: the seam every delivery transport implements.
//! - [`delivery`]: SMTP email and webhook transports.
//! - [`EventBus`]: in-process topic that pub/sub bridges subscribe to.

pub mod bus;
pub mod channel;
pub mod delivery;
pub mod notifier;

pub use bus::{BusChannel, EventBus};
pub use channel::{ChannelError, NotificationChannel};
pub use delivery::email::{EmailChannel, EmailConfig};
pub use delivery::webhook::WebhookChannel;
pub use notifier::{dispatch, DispatchReport, Notifier, NotifierHandle};
