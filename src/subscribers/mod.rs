//! Event subscribers: the [`Subscribe`] extension point and the
//! [`SubscriberSet`] fan-out.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
