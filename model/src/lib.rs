mod config;
mod idiom;
mod key;
mod message;

pub use config::{AppConfigProperty, ApplicationConfig, Toggles};
pub use idiom::{Idiom, IdiomOrder, Implementation, ParseIdiomOrderError};
pub use key::{EntityKey, EntityKind};
pub use message::MessageForUser;
