pub mod card;
pub mod console;
pub mod traits;

pub use card::Card;
pub use console::ConsoleChannel;
pub use traits::{Channel, InboundMessage, Reply};
