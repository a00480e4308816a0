pub mod context;
pub mod handler;

pub use context::TurnContext;
pub use handler::{LuisBot, LUIS_KEY};
