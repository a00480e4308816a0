pub mod activity;
pub mod botfile;
pub mod error;
pub mod settings;

pub use activity::{Activity, ActivityType, ChannelAccount, ConversationAccount};
pub use botfile::{BotConfiguration, BotService, EndpointService, LuisService};
pub use error::{Error, Result};
pub use settings::Settings;
