pub mod channel;
pub mod handle;
pub mod rank;
pub mod stat;

pub use channel::{Channel, ChannelIdentity, ChannelPatch, Platform};
pub use rank::RankSnapshot;
pub use stat::DailyStat;
