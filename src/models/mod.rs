pub mod activity;
pub mod user;

pub use activity::{ActivityLogEntry, ActivityQuery, ActivityType, NewActivity};
pub use user::{NewUser, User, UserChanges};
