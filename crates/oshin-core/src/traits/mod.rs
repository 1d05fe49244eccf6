pub mod directory;
pub mod sink;
pub mod store;

pub use directory::OwnerDirectory;
pub use sink::NotificationSink;
pub use store::RecordStore;
