pub mod digest;
pub mod message;
pub mod owner;
pub mod status;

pub use digest::{Digest, DigestBlock, DigestWindow};
pub use message::{MessageField, OutgoingMessage, Presentation};
pub use owner::{DirectoryUser, eligible_owners};
pub use status::{StatusItem, StatusKind, Submission};
