pub mod action;
pub mod codec;
pub mod error;
pub mod filename;
pub mod media;
pub mod payload;
pub mod types;

pub use action::MediaAction;
pub use codec::{DecodeError, decode_payload, encode_payload};
pub use error::MediaError;
pub use filename::sanitize_filename;
pub use media::{MediaItem, MediaItemUpdate, NewMediaItem};
pub use payload::{CapabilityPayload, Expiration, GenerateOptions, PayloadFields};
pub use types::MediaId;
