pub mod config;
pub mod error;
pub mod fs;
pub mod types;

pub use error::{KdsnapError, KdsnapResult};
pub use types::{EncryptedBrigade, EncryptedSecretPair};

/// Default directory holding the realm and authority key files
pub const DEFAULT_KEYS_PATH: &str = "/etc/vg-keydesk-snap";

/// Hard cap for key material files (16 KiB); larger files are rejected, never truncated
pub const MAX_KEYS_FILE_SIZE: u64 = 16 * 1024;

/// Size of the externally supplied pre-shared key
pub const PSK_SIZE: usize = 32;
