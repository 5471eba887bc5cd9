pub mod config;
pub mod error;
pub mod identity;
pub mod limiter;
pub mod normalize;
pub mod types;

pub use config::Config;
pub use error::HeirloomError;
pub use identity::{
    canonical_author_link, fingerprint, id_from_permalink, resolve_post_id, structured_id_value,
};
pub use limiter::{Decision, FixedWindowLimiter};
pub use normalize::clean_text;
pub use types::*;
