pub mod blur;
pub mod discovery;
pub mod duplicate;
pub mod face;
pub mod hash;
pub mod image;
pub mod stale;

pub use blur::{UnreadablePolicy, is_blurry, sharpness};
pub use duplicate::{DuplicateIndex, DuplicatePolicy};
pub use face::{FaceEncoder, FaceEncoding, FaceMatchRecord, matches_reference};
pub use hash::{PerceptualHash, PerceptualHasher, compute_hash};
pub use self::image::{ImageRecord, Status};
pub use stale::{is_stale, parse_cutoff};
