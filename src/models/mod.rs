pub mod review;
pub mod user;

pub use review::{Review, ReviewCreate, ReviewUpdate};
pub use user::User;
