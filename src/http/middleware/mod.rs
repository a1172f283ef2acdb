pub mod admission;

pub use admission::{admission_middleware, X_RATELIMIT_REMAINING};
