pub mod api;
pub mod error;
pub mod seed;
pub mod storage;

pub use api::{app, router, AppState};
pub use error::{StoreError, StoreResult};
pub use storage::Storage;
