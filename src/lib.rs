pub mod authz;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod guards;
pub mod jwt;
pub mod models;
pub mod session;
pub mod storage;
pub mod utils;

// Re-export commonly used items for tests and embedders
pub use client::{HttpIdentityApi, IdentityApi};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use errors::{AppError, AppResult};
pub use guards::{AuthGate, RoleGate};
pub use session::{SessionController, SessionMonitor};
pub use storage::{FileStore, MemoryStore, SessionStorage};
