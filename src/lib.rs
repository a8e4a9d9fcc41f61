pub mod classifier;
pub mod error;
pub mod kv;
pub mod resolver;
pub mod server;

/// Service configuration -- can eventually be parsed from a config
/// file
pub mod config {
    use std::time::Duration;

    /// Default log filter, used when `RUST_LOG` is unset
    pub const RUST_LOG: &str = "info,actix_web=info";

    /// Extensions accepted for uploaded image files
    pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "jfif"];

    /// Bound on a single remote image fetch
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

    /// Pixel height the recognition model expects its input scaled to
    pub const MODEL_INPUT_HEIGHT: u32 = 64;
}
