pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{discover, load_from_path, load_from_str, ConfigError, CONFIG_FILE};
pub use schema::{
    host_goarch, host_goos, BuildConfig, CheckConfig, Config, PackageStub, ValidationError,
    ValidationIssue,
};
pub use version::GoVersion;
