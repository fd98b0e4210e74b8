//! List Azure resource groups using a workload identity credential.
//!
//! - [`pager`] - Generic page enumeration
//! - [`azure`] - Authentication, HTTP, and Resource Manager listing
//! - [`config`] - Settings from flags, environment, and config file

pub mod azure;
pub mod config;
pub mod pager;

/// Version injected at compile time via AZRG_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("AZRG_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
