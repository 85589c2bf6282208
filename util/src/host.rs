//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "SWERVE_SW_ROOT";

/// Get the root directory of the software, as given by the `SWERVE_SW_ROOT`
/// environment variable.
pub fn get_swerve_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
