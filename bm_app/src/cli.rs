use std::path::PathBuf;

/// Default location of the manager configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/manager.toml";

/// Configuration file path: the first command-line argument, or `default`
pub fn config_path(default: &str) -> PathBuf {
    config_path_from(std::env::args(), default)
}

fn config_path_from(args: impl IntoIterator<Item = String>, default: &str) -> PathBuf {
    args.into_iter().nth(1).filter(|arg| !arg.trim().is_empty()).map_or_else(|| PathBuf::from(default), PathBuf::from)
}
