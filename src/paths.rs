use std::path::{Path, PathBuf};

/// `.env` consulted for API keys: `$CONTEXTSWEEP_HOME/.env`, else `$HOME/.env`.
pub fn home_env_path() -> Option<PathBuf> {
    std::env::var_os("CONTEXTSWEEP_HOME")
        .or_else(|| std::env::var_os("HOME"))
        .map(|home| PathBuf::from(home).join(".env"))
}

/// Run logs live beside the results they describe: `out/results.jsonl` keeps
/// its logs in `out/results.logs/`.
pub fn run_log_dir(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "contextsweep".to_string());
    output.with_file_name(format!("{stem}.logs"))
}

/// Log file for one run of a sweep into `output`.
pub fn run_log_path(output: &Path, run_id: &str) -> PathBuf {
    run_log_dir(output).join(format!("run-{run_id}.log"))
}
