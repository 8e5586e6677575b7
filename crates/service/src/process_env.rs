use rand::RngCore;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CANDIDATES: [&str; 3] = ["aprassist.env", ".env.local", ".env"];
const REQUEST_ID_BYTES: usize = 8;

pub(crate) fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn strip_inline_comment(value: &str) -> &str {
    // Only treat ` #` as comment start (common dotenv behavior).
    let Some(pos) = value.find(" #") else {
        return value;
    };
    value[..pos].trim_end()
}

fn parse_dotenv_kv(line: &str) -> Option<(String, String)> {
    let mut line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
        return None;
    }
    if let Some(rest) = line.strip_prefix("export ") {
        line = rest.trim();
    }
    let (key, raw_value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let mut value = raw_value.trim();
    if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
        || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
    {
        value = &value[1..value.len() - 1];
    } else {
        value = strip_inline_comment(value);
    }
    Some((key.to_string(), value.to_string()))
}

fn find_env_file_in_dir(dir: &Path) -> Option<PathBuf> {
    ENV_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Applies `KEY=value` lines without overwriting variables already present.
pub(crate) fn apply_env_file(path: &Path) -> usize {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            log::warn!(
                "event=env_file_unreadable path={} err={}",
                path.display(),
                err
            );
            return 0;
        }
    };

    let mut applied = 0usize;
    for line in text.lines() {
        let Some((key, value)) = parse_dotenv_kv(line) else {
            continue;
        };
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
        applied += 1;
    }
    applied
}

/// Looks next to the executable first, then in the working directory.
pub(crate) fn load_env_files() {
    let mut dirs = vec![exe_dir()];
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }
    for dir in dirs {
        let Some(path) = find_env_file_in_dir(&dir) else {
            continue;
        };
        let applied = apply_env_file(&path);
        if applied > 0 {
            log::info!(
                "event=env_file_loaded path={} applied={}",
                path.display(),
                applied
            );
        }
    }
}

pub(crate) fn generate_request_id() -> String {
    let mut bytes = [0u8; REQUEST_ID_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let mut id = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}
