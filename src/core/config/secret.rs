use std::{fs, io, path::Path, path::PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use super::parsing::env_optional;

/// Reads the signing key persisted by a previous development run, or writes a fresh one.
///
/// Failures to persist are logged and the freshly generated key is still returned, so a
/// read-only checkout keeps working with a per-process key.
pub(super) fn load_or_create_secret_key() -> String {
    load_or_create_at(&secret_file_path())
}

fn load_or_create_at(path: &Path) -> String {
    if let Some(existing) = read_key(path) {
        return existing;
    }

    let new_key = generate_secret_key();

    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::warn!(error = %err, path = %parent.display(), "Failed to create secret key directory");
        }
    }

    match write_new_key(path, &new_key) {
        Ok(()) => new_key,
        // Another process won the race; its key is the one tokens were signed with.
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            read_key(path).unwrap_or(new_key)
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "Failed to persist secret key");
            new_key
        }
    }
}

fn read_key(path: &Path) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn write_new_key(path: &Path, key: &str) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            tracing::warn!(error = %err, path = %path.display(), "Failed to restrict secret key file");
        }
    }

    io::Write::write_all(&mut file, key.as_bytes())
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn secret_file_path() -> PathBuf {
    env_optional("LOGBOOK_SECRET_KEY_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("quran-logbook-secret-{}-{name}", std::process::id()))
            .join(".secret_key")
    }

    #[test]
    fn generated_key_is_persisted_and_reused() {
        let path = scratch_path("reuse");
        let _ = fs::remove_file(&path);

        let first = load_or_create_at(&path);
        let second = load_or_create_at(&path);

        assert_eq!(first, second);
        assert_eq!(first.len(), 86);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn blank_key_file_is_not_trusted() {
        let path = scratch_path("blank");
        fs::create_dir_all(path.parent().expect("parent")).expect("dir");
        fs::write(&path, "   \n").expect("write blank");

        assert_eq!(read_key(&path), None);
        let _ = fs::remove_file(&path);
    }
}
