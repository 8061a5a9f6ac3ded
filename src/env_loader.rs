use std::env;
use std::path::PathBuf;

fn override_env_file(raw: Option<std::ffi::OsString>) -> Option<PathBuf> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    Some(PathBuf::from(raw))
}

pub fn load_dotenv() {
    if let Some(path) = override_env_file(env::var_os("VAULT_TIDY_ENV_FILE")) {
        if path.is_file() {
            let _ = dotenvy::from_path(&path);
            return;
        }
    }

    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::override_env_file;
    use std::path::PathBuf;

    #[test]
    fn override_ignored_when_unset_or_empty() {
        assert_eq!(override_env_file(None), None);
        assert_eq!(override_env_file(Some("".into())), None);
    }

    #[test]
    fn override_used_when_present() {
        let got = override_env_file(Some("/tmp/tidy.env".into()));
        assert_eq!(got, Some(PathBuf::from("/tmp/tidy.env")));
    }
}
