//! Find the public key sshd authenticated the session with.

use std::path::Path;

/// Extract the first public key from an sshd `ExposeAuthInfo` file.
///
/// Each line reads `<method> <details>`; public key lines look like
/// `publickey ssh-ed25519 AAAA...`.
pub fn public_key_from_auth_info(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let key = line.trim().strip_prefix("publickey ")?.trim();
        (!key.is_empty()).then(|| key.to_string())
    })
}

/// Read the public key from the file sshd names in `SSH_USER_AUTH`.
pub async fn read_auth_info(path: &Path) -> std::io::Result<Option<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(public_key_from_auth_info(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_publickey_line() {
        let info = "keyboard-interactive\npublickey ssh-ed25519 AAAAC3Nza\n";
        assert_eq!(
            public_key_from_auth_info(info).as_deref(),
            Some("ssh-ed25519 AAAAC3Nza")
        );
    }

    #[test]
    fn no_publickey_line_is_none() {
        assert_eq!(public_key_from_auth_info("password\n"), None);
        assert_eq!(public_key_from_auth_info("publickey \n"), None);
        assert_eq!(public_key_from_auth_info(""), None);
    }

    #[tokio::test]
    async fn reads_auth_info_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "publickey ssh-rsa AAAAB3Nza\n").unwrap();

        let key = read_auth_info(tmp.path()).await.unwrap();
        assert_eq!(key.as_deref(), Some("ssh-rsa AAAAB3Nza"));
    }
}
