//! Credential export
//!
//! The collaborator owns the format of its credential files. We only read
//! the file back and hand it out base64-encoded.

use std::io::ErrorKind;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rc_core::error::SessionError;
use rc_core::SessionKey;

use super::manager::{SessionRegistry, CREDENTIALS_FILE};

impl SessionRegistry {
    /// Base64 of `<sessions_dir>/<key>/auth/creds.json`.
    ///
    /// Reads straight from disk, so sessions from an earlier run can still
    /// be exported.
    pub async fn credentials_token(&self, key: &SessionKey) -> Result<String, SessionError> {
        let path = self.auth_dir(key).join(CREDENTIALS_FILE);
        read_token(&path, key).await
    }
}

async fn read_token(path: &Path, key: &SessionKey) -> Result<String, SessionError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(STANDARD.encode(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(SessionError::CredentialsMissing(key.to_string()))
        }
        Err(e) => Err(SessionError::Storage(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(dir.path());
        let session = registry.create("1").await.unwrap();

        let err = registry.credentials_token(&session.key).await.unwrap_err();
        assert!(matches!(err, SessionError::CredentialsMissing(_)));
    }

    #[tokio::test]
    async fn test_token_decodes_to_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(dir.path());
        let session = registry.create("1").await.unwrap();

        let original = b"{\"noiseKey\":{\"private\":\"\\u0000\\u00ff\"},\"registered\":true}\n";
        std::fs::write(session.credentials_path(), original).unwrap();

        let token = registry.credentials_token(&session.key).await.unwrap();
        assert_eq!(STANDARD.decode(token).unwrap(), original.to_vec());
    }

    #[tokio::test]
    async fn test_token_survives_registry_restart() {
        let dir = tempfile::tempdir().unwrap();
        let key = {
            let registry = SessionRegistry::new(dir.path());
            let session = registry.create("1").await.unwrap();
            std::fs::write(session.credentials_path(), b"creds").unwrap();
            session.key.clone()
        };

        let registry = SessionRegistry::new(dir.path());
        let token = registry.credentials_token(&key).await.unwrap();
        assert_eq!(token, STANDARD.encode(b"creds"));
    }
}
