use std::path::PathBuf;

use super::VaultOptions;
use crate::env::EnvSource;
use crate::errors::TlsError;

/// PEM material used when talking to an `https` store.
#[derive(Clone, Default)]
pub struct TlsMaterial {
    /// Extra root certificate.
    pub ca_cert: Option<Vec<u8>>,
    /// Client certificate followed by its private key.
    pub identity: Option<Vec<u8>>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca_cert", &self.ca_cert.is_some())
            .field("identity", &self.identity.is_some())
            .finish()
    }
}

impl TlsMaterial {
    /// Reads the files named by the TLS environment variables of `options`.
    /// Unset or blank variables are skipped; a certificate without a key (or
    /// a key without a certificate) is rejected.
    pub fn from_env(env: &dyn EnvSource, options: &VaultOptions) -> Result<Self, TlsError> {
        let ca_path = path_var(env, &options.ca_cert_env_var);
        let cert_path = path_var(env, &options.client_cert_env_var);
        let key_path = path_var(env, &options.client_key_env_var);

        let ca_cert = ca_path.map(|path| read_pem("CA certificate", path)).transpose()?;

        let identity = match (cert_path, key_path) {
            (Some(cert), Some(key)) => {
                let mut pem = read_pem("client certificate", cert)?;
                if !pem.ends_with(b"\n") {
                    pem.push(b'\n');
                }
                pem.extend(read_pem("client key", key)?);
                Some(pem)
            }
            (Some(_), None) => return Err(TlsError::MissingPrivateKey),
            (None, Some(_)) => return Err(TlsError::MissingCertificate),
            (None, None) => None,
        };

        Ok(Self { ca_cert, identity })
    }

    pub fn is_empty(&self) -> bool {
        self.ca_cert.is_none() && self.identity.is_none()
    }
}

fn path_var(env: &dyn EnvSource, name: &str) -> Option<PathBuf> {
    env.var(name).map(|value| value.trim().to_string()).filter(|v| !v.is_empty()).map(PathBuf::from)
}

fn read_pem(what: &'static str, path: PathBuf) -> Result<Vec<u8>, TlsError> {
    std::fs::read(&path).map_err(|source| TlsError::ReadError { what, path, source })
}
