use std::fs;
use std::path::{Path, PathBuf};
use log::{info, warn};
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use x509_parser::pem::Pem;

use crate::config::types::{ClientConfig, ServerConfig};
use crate::error::ConfigError;

fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &'static str) -> Result<&'a Path, ConfigError> {
    path.as_deref().ok_or(ConfigError::MissingTlsFile { flag })
}

/**
 * Logs subject and validity of every certificate in `pem`.
 * Fails if there is no certificate at all or one of them can not be decoded.
 */
pub fn inspect_certificates(path: &Path, pem: &[u8]) -> Result<usize, ConfigError> {
    let mut count = 0;

    for block in Pem::iter_from_buffer(pem) {
        let block = block.map_err(|err| ConfigError::InvalidCertificate {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        if block.label != "CERTIFICATE" {
            continue;
        }

        let x509 = block.parse_x509().map_err(|err| ConfigError::InvalidCertificate {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let validity = x509.validity();
        info!(
            "Certificate {}: subject \"{}\", valid from {} until {}",
            path.display(),
            x509.subject(),
            validity.not_before,
            validity.not_after,
        );
        if !validity.is_valid() {
            warn!("Certificate {} is not valid at this time", path.display());
        }

        count += 1;
    }

    if count == 0 {
        return Err(ConfigError::NoCertificate { path: path.to_path_buf() });
    }

    Ok(count)
}

fn read_certificate(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let pem = read_file(path)?;
    inspect_certificates(path, &pem)?;
    Ok(pem)
}

impl ServerConfig {
    pub fn tls_config(&self) -> Result<Option<ServerTlsConfig>, ConfigError> {
        if !self.tls {
            return Ok(None);
        }

        let cert = read_certificate(required(&self.cert, "cert")?)?;
        let key = read_file(required(&self.key, "key")?)?;

        Ok(Some(ServerTlsConfig::new().identity(Identity::from_pem(cert, key))))
    }
}

impl ClientConfig {
    pub fn tls_config(&self) -> Result<Option<ClientTlsConfig>, ConfigError> {
        if !self.tls {
            return Ok(None);
        }

        let ca = read_certificate(required(&self.cert, "cert")?)?;

        Ok(Some(
            ClientTlsConfig::new()
                .ca_certificate(Certificate::from_pem(ca))
                .domain_name(self.server_host_override.clone())
        ))
    }
}
