// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The server's own application instance certificate.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use ctrl_core::{ServerError, ServerResult};

use super::fingerprint;

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";
const SERIAL_LEN: usize = 16;

// =============================================================================
// ApplicationCertificate
// =============================================================================

/// A loaded or generated application instance certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationCertificate {
    /// Subject distinguished name.
    pub subject: String,
    /// DER bytes.
    pub der: Vec<u8>,
    /// End of validity, when known.
    pub not_after: Option<DateTime<Utc>>,
    /// File the certificate was read from or written to.
    pub path: Option<PathBuf>,
}

impl ApplicationCertificate {
    /// Returns the SHA-256 fingerprint.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.der)
    }

    /// Encodes the certificate as PEM.
    pub fn to_pem(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&self.der);
        let body = b64
            .as_bytes()
            .chunks(64)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n{}\n{}\n", PEM_BEGIN, body, PEM_END)
    }

    /// Returns `false` once `not_after` has passed.
    pub fn is_valid(&self) -> bool {
        self.not_after.map_or(true, |end| Utc::now() <= end)
    }
}

/// Decodes PEM or raw DER certificate bytes.
pub(crate) fn decode_certificate(bytes: &[u8]) -> Result<Vec<u8>, String> {
    if bytes.is_empty() {
        return Err("file is empty".to_string());
    }

    let text = match std::str::from_utf8(bytes) {
        Ok(text) if text.trim_start().starts_with(PEM_BEGIN) => text,
        _ => return Ok(bytes.to_vec()),
    };

    let body: String = text
        .lines()
        .map(str::trim)
        .skip_while(|line| *line != PEM_BEGIN)
        .skip(1)
        .take_while(|line| *line != PEM_END)
        .collect();

    let der = base64::engine::general_purpose::STANDARD
        .decode(body.as_bytes())
        .map_err(|e| format!("invalid PEM body: {}", e))?;
    if der.is_empty() {
        return Err("PEM block is empty".to_string());
    }
    Ok(der)
}

// =============================================================================
// CertificateProvider
// =============================================================================

/// Parameters for obtaining the application certificate.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    /// Certificate file.
    pub path: PathBuf,
    /// Subject used when a certificate is created.
    pub subject: String,
    /// Application URI embedded in a created certificate.
    pub application_uri: String,
    /// Validity of a created certificate.
    pub validity_days: u32,
    /// Create the certificate when the file is missing.
    pub create_if_missing: bool,
    /// Delete any existing certificate and create a new one.
    pub renew: bool,
}

/// Source of the application instance certificate.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    /// Returns the provider name.
    fn name(&self) -> &str;

    /// Obtains the certificate, failing with `CertificateInvalid` when none
    /// is available.
    async fn obtain(&self, request: &CertificateRequest) -> ServerResult<ApplicationCertificate>;
}

// =============================================================================
// FileCertificateProvider
// =============================================================================

/// Reads the certificate from disk, creating a self-signed placeholder when
/// allowed.
///
/// Generated certificates carry the subject, application URI, validity window
/// and a random serial in a DER-framed blob. They identify the instance but
/// are not X.509 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCertificateProvider;

impl FileCertificateProvider {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }

    /// Reads a certificate file.
    ///
    /// Subject and validity come from the file when it was generated here;
    /// any other certificate is labelled with `fallback_subject` and has no
    /// known end of validity.
    async fn load(&self, path: &Path, fallback_subject: &str) -> ServerResult<ApplicationCertificate> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ServerError::certificate_invalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        let der = decode_certificate(&bytes).map_err(|e| {
            ServerError::certificate_invalid(format!("{}: {}", path.display(), e))
        })?;

        let (subject, not_after) = match parse_generated(&der) {
            Some((subject, not_after)) => (subject, Some(not_after)),
            None => (fallback_subject.to_string(), None),
        };

        Ok(ApplicationCertificate {
            subject,
            der,
            not_after,
            path: Some(path.to_path_buf()),
        })
    }

    async fn create(&self, request: &CertificateRequest) -> ServerResult<ApplicationCertificate> {
        let not_before = Utc::now();
        let not_after = not_before + chrono::Duration::days(i64::from(request.validity_days));

        info!(
            subject = %request.subject,
            validity_days = request.validity_days,
            path = %request.path.display(),
            "Creating application instance certificate"
        );

        let certificate = ApplicationCertificate {
            subject: request.subject.clone(),
            der: generate_der(request, not_before, not_after),
            not_after: Some(not_after),
            path: Some(request.path.clone()),
        };

        if let Some(parent) = request.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ServerError::certificate_invalid(format!(
                    "cannot create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        tokio::fs::write(&request.path, certificate.to_pem())
            .await
            .map_err(|e| {
                ServerError::certificate_invalid(format!(
                    "cannot write {}: {}",
                    request.path.display(),
                    e
                ))
            })?;

        Ok(certificate)
    }
}

#[async_trait]
impl CertificateProvider for FileCertificateProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn obtain(&self, request: &CertificateRequest) -> ServerResult<ApplicationCertificate> {
        let path = &request.path;
        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);

        if request.renew && exists {
            info!(path = %path.display(), "Deleting application instance certificate for renewal");
            tokio::fs::remove_file(path).await.map_err(|e| {
                ServerError::certificate_invalid(format!("cannot delete {}: {}", path.display(), e))
            })?;
            return self.create(request).await;
        }

        if exists {
            let certificate = self.load(path, &request.subject).await?;
            info!(
                path = %path.display(),
                fingerprint = %certificate.fingerprint(),
                "Loaded application instance certificate"
            );
            return Ok(certificate);
        }

        if request.create_if_missing || request.renew {
            return self.create(request).await;
        }

        warn!(path = %path.display(), "Application instance certificate missing");
        Err(ServerError::certificate_invalid(format!(
            "no certificate at {} and creation is disabled",
            path.display()
        )))
    }
}

fn generate_der(
    request: &CertificateRequest,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> Vec<u8> {
    let serial: [u8; SERIAL_LEN] = rand::random();

    let mut body = Vec::new();
    body.extend_from_slice(&serial);
    body.extend_from_slice(request.subject.as_bytes());
    body.push(0x00);
    body.extend_from_slice(request.application_uri.as_bytes());
    body.push(0x00);
    body.extend_from_slice(&not_before.timestamp().to_be_bytes());
    body.extend_from_slice(&not_after.timestamp().to_be_bytes());

    // SEQUENCE with definite length.
    let mut der = vec![0x30];
    push_length(&mut der, body.len());
    der.extend_from_slice(&body);
    der
}

/// Appends a DER length in the shortest form.
fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Reads subject and end of validity back from a blob made by `generate_der`.
fn parse_generated(der: &[u8]) -> Option<(String, DateTime<Utc>)> {
    let (&tag, rest) = der.split_first()?;
    if tag != 0x30 {
        return None;
    }
    let (&first, rest) = rest.split_first()?;
    let (len, body) = if first < 0x80 {
        (usize::from(first), rest)
    } else {
        let n = usize::from(first & 0x7F);
        if n == 0 || n > std::mem::size_of::<usize>() || rest.len() < n {
            return None;
        }
        let len = rest[..n]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        (len, &rest[n..])
    };
    if body.len() != len || len < SERIAL_LEN + 2 + 16 {
        return None;
    }

    let mut fields = body[SERIAL_LEN..].splitn(3, |b| *b == 0);
    let subject = std::str::from_utf8(fields.next()?).ok()?;
    let _application_uri = fields.next()?;
    let times: [u8; 16] = fields.next()?.try_into().ok()?;

    let mut end = [0u8; 8];
    end.copy_from_slice(&times[8..]);
    let not_after = Utc.timestamp_opt(i64::from_be_bytes(end), 0).single()?;
    Some((subject.to_string(), not_after))
}

// =============================================================================
// StaticCertificateProvider
// =============================================================================

/// Serves a fixed certificate, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticCertificateProvider {
    certificate: Option<ApplicationCertificate>,
}

impl StaticCertificateProvider {
    /// Always returns `certificate`.
    pub fn new(certificate: ApplicationCertificate) -> Self {
        Self {
            certificate: Some(certificate),
        }
    }

    /// Never returns a certificate.
    pub fn unavailable() -> Self {
        Self { certificate: None }
    }
}

#[async_trait]
impl CertificateProvider for StaticCertificateProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn obtain(&self, _request: &CertificateRequest) -> ServerResult<ApplicationCertificate> {
        self.certificate
            .clone()
            .ok_or_else(|| ServerError::certificate_invalid("no certificate configured"))
    }
}
