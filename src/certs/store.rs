//! Client certificate storage.
//!
//! Records are parsed completely before they are inserted, so a concurrent
//! lookup either sees the whole record or nothing.

use dashmap::DashMap;
use rustls::pki_types::CertificateDer;
use sha2::{Digest, Sha256};
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while adding certificates to the store.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PEM data contains no certificate")]
    NoCertificate,

    #[error("PEM data contains no private key")]
    MissingPrivateKey,

    #[error("certificate {0} already exists")]
    Duplicate(String),
}

/// A stored client certificate chain with its private key.
///
/// The bundle is validated at parse time and kept as PEM, which is the form
/// TLS client builders take.
#[derive(Debug)]
pub struct CertificateRecord {
    id: String,
    pem: Vec<u8>,
}

impl CertificateRecord {
    /// Parse a combined PEM bundle (certificate chain followed or preceded by a key).
    pub fn from_pem(pem: &[u8]) -> Result<Self, CertificateError> {
        let chain = rustls_pemfile::certs(&mut BufReader::new(pem)).collect::<Result<Vec<_>, _>>()?;
        let leaf = chain.first().ok_or(CertificateError::NoCertificate)?;
        let id = certificate_id(leaf);

        rustls_pemfile::private_key(&mut BufReader::new(pem))?.ok_or(CertificateError::MissingPrivateKey)?;

        Ok(Self { id, pem: pem.to_vec() })
    }

    /// Identifier: hex SHA-256 of the leaf certificate DER.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The PEM bundle, as handed to TLS client builders.
    pub fn pem(&self) -> &[u8] {
        &self.pem
    }
}

/// Compute the store identifier for a certificate.
pub fn certificate_id(cert: &CertificateDer<'_>) -> String {
    hex::encode(Sha256::digest(cert.as_ref()))
}

/// Thread-safe lookup of client certificates by ID.
#[derive(Debug, Clone, Default)]
pub struct CertificateStore {
    inner: Arc<DashMap<String, Arc<CertificateRecord>>>,
}

impl CertificateStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a combined PEM bundle. Returns the new record's ID.
    pub fn add(&self, pem: &[u8]) -> Result<String, CertificateError> {
        let record = CertificateRecord::from_pem(pem)?;
        let id = record.id.clone();

        match self.inner.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(CertificateError::Duplicate(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(record));
                tracing::info!(cert_id = %id, "Certificate added");
                Ok(id)
            }
        }
    }

    /// Load a combined PEM file from disk.
    pub fn add_file(&self, path: &Path) -> Result<String, CertificateError> {
        let pem = std::fs::read(path)?;
        self.add(&pem)
    }

    /// Look up a certificate by ID.
    pub fn get(&self, id: &str) -> Option<Arc<CertificateRecord>> {
        self.inner.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Remove a certificate. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.inner.remove(id).is_some();
        if removed {
            tracing::info!(cert_id = %id, "Certificate removed");
        }
        removed
    }

    /// IDs of all stored certificates.
    pub fn ids(&self) -> Vec<String> {
        self.inner.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
