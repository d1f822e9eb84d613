//! TLS plumbing shared by the management client.

use std::error::Error;

/// Install the ring crypto provider as the process default.
///
/// Harmless when a provider is already installed.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Find a rustls error anywhere in an error's source chain.
///
/// rustls failures reach callers wrapped in `io::Error`s, whose `source()`
/// skips the wrapped error, so those are unwrapped explicitly.
pub fn find_tls_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a rustls::Error> {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);

    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(tls);
        }
        current = match e.downcast_ref::<std::io::Error>().and_then(|io| io.get_ref()) {
            Some(inner) => Some(inner as &(dyn Error + 'static)),
            None => e.source(),
        };
    }
    None
}
