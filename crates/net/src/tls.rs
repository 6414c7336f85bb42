//! Handshake-time certificate checks for requests that bring a validator

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use xfer_errors::NetworkError;

use crate::transport::CertificateValidator;

/// Hands the peer's leaf certificate to a [`CertificateValidator`] while the
/// TLS handshake is still running
///
/// The validator replaces the platform trust store for this connection. A
/// rejection aborts the handshake, so no request bytes reach the peer.
/// Handshake signatures are still verified with the crypto provider.
pub(crate) struct CertificateGate {
    validator: Arc<dyn CertificateValidator>,
    provider: Arc<CryptoProvider>,
    rejected: AtomicBool,
}

impl CertificateGate {
    pub(crate) fn new(validator: Arc<dyn CertificateValidator>) -> Self {
        Self {
            validator,
            provider: Arc::new(crypto::ring::default_provider()),
            rejected: AtomicBool::new(false),
        }
    }

    /// The validator turned the peer down during the handshake
    pub(crate) fn rejected(&self) -> bool {
        self.rejected.load(Ordering::Acquire)
    }

    /// rustls configuration that routes certificate checks through `gate`
    pub(crate) fn client_config(gate: Arc<Self>) -> Result<ClientConfig, NetworkError> {
        let provider = Arc::clone(&gate.provider);
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| NetworkError::TlsError(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(gate)
            .with_no_client_auth();
        Ok(config)
    }
}

impl fmt::Debug for CertificateGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateGate")
            .field("rejected", &self.rejected())
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for CertificateGate {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self.validator.validate(end_entity.as_ref()) {
            Ok(ServerCertVerified::assertion())
        } else {
            self.rejected.store(true, Ordering::Release);
            tracing::debug!("certificate validator rejected the peer");
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn verify(gate: &CertificateGate, der: &[u8]) -> Result<ServerCertVerified, rustls::Error> {
        let name = ServerName::try_from("example.com").unwrap();
        gate.verify_server_cert(
            &CertificateDer::from(der.to_vec()),
            &[],
            &name,
            &[],
            UnixTime::now(),
        )
    }

    #[test]
    fn test_validator_sees_leaf_der() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let gate = CertificateGate::new(Arc::new(move |der: &[u8]| {
            sink.lock().unwrap().extend_from_slice(der);
            true
        }));

        assert!(verify(&gate, b"\x30\x03leaf").is_ok());
        assert_eq!(seen.lock().unwrap().as_slice(), b"\x30\x03leaf");
        assert!(!gate.rejected());
    }

    #[test]
    fn test_rejection_fails_the_handshake() {
        let gate = CertificateGate::new(Arc::new(|_der: &[u8]| false));
        let err = verify(&gate, b"anything").unwrap_err();

        assert!(matches!(
            err,
            rustls::Error::InvalidCertificate(CertificateError::ApplicationVerificationFailure)
        ));
        assert!(gate.rejected());
    }

    #[test]
    fn test_client_config_builds() {
        let gate = Arc::new(CertificateGate::new(Arc::new(|_der: &[u8]| true)));
        let config = CertificateGate::client_config(gate).unwrap();
        assert!(config.alpn_protocols.is_empty());
    }
}
