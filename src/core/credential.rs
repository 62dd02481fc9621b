//! Spend authorization.
//!
//! Addresses are opaque strings to the ledger. Whether the holder of an unlocking credential is
//! really allowed to use it is decided by a [`CredentialVerifier`] the ledger is handed at open
//! time; the message is the ID of the transaction doing the spending.

pub trait CredentialVerifier {
    fn verify(&self, credential: &str, message: &[u8]) -> bool;
}

/// Accepts every credential. The default for a ledger with no verifier installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueCredentials;

impl CredentialVerifier for OpaqueCredentials {
    fn verify(&self, _credential: &str, _message: &[u8]) -> bool {
        true
    }
}

impl<F> CredentialVerifier for F
where
    F: Fn(&str, &[u8]) -> bool,
{
    fn verify(&self, credential: &str, message: &[u8]) -> bool {
        self(credential, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_credentials_accept_anything() {
        assert!(OpaqueCredentials.verify("Alice", b"txid"));
        assert!(OpaqueCredentials.verify("", &[]));
    }

    #[test]
    fn test_closure_verifier() {
        let only_alice = |credential: &str, _message: &[u8]| credential == "Alice";
        assert!(only_alice.verify("Alice", b"txid"));
        assert!(!only_alice.verify("Mallory", b"txid"));
    }
}
