use crate::error::Result;

/// PEM-encoded certificate and private key, as handed back by a `CertLoader`.
pub struct CertBundle {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

/// Loads a PKCS#12 bundle. Not implemented in this crate — callers inject
/// whatever cryptographic backend they trust.
pub trait CertLoader {
    fn load(&self, bytes: &[u8], password: &str) -> Result<CertBundle>;
}

/// Produces a detached CMS/PKCS#7 signature over the signable byte ranges,
/// using the certificate and private key `prepare_signature` loaded through
/// a `CertLoader`. `needs_path` tells the coordinator whether to stage the
/// signable bytes in a scratch file before calling `sign`.
pub trait Pkcs7Signer {
    fn sign(&self, data: &[u8], cert: &CertBundle) -> Result<Vec<u8>>;

    fn needs_path(&self) -> bool {
        false
    }

    fn sign_path(&self, path: &std::path::Path, cert: &CertBundle) -> Result<Vec<u8>> {
        let data = std::fs::read(path)?;
        self.sign(&data, cert)
    }
}

/// Produces the resources/content stream for the signature appearance's
/// `n2` layer from an external raster image.
pub struct ImageAppearance {
    pub command: Vec<u8>,
    pub resources: crate::dictionary::Dictionary,
}

pub trait ImageEmbedder {
    fn embed(&self, path: &std::path::Path, rect: [f64; 4]) -> Result<ImageAppearance>;
}
