use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Explicit, overridable knobs that would otherwise be scattered hardcoded
/// constants: signature/`ByteRange` reservation widths, the temp directory,
/// the `/Producer` string, and the RNG behind the widget name suffix
/// (seedable so tests are deterministic).
pub struct Config {
    /// Hex characters reserved for `/Contents`. Default `11742` (5871 bytes).
    pub signature_hex_capacity: usize,
    /// Bytes reserved for the `/ByteRange [ a b c d ]` entry. Default `68`.
    pub byte_range_capacity: usize,
    /// Directory used for the scratch file handed to a path-based signer.
    pub temp_dir: PathBuf,
    /// Value written to `/Producer` on the Info dictionary during signing.
    pub producer: String,
    /// RNG used to generate the 8-character alphanumeric widget name suffix.
    pub widget_name_rng: StdRng,
}

impl Config {
    pub fn with_seed(seed: u64) -> Self {
        Config {
            widget_name_rng: StdRng::seed_from_u64(seed),
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            signature_hex_capacity: 11742,
            byte_range_capacity: 68,
            temp_dir: std::env::temp_dir(),
            producer: "Modificado con SAPP".to_string(),
            widget_name_rng: StdRng::from_os_rng(),
        }
    }
}
