//! ============================================================================
//! Wallet - key pair generation
//! ============================================================================
//! Generates a random secp256k1 key pair and derives its address. Keys are
//! returned to the caller and never stored.
//! ============================================================================

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::access::address_of;
use crate::types::Wallet;

/// Generate a fresh random wallet.
pub fn generate() -> Wallet {
    let signing_key = SigningKey::random(&mut OsRng);
    let address = address_of(signing_key.verifying_key());

    Wallet {
        address,
        private_key: format!("0x{}", hex::encode(signing_key.to_bytes())),
    }
}
