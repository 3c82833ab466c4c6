//! Capability token minting

use firma_types::AccessToken;
use rand::rngs::OsRng;
use rand::RngCore;

/// Mint an unguessable bearer token from 32 bytes of OS randomness.
///
/// Never derived from public signatory fields: knowing a signer's name
/// and email must give no purchase on their token.
pub fn mint_token() -> AccessToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    AccessToken::new(hex::encode(bytes))
}
