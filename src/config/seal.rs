//! Password sealing for config files.
//!
//! ```text
//! "FLSEAL" | version u8 | salt [16] | nonce [16] | ciphertext | tag [32]
//! ```
//! The password is stretched with iterated SHA-256 over a random salt into
//! an AES-128-CTR key and an HMAC-SHA256 key. The tag covers everything
//! before it and is checked before anything is decrypted.

use aes::Aes128;
use aes::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes128Ctr = Ctr128BE<Aes128>;
type HmacSha256 = Hmac<Sha256>;

const MAGIC: &[u8; 6] = b"FLSEAL";
const VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + NONCE_LEN;
const STRETCH_ROUNDS: u32 = 10_000;

struct Keys {
    enc: [u8; 16],
    mac: [u8; 32],
}

fn derive_keys(password: &str, salt: &[u8]) -> Keys {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());

    for _ in 1..STRETCH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt);
        digest.copy_from_slice(&hasher.finalize());
    }

    let mut enc = [0u8; 16];
    enc.copy_from_slice(&digest[..16]);

    let mut hasher = Sha256::new();
    hasher.update(b"fantasy-config-mac");
    hasher.update(digest);
    let mut mac = [0u8; 32];
    mac.copy_from_slice(&hasher.finalize());

    Keys { enc, mac }
}

/// Whether `bytes` start with the sealed-file header.
#[must_use]
pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] == MAGIC
}

#[must_use]
pub fn seal(plain: &[u8], password: &str) -> Vec<u8> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let keys = derive_keys(password, &salt);

    let mut out = Vec::with_capacity(HEADER_LEN + plain.len() + TAG_LEN);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);

    let start = out.len();
    out.extend_from_slice(plain);
    let mut cipher = Aes128Ctr::new(&keys.enc.into(), &nonce.into());
    cipher.apply_keystream(&mut out[start..]);

    // HMAC accepts keys of any length.
    if let Ok(mut mac) = HmacSha256::new_from_slice(&keys.mac) {
        mac.update(&out);
        out.extend_from_slice(&mac.finalize().into_bytes());
    }
    out
}

/// Verifies and decrypts. `None` means a wrong password or a damaged file.
#[must_use]
pub fn open(sealed: &[u8], password: &str) -> Option<Vec<u8>> {
    if !is_sealed(sealed) || sealed.len() < HEADER_LEN + TAG_LEN || sealed[MAGIC.len()] != VERSION {
        return None;
    }
    let salt = &sealed[MAGIC.len() + 1..MAGIC.len() + 1 + SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&sealed[MAGIC.len() + 1 + SALT_LEN..HEADER_LEN]);
    let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let keys = derive_keys(password, salt);
    let mut mac = HmacSha256::new_from_slice(&keys.mac).ok()?;
    mac.update(body);
    mac.verify_slice(tag).ok()?;

    let mut plain = body[HEADER_LEN..].to_vec();
    let mut cipher = Aes128Ctr::new(&keys.enc.into(), &nonce.into());
    cipher.apply_keystream(&mut plain);
    Some(plain)
}
