// Licensed under the Apache-2.0 license

//! PSA Crypto identifiers shared by the client and the service.
//!
//! Values are the PSA Crypto API encodings; they are part of the ABI and must
//! not be renumbered.

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// `psa_key_id_t`
pub type KeyId = u32;

pub const KEY_ID_NULL: KeyId = 0;
pub const KEY_ID_USER_MIN: KeyId = 0x0000_0001;
pub const KEY_ID_USER_MAX: KeyId = 0x3fff_ffff;
pub const KEY_ID_VENDOR_MIN: KeyId = 0x4000_0000;
pub const KEY_ID_VENDOR_MAX: KeyId = 0x7fff_ffff;
/// Platform provisioned keys. Never present in the ownership table.
pub const KEY_ID_BUILTIN_MIN: KeyId = 0x7fff_0000;
pub const KEY_ID_BUILTIN_MAX: KeyId = 0x7fff_efff;
/// Identifiers handed out by the service for volatile keys.
pub const KEY_ID_VOLATILE_MIN: KeyId = 0x7fff_f000;
pub const KEY_ID_VOLATILE_MAX: KeyId = 0x7fff_ffff;

pub const fn key_id_is_builtin(id: KeyId) -> bool {
    id >= KEY_ID_BUILTIN_MIN && id <= KEY_ID_BUILTIN_MAX
}

pub const fn key_id_is_volatile(id: KeyId) -> bool {
    id >= KEY_ID_VOLATILE_MIN && id <= KEY_ID_VOLATILE_MAX
}

pub const fn key_id_is_user(id: KeyId) -> bool {
    id >= KEY_ID_USER_MIN && id <= KEY_ID_USER_MAX
}

/// `psa_algorithm_t`
#[repr(transparent)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Algorithm(pub u32);

impl Algorithm {
    const CATEGORY_MASK: u32 = 0x7f00_0000;
    const CATEGORY_HASH: u32 = 0x0200_0000;
    const CATEGORY_MAC: u32 = 0x0300_0000;
    const CATEGORY_CIPHER: u32 = 0x0400_0000;
    const CATEGORY_AEAD: u32 = 0x0500_0000;
    const CATEGORY_SIGN: u32 = 0x0600_0000;
    const CATEGORY_ASYMMETRIC_ENCRYPTION: u32 = 0x0700_0000;
    const CATEGORY_KEY_DERIVATION: u32 = 0x0800_0000;
    const CATEGORY_KEY_AGREEMENT: u32 = 0x0900_0000;
    const HASH_MASK: u32 = 0x0000_00ff;
    const AEAD_TAG_LENGTH_MASK: u32 = 0x003f_0000;
    const AEAD_TAG_LENGTH_OFFSET: u32 = 16;

    pub const NONE: Self = Self(0);

    pub const SHA_224: Self = Self(0x0200_0008);
    pub const SHA_256: Self = Self(0x0200_0009);
    pub const SHA_384: Self = Self(0x0200_000a);
    pub const SHA_512: Self = Self(0x0200_000b);

    pub const CMAC: Self = Self(0x03c0_0200);

    pub const CTR: Self = Self(0x04c0_1000);
    pub const CFB: Self = Self(0x04c0_1100);
    pub const OFB: Self = Self(0x04c0_1200);
    pub const CBC_NO_PADDING: Self = Self(0x0440_4000);
    pub const CBC_PKCS7: Self = Self(0x0440_4100);
    pub const ECB_NO_PADDING: Self = Self(0x0440_4400);

    pub const CCM: Self = Self(0x0550_0100);
    pub const GCM: Self = Self(0x0550_0200);
    pub const CHACHA20_POLY1305: Self = Self(0x0510_0500);

    pub const RSA_PKCS1V15_CRYPT: Self = Self(0x0720_0200);

    pub const ECDH: Self = Self(0x0902_0000);

    /// Vendor algorithm selecting the platform's hardware-unique-key
    /// derivation instead of the generic KDF engine.
    pub const HUK_DERIVATION: Self = Self(0xb000_0f00);

    pub const fn hmac(hash: Algorithm) -> Self {
        Self(0x0380_0000 | (hash.0 & Self::HASH_MASK))
    }

    pub const fn ecdsa(hash: Algorithm) -> Self {
        Self(0x0600_0600 | (hash.0 & Self::HASH_MASK))
    }

    pub const fn deterministic_ecdsa(hash: Algorithm) -> Self {
        Self(0x0600_0700 | (hash.0 & Self::HASH_MASK))
    }

    pub const fn hkdf(hash: Algorithm) -> Self {
        Self(0x0800_0100 | (hash.0 & Self::HASH_MASK))
    }

    pub const fn tls12_prf(hash: Algorithm) -> Self {
        Self(0x0800_0200 | (hash.0 & Self::HASH_MASK))
    }

    const fn category(self) -> u32 {
        self.0 & Self::CATEGORY_MASK
    }

    /// Vendor defined algorithms carry the top bit.
    pub const fn is_vendor(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    pub const fn is_hash(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_HASH
    }

    pub const fn is_mac(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_MAC
    }

    pub const fn is_hmac(self) -> bool {
        (self.0 & 0x7fc0_0000) == 0x0380_0000
    }

    pub const fn is_cipher(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_CIPHER
    }

    pub const fn is_aead(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_AEAD
    }

    pub const fn is_sign(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_SIGN
    }

    pub const fn is_ecdsa(self) -> bool {
        (self.0 & !0x0000_01ff) == 0x0600_0600
    }

    pub const fn is_asymmetric_encryption(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_ASYMMETRIC_ENCRYPTION
    }

    pub const fn is_key_derivation(self) -> bool {
        self.0 == Self::HUK_DERIVATION.0
            || (!self.is_vendor() && self.category() == Self::CATEGORY_KEY_DERIVATION)
    }

    pub const fn is_key_agreement(self) -> bool {
        !self.is_vendor() && self.category() == Self::CATEGORY_KEY_AGREEMENT
    }

    pub const fn is_hkdf(self) -> bool {
        (self.0 & !Self::HASH_MASK) == 0x0800_0100
    }

    pub const fn is_tls12_prf(self) -> bool {
        (self.0 & !Self::HASH_MASK) == 0x0800_0200
    }

    /// Hash algorithm embedded in a MAC, signature or KDF algorithm.
    pub const fn hash(self) -> Algorithm {
        if self.is_hash() {
            return self;
        }
        match self.0 & Self::HASH_MASK {
            0 => Self::NONE,
            h => Self(Self::CATEGORY_HASH | h),
        }
    }

    /// Digest size of a hash algorithm, or of the hash inside a composite
    /// algorithm. Zero when unknown.
    pub const fn hash_length(self) -> usize {
        match self.hash().0 {
            0x0200_0008 => 28,
            0x0200_0009 => 32,
            0x0200_000a => 48,
            0x0200_000b => 64,
            _ => 0,
        }
    }

    /// Tag length encoded in an AEAD algorithm.
    pub const fn aead_tag_length(self) -> usize {
        ((self.0 & Self::AEAD_TAG_LENGTH_MASK) >> Self::AEAD_TAG_LENGTH_OFFSET) as usize
    }

    /// AEAD algorithm with the default tag length.
    pub const fn aead_default_tag(self) -> Algorithm {
        match self.0 & !Self::AEAD_TAG_LENGTH_MASK {
            0x0540_0100 => Self::CCM,
            0x0540_0200 => Self::GCM,
            0x0500_0500 => Self::CHACHA20_POLY1305,
            _ => self,
        }
    }
}

impl From<u32> for Algorithm {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Algorithm> for u32 {
    fn from(alg: Algorithm) -> Self {
        alg.0
    }
}

/// `psa_key_type_t`
#[repr(transparent)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyType(pub u16);

impl KeyType {
    const CATEGORY_MASK: u16 = 0x7000;
    const CATEGORY_PUBLIC_KEY: u16 = 0x4000;
    const CATEGORY_KEY_PAIR: u16 = 0x7000;
    const ECC_CURVE_MASK: u16 = 0x00ff;

    pub const NONE: Self = Self(0);
    pub const RAW_DATA: Self = Self(0x1001);
    pub const HMAC: Self = Self(0x1100);
    pub const DERIVE: Self = Self(0x1200);
    pub const AES: Self = Self(0x2400);

    pub const ECC_FAMILY_SECP_R1: u16 = 0x12;

    pub const fn ecc_key_pair(family: u16) -> Self {
        Self(0x7100 | family)
    }

    pub const fn ecc_public_key(family: u16) -> Self {
        Self(0x4100 | family)
    }

    pub const fn is_ecc(self) -> bool {
        (self.0 & 0xcf00) == 0x4100
    }

    pub const fn is_key_pair(self) -> bool {
        (self.0 & Self::CATEGORY_MASK) == Self::CATEGORY_KEY_PAIR
    }

    pub const fn is_public_key(self) -> bool {
        (self.0 & Self::CATEGORY_MASK) == Self::CATEGORY_PUBLIC_KEY
    }

    pub const fn is_asymmetric(self) -> bool {
        self.is_key_pair() || self.is_public_key()
    }

    pub const fn ecc_family(self) -> u16 {
        self.0 & Self::ECC_CURVE_MASK
    }

    /// Public key type matching a key pair type.
    pub const fn public_of_key_pair(self) -> Self {
        Self(self.0 & !0x3000)
    }
}

impl From<u16> for KeyType {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

bitflags! {
    /// `psa_key_usage_t`
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyUsage: u32 {
        const EXPORT = 0x0000_0001;
        const COPY = 0x0000_0002;
        const CACHE = 0x0000_0004;
        const ENCRYPT = 0x0000_0100;
        const DECRYPT = 0x0000_0200;
        const SIGN_MESSAGE = 0x0000_0400;
        const VERIFY_MESSAGE = 0x0000_0800;
        const SIGN_HASH = 0x0000_1000;
        const VERIFY_HASH = 0x0000_2000;
        const DERIVE = 0x0000_4000;
        const VERIFY_DERIVATION = 0x0000_8000;
    }
}

/// `psa_key_lifetime_t`
pub type KeyLifetime = u32;
pub const KEY_LIFETIME_VOLATILE: KeyLifetime = 0x0000_0000;
pub const KEY_LIFETIME_PERSISTENT: KeyLifetime = 0x0000_0001;

/// `psa_key_derivation_step_t`
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDerivationStep {
    Secret = 0x0101,
    Password = 0x0102,
    Label = 0x0201,
    Salt = 0x0202,
    Info = 0x0203,
    Seed = 0x0204,
    Cost = 0x0205,
}

impl TryFrom<u16> for KeyDerivationStep {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, ()> {
        match value {
            0x0101 => Ok(Self::Secret),
            0x0102 => Ok(Self::Password),
            0x0201 => Ok(Self::Label),
            0x0202 => Ok(Self::Salt),
            0x0203 => Ok(Self::Info),
            0x0204 => Ok(Self::Seed),
            0x0205 => Ok(Self::Cost),
            _ => Err(()),
        }
    }
}

/// Key attributes as carried in an input vector.
#[repr(C)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable,
)]
pub struct KeyAttributes {
    pub key_type: u16,
    pub bits: u16,
    pub lifetime: u32,
    pub id: u32,
    pub usage: u32,
    pub alg: u32,
}
const _: () = assert!(core::mem::size_of::<KeyAttributes>() == 20);

impl KeyAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type.0;
        self
    }

    pub fn with_bits(mut self, bits: usize) -> Self {
        self.bits = bits as u16;
        self
    }

    pub fn with_usage(mut self, usage: KeyUsage) -> Self {
        self.usage = usage.bits();
        self
    }

    pub fn with_algorithm(mut self, alg: Algorithm) -> Self {
        self.alg = alg.0;
        self
    }

    pub fn with_lifetime(mut self, lifetime: KeyLifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Setting an identifier makes the key persistent.
    pub fn with_id(mut self, id: KeyId) -> Self {
        self.id = id;
        if self.lifetime == KEY_LIFETIME_VOLATILE {
            self.lifetime = KEY_LIFETIME_PERSISTENT;
        }
        self
    }

    pub fn key_type(&self) -> KeyType {
        KeyType(self.key_type)
    }

    pub fn bits(&self) -> usize {
        self.bits as usize
    }

    pub fn usage(&self) -> KeyUsage {
        KeyUsage::from_bits_truncate(self.usage)
    }

    pub fn algorithm(&self) -> Algorithm {
        Algorithm(self.alg)
    }
}
