//! FNV-1 hashing used to scramble key indices
//!
//! Both variants fold the little-endian octets of the input through FNV-1
//! (multiply, then xor) and return the absolute value of the signed result, so
//! outputs are always non-negative and stable across runs and platforms.

pub const FNV_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
pub const FNV_PRIME_32: u32 = 16_777_619;

pub const FNV_OFFSET_BASIS_64: u64 = 0xcbf2_9ce4_8422_2325;
pub const FNV_PRIME_64: u64 = 1_099_511_628_211;

/// Hash an integer key index (alias for [`fnv_hash32`])
#[inline]
pub fn hash(val: u32) -> u32 {
    fnv_hash32(val)
}

/// 32-bit FNV hash of the four octets of `val`
pub fn fnv_hash32(mut val: u32) -> u32 {
    let mut hashval = FNV_OFFSET_BASIS_32;

    for _ in 0..4 {
        let octet = val & 0xff;
        val >>= 8;

        hashval ^= octet;
        hashval = hashval.wrapping_mul(FNV_PRIME_32);
    }

    (hashval as i32).unsigned_abs()
}

/// 64-bit FNV hash of the eight octets of `val`
pub fn fnv_hash64(mut val: u64) -> u64 {
    let mut hashval = FNV_OFFSET_BASIS_64;

    for _ in 0..8 {
        let octet = val & 0xff;
        val >>= 8;

        hashval ^= octet;
        hashval = hashval.wrapping_mul(FNV_PRIME_64);
    }

    (hashval as i64).unsigned_abs()
}
