//! CRC32 engine for yEnc payload verification and per-file CRC stitching
//!
//! Byte-span CRCs use the IEEE 802.3 polynomial (0xEDB88320, reflected,
//! init/xorout 0xFFFFFFFF) — the CRC that appears in `=yend crc32=` fields.
//! Accumulation is delegated to `crc32fast`; this module adds the GF(2)[x]
//! arithmetic needed to *combine* CRCs of adjacent byte ranges without
//! rescanning them: a download can check each article part against its
//! `pcrc32` and then fold the part CRCs into the whole-file CRC.
//!
//! All values live in the reflected bit order used by the CRC itself, so
//! `x^0` is `0x8000_0000` and `x^1` is `0x4000_0000`.

use crc32fast::Hasher;

/// Reflected IEEE CRC32 polynomial.
const POLY: u32 = 0xEDB8_8320;

/// Multiplicative order of `x` in GF(2)[x]/P(x): exponents reduce modulo this.
const ORDER: u64 = 0xFFFF_FFFF;

/// x^0, the multiplicative identity in reflected representation.
const ONE: u32 = 1 << 31;

/// CRC32 of `buf`, continuing from a previous CRC value.
///
/// Pass `0` to start a fresh CRC. The return value is final (xorout applied)
/// and can be fed back in as `init` for the next span.
pub fn crc32(buf: &[u8], init: u32) -> u32 {
    let mut hasher = Hasher::new_with_initial(init);
    hasher.update(buf);
    hasher.finalize()
}

/// Polynomial multiplication modulo P(x), reflected.
const fn mult_mod_poly(a: u32, b: u32) -> u32 {
    if a == 0 {
        return 0;
    }
    let mut m = 1u32 << 31;
    let mut b = b;
    let mut p = 0u32;
    loop {
        if a & m != 0 {
            p ^= b;
            if a & (m - 1) == 0 {
                break;
            }
        }
        m >>= 1;
        b = if b & 1 != 0 { (b >> 1) ^ POLY } else { b >> 1 };
    }
    p
}

/// x^(2^k) modulo P(x), for k in 0..32, built by repeated squaring of x^1.
const X2N_TABLE: [u32; 32] = {
    let mut table = [0u32; 32];
    table[0] = 1 << 30; // x^1
    let mut n = 1;
    while n < 32 {
        table[n] = mult_mod_poly(table[n - 1], table[n - 1]);
        n += 1;
    }
    table
};

/// x^n modulo P(x) in O(log n) via the squaring table.
fn xpow(mut n: u64) -> u32 {
    let mut p = ONE;
    let mut k = 0usize;
    while n > 0 {
        if n & 1 != 0 {
            p = mult_mod_poly(X2N_TABLE[k & 31], p);
        }
        n >>= 1;
        k += 1;
    }
    p
}

/// Multiply two CRC-domain polynomials modulo the CRC polynomial.
pub fn crc32_multiply(a: u32, b: u32) -> u32 {
    mult_mod_poly(a, b)
}

/// x^n modulo P(x); `n` is reduced modulo the order of x (0xFFFFFFFF).
pub fn crc32_2pow(n: u64) -> u32 {
    xpow(n % ORDER)
}

/// x^(8n) modulo P(x); `n` is reduced modulo the order of x (0xFFFFFFFF).
///
/// This is the "shift by n bytes" operator: multiplying a CRC by
/// `crc32_256pow(n)` is equivalent to appending n zero bytes to its message.
pub fn crc32_256pow(n: u64) -> u32 {
    xpow((n % ORDER) * 8)
}

/// CRC of the concatenation `A ++ B` given `crc32(A)`, `crc32(B)` and `|B|`.
pub fn crc32_combine(crc_a: u32, crc_b: u32, len_b: u64) -> u32 {
    mult_mod_poly(crc32_256pow(len_b), crc_a) ^ crc_b
}

/// Remove the effect of `len` trailing zero bytes from a CRC.
///
/// Inverse of zero-padding: `crc32_zero_unpad(crc32(A ++ 0^len), len)`
/// equals `crc32(A)`. The xorout convention is peeled off around the
/// multiplication because only the raw register shifts linearly.
pub fn crc32_zero_unpad(crc: u32, len: u64) -> u32 {
    let e = ((len % ORDER) * 8) % ORDER;
    let inv = xpow(ORDER - e);
    mult_mod_poly(inv, crc ^ 0xFFFF_FFFF) ^ 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_values() {
        // CRC of the 256-byte identity table, as seen in yEnc test posts
        let identity: Vec<u8> = (0..=255).collect();
        assert_eq!(crc32(&identity, 0), 0x2905_8c73);

        assert_eq!(crc32(b"Hello, World!\n", 0), 0x6b2b_30e8);
        assert_eq!(crc32(b"", 0), 0);
    }

    #[test]
    fn test_crc32_resumes_across_spans() {
        let first = crc32(b"Hello, ", 0);
        let full = crc32(b"World!\n", first);
        assert_eq!(full, crc32(b"Hello, World!\n", 0));
    }

    #[test]
    fn test_multiply_identity() {
        for v in [0x1234_5678u32, 0xdead_beef, 1, 0xffff_ffff] {
            assert_eq!(crc32_multiply(ONE, v), v);
            assert_eq!(crc32_multiply(v, ONE), v);
        }
        assert_eq!(crc32_multiply(0, 0x1234_5678), 0);
    }

    #[test]
    fn test_xpow_small_exponents() {
        // For n < 32 the reflected representation of x^n is a single bit
        assert_eq!(crc32_2pow(0), 0x8000_0000);
        assert_eq!(crc32_2pow(1), 0x4000_0000);
        assert_eq!(crc32_2pow(8), 0x0080_0000);
        assert_eq!(crc32_2pow(31), 0x0000_0001);
        // x^32 reduces to the polynomial itself
        assert_eq!(crc32_2pow(32), POLY);
    }

    #[test]
    fn test_256pow_matches_2pow() {
        for n in [0u64, 1, 4, 123, 1 << 20] {
            assert_eq!(crc32_256pow(n), crc32_2pow(8 * n));
        }
    }

    #[test]
    fn test_exponent_order_wraps() {
        // x has order 0xFFFFFFFF, so exponents are periodic in it
        assert_eq!(xpow(ORDER), ONE);
        assert_eq!(xpow(ORDER + 7), xpow(7));
        assert_eq!(crc32_2pow(ORDER + 7), crc32_2pow(7));
    }

    #[test]
    fn test_combine_equals_direct_crc() {
        let cases: [(&[u8], &[u8]); 4] = [
            (b"hello ", b"world"),
            (b"", b"tail only"),
            (b"head only", b""),
            (b"\x00\x01\x02", b"\xff\xfe\xfd\xfc"),
        ];
        for (a, b) in cases {
            let combined = crc32_combine(crc32(a, 0), crc32(b, 0), b.len() as u64);
            let direct = {
                let mut whole = a.to_vec();
                whole.extend_from_slice(b);
                crc32(&whole, 0)
            };
            assert_eq!(combined, direct, "combine failed for {:?} ++ {:?}", a, b);
        }
    }

    #[test]
    fn test_combine_three_parts() {
        // The multi-part download case: stitch part CRCs left to right
        let parts: [&[u8]; 3] = [b"part one ", b"part two ", b"part three"];
        let mut crc = crc32(parts[0], 0);
        for part in &parts[1..] {
            crc = crc32_combine(crc, crc32(part, 0), part.len() as u64);
        }
        assert_eq!(crc, crc32(b"part one part two part three", 0));
    }

    #[test]
    fn test_zero_unpad_inverts_padding() {
        for pad in [1usize, 3, 64, 1000] {
            let mut padded = b"payload".to_vec();
            padded.resize(padded.len() + pad, 0);
            let unpadded = crc32_zero_unpad(crc32(&padded, 0), pad as u64);
            assert_eq!(unpadded, crc32(b"payload", 0), "pad={}", pad);
        }
    }

    #[test]
    fn test_zero_unpad_zero_length_is_identity() {
        let crc = crc32(b"unchanged", 0);
        assert_eq!(crc32_zero_unpad(crc, 0), crc);
    }
}
