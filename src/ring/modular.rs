/// Barrett reduction of a double-width product modulo `m`.
///
/// `barrett_k = floor(2^64 / m)`. The single-word trick is exact for
/// `m <= 2^32`; wider moduli take the u128 division path.
#[inline(always)]
pub fn barrett_reduce(a: u128, m: u64, barrett_k: u64) -> u64 {
    if m > (1u64 << 32) {
        (a % m as u128) as u64
    } else {
        let q_hat = ((a * barrett_k as u128) >> 64) as u64;
        let r = (a as u64).wrapping_sub(q_hat.wrapping_mul(m));
        if r >= m { r.wrapping_sub(m) } else { r }
    }
}

/// `floor(2^64 / m)`.
#[inline]
pub fn barrett_constant(m: u64) -> u64 {
    debug_assert!(m > 1, "modulus must be > 1");
    ((1u128 << 64) / m as u128) as u64
}

/// (a + b) mod m, for a, b < m.
#[inline(always)]
pub fn mod_add(a: u64, b: u64, m: u64) -> u64 {
    let sum = a as u128 + b as u128;
    if sum >= m as u128 { (sum - m as u128) as u64 } else { sum as u64 }
}

/// (a - b) mod m, for a, b < m.
#[inline(always)]
pub fn mod_sub(a: u64, b: u64, m: u64) -> u64 {
    if a >= b { a - b } else { m - b + a }
}

#[inline(always)]
pub fn mod_neg(a: u64, m: u64) -> u64 {
    if a == 0 { 0 } else { m - a }
}

#[inline(always)]
pub fn mod_mul(a: u64, b: u64, m: u64, barrett_k: u64) -> u64 {
    barrett_reduce(a as u128 * b as u128, m, barrett_k)
}

/// Modular inverse by the extended Euclidean algorithm. `None` when
/// `gcd(a, m) != 1`.
pub fn mod_inv(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }

    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}

/// Representative of `a` in `(-m/2, m/2]`.
#[inline]
pub fn center(a: u64, m: u64) -> i64 {
    if a > m / 2 { a as i64 - m as i64 } else { a as i64 }
}

/// Residue of a signed integer in `[0, m)`.
#[inline]
pub fn lift_signed(v: i64, m: u64) -> u64 {
    (v as i128).rem_euclid(m as i128) as u64
}
