//! Prime sizing for the node table and the operation caches.  Both are
//! indexed with a modulo of a pairing hash, so a prime capacity spreads the
//! chains evenly.

const CHECKTIMES: u32 = 20;

/// Returns the smallest prime greater than or equal to the given number.
pub(crate) fn prime_gte(num: usize) -> usize {
    let mut n = num.max(3);
    if is_even(n) {
        n += 1;
    }
    while !is_prime(n) {
        n += 2;
    }
    n
}

/// Returns the largest prime less than or equal to the given number.
pub(crate) fn prime_lte(num: usize) -> usize {
    let mut n = num;
    if is_even(n) {
        n -= 1;
    }
    while !is_prime(n) {
        n -= 2;
    }
    n
}

const fn is_even(src: usize) -> bool {
    (src & 0x1) == 0
}

fn is_prime(src: usize) -> bool {
    !has_easy_factors(src) && is_miller_rabin_prime(src)
}

const fn has_easy_factors(src: usize) -> bool {
    has_factor(src, 3) || has_factor(src, 5) || has_factor(src, 7) || has_factor(src, 11) || has_factor(src, 13)
}

const fn has_factor(src: usize, n: usize) -> bool {
    src != n && src % n == 0
}

fn is_miller_rabin_prime(src: usize) -> bool {
    for _ in 0..CHECKTIMES {
        let witness = fastrand::usize(1..src - 1);
        if is_witness(witness, src) {
            return false;
        }
    }
    true
}

fn is_witness(witness: usize, src: usize) -> bool {
    let bit_num = number_of_bits(src - 1) - 1;
    let mut d = 1;
    for i in (0..=bit_num).rev() {
        let x = d;
        d = mulmod(d, d, src);
        if d == 1 && x != 1 && x != src - 1 {
            return true;
        }
        if bit_is_set(src - 1, i) {
            d = mulmod(d, witness, src);
        }
    }
    d != 1
}

const fn number_of_bits(src: usize) -> usize {
    (usize::BITS - src.leading_zeros()) as usize
}

const fn bit_is_set(src: usize, b: usize) -> bool {
    (src & (1 << b)) != 0
}

const fn mulmod(a: usize, b: usize, c: usize) -> usize {
    a * b % c
}
