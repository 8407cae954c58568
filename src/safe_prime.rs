//! Concurrent search for safe primes, i.e. primes `p` such that
//! `q = (p-1)/2` is also prime (`q` is then a Sophie Germain prime).
//!
//! How fast a prime is found is mostly a matter of luck with the first
//! bytes drawn, so the search runs on several workers at once: the first
//! worker to finish a full verification wins and the rest are cancelled.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use num_bigint::{BigInt, Sign};
use num_traits::{One, ToPrimitive, Zero};
use rand::rngs::OsRng;
use rand::RngCore;
use rug::integer::{IsPrime, Order};
use thiserror::Error;
use tracing::debug;

use crate::functions::RandomError;

/// Small primes used to rapidly exclude composite candidates before any
/// expensive primality test runs. The list stops where the running
/// product would exceed a `u64`. Two is absent; candidates are odd by
/// construction.
const SMALL_PRIMES: [u64; 15] = [3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53];

/// Product of `SMALL_PRIMES`. Reducing a candidate by this number once
/// lets every small-prime divisibility check run on a plain `u64`.
const SMALL_PRIMES_PRODUCT: u64 = 16_294_579_238_595_022_365;

/// Rounds of Miller-Rabin applied to the Sophie Germain candidate.
const MILLER_RABIN_ROUNDS: u32 = 20;

#[derive(Error, Debug)]
pub enum SafePrimeError {
    #[error("safe prime size must be at least 6 bits")]
    BitLenTooSmall,
    #[error("generator timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Rng(#[from] RandomError),
}

#[derive(Default)]
struct Search {
    result: Option<(BigInt, BigInt)>,
    error: Option<RandomError>,
    cancelled: bool,
}

type Shared = (Mutex<Search>, Condvar);

/// Finds a safe prime `p` of exactly `bit_len` bits together with the
/// prime `q` such that `p = 2q + 1`.
///
/// `concurrency` workers search in parallel; the first fully verified
/// result is returned and the remaining workers observe cancellation and
/// stop. If no worker succeeds within `timeout`, measured from the call's
/// entry, `SafePrimeError::Timeout` is returned. All workers are joined
/// before this function returns, whatever the outcome.
///
/// The concurrency level should grow with `bit_len`: one worker is
/// plenty for 512-bit primes, while 2048-bit primes want four or more to
/// finish in reasonable time.
pub fn generate_safe_prime(
    bit_len: usize,
    concurrency: usize,
    timeout: Duration,
) -> Result<(BigInt, BigInt), SafePrimeError> {
    if bit_len < 6 {
        return Err(SafePrimeError::BitLenTooSmall);
    }

    debug!(bit_len, concurrency, "starting safe prime search");
    let started = Instant::now();
    let deadline = started + timeout;

    let shared: Arc<Shared> = Arc::new((Mutex::new(Search::default()), Condvar::new()));
    let workers: Vec<_> = (0..concurrency)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || search_worker(&shared, bit_len))
        })
        .collect();

    let (lock, cvar) = &*shared;
    let mut state = lock.lock().unwrap();
    while state.result.is_none() && state.error.is_none() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let (guard, _) = cvar.wait_timeout(state, deadline - now).unwrap();
        state = guard;
    }
    state.cancelled = true;
    let result = state.result.take();
    let error = state.error.take();
    drop(state);

    for worker in workers {
        let _ = worker.join();
    }

    match (result, error) {
        (Some((p, q)), _) => {
            debug!(bit_len, elapsed = ?started.elapsed(), "safe prime found");
            Ok((p, q))
        }
        (None, Some(err)) => Err(err.into()),
        (None, None) => Err(SafePrimeError::Timeout(timeout)),
    }
}

/// One worker's search loop.
///
/// Each pass draws a fresh odd candidate `q` of `p_bit_len - 1` bits with
/// its two top bits set, sieves `q` and `p = 2q + 1` against the small
/// primes while scanning even deltas, drops candidates with
/// `q = 1 (mod 3)` (those make `p` a multiple of 3), and only then pays
/// for the expensive checks: Miller-Rabin on `q`, Pocklington's criterion
/// on `p` (`2^(p-1) = 1 (mod p)`, sufficient given that `(p-1)/2` is
/// prime), and a bit-length re-check in case the delta scan overflowed.
///
/// Cancellation is observed at every outer iteration, and re-checked
/// under the mutex before a result is published so a winner racing the
/// timeout can never post late.
fn search_worker(shared: &Shared, p_bit_len: usize) {
    let q_bit_len = p_bit_len - 1;
    let mut b = q_bit_len % 8;
    if b == 0 {
        b = 8;
    }

    let mut bytes = vec![0u8; (q_bit_len + 7) / 8];
    let small_primes_product = BigInt::from(SMALL_PRIMES_PRODUCT);
    let one = BigInt::one();
    let two = BigInt::from(2);
    let three = BigInt::from(3);
    let mut rng = OsRng;

    let (lock, cvar) = shared;
    loop {
        if lock.lock().unwrap().cancelled {
            return;
        }

        if let Err(err) = rng.try_fill_bytes(&mut bytes) {
            let mut state = lock.lock().unwrap();
            if state.error.is_none() {
                state.error = Some(err.into());
            }
            cvar.notify_all();
            return;
        }

        // Clear bits above the candidate size, then set the two most
        // significant bits. With both top bits set, the product of two
        // such primes is never one bit short of the target length.
        bytes[0] &= ((1u16 << b) - 1) as u8;
        if b >= 2 {
            bytes[0] |= 3 << (b - 2);
        } else {
            // b == 1; the second-highest bit lives in the next byte.
            bytes[0] |= 1;
            if bytes.len() > 1 {
                bytes[1] |= 0x80;
            }
        }
        // An even number this large certainly is not prime.
        *bytes.last_mut().unwrap() |= 1;

        let mut q = BigInt::from_bytes_be(Sign::Plus, &bytes);
        let mut p = BigInt::zero();

        // Residue of q modulo the product of the small primes; the whole
        // delta scan below works on this single u64.
        let q_mod = (&q % &small_primes_product).to_u64().unwrap();

        let mut delta: u64 = 0;
        'next_delta: while delta < 1 << 20 {
            let m = q_mod + delta;
            for &prime in SMALL_PRIMES.iter() {
                // At tiny bit lengths the candidate may be one of the
                // small primes itself; only that exact match is allowed
                // through.
                if m % prime == 0 && (q_bit_len > 6 || m != prime) {
                    delta += 2;
                    continue 'next_delta;
                }
            }

            if delta > 0 {
                q += BigInt::from(delta);
            }

            // If q = 1 (mod 3), then p = 2q+1 is a multiple of 3.
            if &q % &three == one {
                delta += 2;
                continue 'next_delta;
            }

            p = &q * &two + &one;
            if !is_prime_candidate(&p, &small_primes_product) {
                delta += 2;
                continue 'next_delta;
            }

            break;
        }

        // The delta additions may have pushed q one bit past the target
        // length, so the length is re-checked along with the real
        // primality tests.
        if is_probably_prime(&q, MILLER_RABIN_ROUNDS)
            && pocklington_criterion_holds(&p)
            && q.bits() as usize == q_bit_len
        {
            let mut state = lock.lock().unwrap();
            if !state.cancelled && state.result.is_none() {
                state.result = Some((p, q));
                cvar.notify_all();
            }
            return;
        }
    }
}

/// Cheap compositeness filter: false iff a small prime divides `n`
/// (other than `n` being that prime itself).
fn is_prime_candidate(n: &BigInt, small_primes_product: &BigInt) -> bool {
    let m = (n % small_primes_product).to_u64().unwrap();
    for &prime in SMALL_PRIMES.iter() {
        if m % prime == 0 && m != prime {
            return false;
        }
    }
    true
}

/// Pocklington's criterion for `p = 2q + 1` with `q` prime: `p` is prime
/// iff `2^(p-1) = 1 (mod p)`. One Fermat test to base 2 replaces a full
/// probabilistic suite for `p`.
fn pocklington_criterion_holds(p: &BigInt) -> bool {
    if p < &BigInt::from(3) {
        return false;
    }
    BigInt::from(2)
        .modpow(&(p - BigInt::one()), p)
        .is_one()
}

/// Miller-Rabin through the GMP backend.
pub(crate) fn is_probably_prime(n: &BigInt, rounds: u32) -> bool {
    if n <= &BigInt::one() {
        return false;
    }
    let n = rug::Integer::from_digits(&n.to_bytes_be().1, Order::Msf);
    n.is_probably_prime(rounds) != IsPrime::No
}
