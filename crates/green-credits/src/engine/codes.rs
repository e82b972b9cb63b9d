use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ATTEMPTS: usize = 64;

/// `DRP-NNNNN`, shown to the user and read back at the collection point.
pub fn drop_off_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("DRP-{:05}", rng.gen_range(0..100_000u32))
}

/// `ECO-XXXXXX` with uppercase letters and digits.
pub fn redemption_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..6)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("ECO-{suffix}")
}

/// Draw codes until `taken` rejects none of them, giving up after a bounded number of tries.
pub(crate) fn unique_code<R, G, T>(rng: &mut R, mut generate: G, taken: T) -> Option<String>
where
    R: Rng + ?Sized,
    G: FnMut(&mut R) -> String,
    T: Fn(&str) -> bool,
{
    (0..MAX_ATTEMPTS)
        .map(|_| generate(rng))
        .find(|code| !taken(code))
}
