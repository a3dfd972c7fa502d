//! Random string generation for provisioned credentials.

use rand::Rng;

/// Alphabet used for generated usernames and passwords.
pub const CREDENTIAL_CHARSET: &str =
    "AB1abCD2cdEF3efGH4ghIJ5ijKL6klMN7mnOP8opQR9qrST0stUV_uvWX-wxYZ.yz";

/// Generate a random string of `len` characters from [`CREDENTIAL_CHARSET`].
///
/// ```
/// use intelligence_common::random_string;
///
/// let s = random_string(32);
/// assert_eq!(s.chars().count(), 32);
/// ```
#[must_use]
pub fn random_string(len: usize) -> String {
    random_string_from(len, CREDENTIAL_CHARSET)
}

/// Generate a random string of `len` characters drawn from `charset`.
///
/// Returns an empty string when `charset` is empty.
#[must_use]
pub fn random_string_from(len: usize, charset: &str) -> String {
    let alphabet: Vec<char> = charset.chars().collect();
    if alphabet.is_empty() {
        return String::new();
    }

    let mut rng = rand::thread_rng();
    (0..len).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect()
}
