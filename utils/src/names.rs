//! Default database names.

/// Prefix shared by every generated name.
pub const NAME_PREFIX: &str = "memfs-";

const RANDOM_BYTES: usize = 8;

/// Generate a database name unlikely to collide with any other in the same
/// root directory. Uniqueness is all that matters here; the bytes come from
/// the OS RNG only because it needs no seeding.
pub fn random_name() -> Result<String, getrandom::Error> {
    let mut buf = [0u8; RANDOM_BYTES];
    getrandom::getrandom(&mut buf)?;
    Ok(format!("{NAME_PREFIX}{}", hex::encode(buf)))
}
