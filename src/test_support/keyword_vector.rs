// Bag-of-words hashing shared by the unit and integration test fakes.
// Integration tests include this file by path, so it depends on std only.

pub const DIMENSION: usize = 256;

/// Each lowercase alphanumeric token adds one to an FNV-1a hashed bucket.
/// Identical token multisets give identical vectors.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let bucket = token.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
        vector[(bucket % DIMENSION as u64) as usize] += 1.0;
    }
    vector
}
