pub mod url_validator;

pub use url_validator::validate_url;

/// Draw `length` characters uniformly from the 62-symbol alphanumeric
/// alphabet. Collisions are not checked here; the storage layer's
/// uniqueness constraint catches them at persist time.
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}
