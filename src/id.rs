use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;

/// Generate a 24-character hex object id (12 random bytes).
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Check the 24-hex id format used in URLs before hitting the store.
pub fn is_object_id(value: &str) -> bool {
    lazy_static! {
        static ref OBJECT_ID_RE: Regex = Regex::new(r"^[0-9a-fA-F]{24}$").unwrap();
    }
    OBJECT_ID_RE.is_match(value)
}
