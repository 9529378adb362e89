//! Entity-to-shard routing.
//!
//! The mapping must stay bit-for-bit identical to the one used by the
//! JVM cluster this service interoperates with during migration:
//! `(abs(id.hashCode) % numberOfShards).toString`, where `hashCode` is the
//! Java `String` hash and `abs` wraps on `i32::MIN`.

/// Computes Java's `String.hashCode` over the UTF-16 code units of `s`.
pub fn java_string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Returns the shard identifier owning `entity_id`.
///
/// `number_of_shards` must be non-zero. The result can be negative for the
/// single hash value `i32::MIN`, exactly as on the JVM.
pub fn shard_id(entity_id: &str, number_of_shards: u32) -> String {
    let shards = i32::try_from(number_of_shards.max(1)).unwrap_or(i32::MAX);
    let hash = java_string_hash(entity_id).wrapping_abs();
    (hash % shards).to_string()
}
