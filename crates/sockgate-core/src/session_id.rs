//! Session identifier generation.
//!
//! Identifiers mix a random component, the remote address, a nanosecond
//! timestamp, and the originating header material, hashed into a fixed-width
//! hex string. Collision is treated as never happening, not defended against.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::context::UpgradeContext;

/// Generate a globally unique session identifier for one upgraded connection.
pub fn generate(context: &UpgradeContext) -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hasher.update(context.remote_addr().to_string().as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_be_bytes(),
    );
    for (name, values) in context.headers() {
        hasher.update(name.as_bytes());
        for value in values {
            hasher.update(value.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> UpgradeContext {
        let mut ctx = UpgradeContext::new("10.0.0.1:55000".parse().unwrap(), "/echo");
        ctx.insert_header("user-agent", "sockgate-test");
        ctx
    }

    #[test]
    fn ids_are_fixed_width_hex() {
        let id = generate(&ctx());
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_differ_across_calls_for_the_same_context() {
        let ctx = ctx();
        let first = generate(&ctx);
        let second = generate(&ctx);
        assert_ne!(first, second);
    }
}
