use rand::Rng;

use crate::error::StoreError;

/// Identifies a syncable entity. Permanent ids are assigned by the remote
/// service; until then a locally created entity carries a placeholder drawn
/// from the reserved range below.
pub type EntityId = i64;

/// Inclusive bounds of the reserved placeholder range. The remote service
/// never hands out ids inside it.
pub const PLACEHOLDER_MIN: EntityId = 1_000_000;
pub const PLACEHOLDER_MAX: EntityId = 99_999_999;

/// Whether `id` falls inside the default reserved placeholder range.
pub fn is_placeholder(id: EntityId) -> bool {
    (PLACEHOLDER_MIN..=PLACEHOLDER_MAX).contains(&id)
}

/// Draws a placeholder id from `[min, max]` that `exists` does not already
/// know. Uniqueness is only required among same-kind local entities, so
/// `exists` should query a single collection.
pub fn generate_placeholder(
    min: EntityId,
    max: EntityId,
    mut exists: impl FnMut(EntityId) -> Result<bool, StoreError>,
) -> Result<EntityId, StoreError> {
    let mut rng = rand::thread_rng();
    loop {
        let id = rng.gen_range(min..=max);
        if !exists(id)? {
            return Ok(id);
        }
    }
}
