// Policy ids are UUIDv7 so they sort by creation time and leak nothing
// about the policy number. Users and admins keep PG's gen_random_uuid().

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Parse a path-supplied id; `None` for anything that is not a UUID.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
