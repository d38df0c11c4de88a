use kube::api::ObjectMeta;

/// Marks objects created and managed by the platform itself (bootstrap plans,
/// synthetic clusters). Such objects are never scanned.
pub const SYSTEM: &str = "security.platform.io/system";

/// Returns true when the object carries the system annotation set to `"true"`.
pub fn is_system(meta: &ObjectMeta) -> bool {
    meta.annotations
        .as_ref()
        .and_then(|annotations| annotations.get(SYSTEM))
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
