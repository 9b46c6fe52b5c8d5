//! Identity keys used to match local records with remote ones

use crate::scope::Scope;

pub(crate) const KEY_SEPARATOR: char = '|';

/// Stable matching key shared by the local and remote projection of one
/// logical entity.
///
/// Implementations must be pure. An empty key means the record cannot be
/// matched; it then lands in the removed (local) or added (remote) partition.
pub trait SyncKey {
    fn sync_key(&self, scope: &Scope) -> String;
}

/// Composite key of `parent` plus disambiguating fields.
///
/// Missing fields keep their position as empty segments so that two
/// different field layouts never collide. When every field is empty the
/// record has no identity and the key is empty.
pub fn composite_key<I, S>(parent: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<S> = parts.into_iter().collect();
    if parts.iter().all(|p| p.as_ref().is_empty()) {
        return String::new();
    }

    let mut key = String::from(parent);
    for part in &parts {
        key.push(KEY_SEPARATOR);
        key.push_str(part.as_ref());
    }
    key
}

/// The provider global id when present, else the composite fallback.
pub fn global_or_composite<I, S>(global_id: &str, parent: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if global_id.is_empty() {
        composite_key(parent, parts)
    } else {
        global_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_id_wins() {
        assert_eq!(global_or_composite("i-123", "r1", ["web"]), "i-123");
    }

    #[test]
    fn test_composite_fallback() {
        assert_eq!(
            global_or_composite("", "r1", ["nat.s1", "zone-a,zone-b"]),
            "r1|nat.s1|zone-a,zone-b"
        );
    }

    #[test]
    fn test_missing_fields_narrow_the_key() {
        assert_eq!(composite_key("r1", ["web", ""]), "r1|web|");
        assert_ne!(composite_key("r1", ["web", ""]), composite_key("r1", ["", "web"]));
    }

    #[test]
    fn test_no_fields_means_no_identity() {
        assert_eq!(composite_key("r1", ["", ""]), "");
        assert_eq!(global_or_composite("", "r1", Vec::<String>::new()), "");
    }
}
