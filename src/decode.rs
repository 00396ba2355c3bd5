use crate::database::Record;
use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not a JSON array of entries: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entry {index}: field {field} contains a NUL byte")]
    InteriorNul { index: usize, field: &'static str },
}

/// Decodes a full snapshot. Any malformed entry fails the whole payload.
pub fn decode_snapshot<R: Record>(payload: &[u8]) -> Result<Vec<R>, DecodeError> {
    let entries: Vec<R> = serde_json::from_slice(payload)?;
    for (index, entry) in entries.iter().enumerate() {
        entry.validate().map_err(|err| match err {
            DecodeError::InteriorNul { field, .. } => DecodeError::InteriorNul { index, field },
            other => other,
        })?;
    }
    Ok(entries)
}

/// Strings are copied verbatim into C buffers, so an embedded NUL would silently truncate them.
pub fn check_c_string(field: &'static str, value: &str) -> Result<(), DecodeError> {
    if value.as_bytes().contains(&0) {
        return Err(DecodeError::InteriorNul { index: 0, field });
    }
    Ok(())
}

/// Treats `null` like a missing field for sequence-valued entries.
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Shadow day counts: `null`, absent and any negative value all mean "not set".
pub fn negative_as_unset<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.filter(|days| *days >= 0))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Set(u64),
    Negative(i64),
}

/// `sp_flag` is unsigned in C, but directories commonly send `-1` for "not set".
pub fn negative_flag_as_unset<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Set(flag)) => Some(flag),
        Some(Flag::Negative(_)) | None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passwd::AccountRecord;

    #[test]
    fn test_decode_keeps_payload_order() {
        let payload = br#"[
            {"pw_name":"b","pw_passwd":"x","pw_uid":2,"pw_gid":2,"pw_gecos":"","pw_dir":"/","pw_shell":"/bin/sh"},
            {"pw_name":"a","pw_passwd":"x","pw_uid":1,"pw_gid":1,"pw_gecos":"","pw_dir":"/","pw_shell":"/bin/sh"}
        ]"#;
        let entries: Vec<AccountRecord> = decode_snapshot(payload).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let err = decode_snapshot::<AccountRecord>(br#"{"pw_name":"a"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        let err = decode_snapshot::<AccountRecord>(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let err = decode_snapshot::<AccountRecord>(br#"[{"pw_name":"a","pw_uid":1}]"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_reports_entry_with_nul() {
        let payload = br#"[
            {"pw_name":"a","pw_passwd":"x","pw_uid":1,"pw_gid":1,"pw_gecos":"","pw_dir":"/","pw_shell":"/bin/sh"},
            {"pw_name":"b","pw_passwd":"x","pw_uid":2,"pw_gid":2,"pw_gecos":"B\u0000B","pw_dir":"/","pw_shell":"/bin/sh"}
        ]"#;
        let err = decode_snapshot::<AccountRecord>(payload).unwrap_err();
        assert!(matches!(err, DecodeError::InteriorNul { index: 1, field: "pw_gecos" }));
    }

    #[test]
    fn test_decode_empty_array() {
        let entries: Vec<AccountRecord> = decode_snapshot(b"[]").unwrap();
        assert!(entries.is_empty());
    }
}
