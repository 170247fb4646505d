//! Typed coercion of host-supplied arguments.
//!
//! Commands receive positional `serde_json::Value` arguments from the
//! host. Each extractor checks one slot against the declared type and
//! fails fast with `InvalidArgument` when the slot is missing or holds
//! the wrong type. The engine never sees a silently-defaulted zero or
//! empty string.

use serde_json::Value;

use crate::error::{ArgKind, BridgeError};
use crate::session::SessionId;

fn arg<'a>(
    command: &'static str,
    args: &'a [Value],
    index: usize,
    expected: ArgKind,
) -> Result<&'a Value, BridgeError> {
    args.get(index).ok_or(BridgeError::InvalidArgument {
        command,
        index,
        expected,
    })
}

/// Session identifier at `index`: a non-negative integer. The zero
/// sentinel passes through; liveness is the engine's call.
pub fn session_id(
    command: &'static str,
    args: &[Value],
    index: usize,
) -> Result<SessionId, BridgeError> {
    let value = arg(command, args, index, ArgKind::SessionId)?;
    value
        .as_u64()
        .map(SessionId)
        .ok_or(BridgeError::InvalidArgument {
            command,
            index,
            expected: ArgKind::SessionId,
        })
}

/// Signed integer at `index` (key codes, modifier masks).
pub fn integer(command: &'static str, args: &[Value], index: usize) -> Result<i32, BridgeError> {
    let value = arg(command, args, index, ArgKind::Integer)?;
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(BridgeError::InvalidArgument {
            command,
            index,
            expected: ArgKind::Integer,
        })
}

/// String at `index`.
pub fn text<'a>(
    command: &'static str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a str, BridgeError> {
    let value = arg(command, args, index, ArgKind::Text)?;
    value.as_str().ok_or(BridgeError::InvalidArgument {
        command,
        index,
        expected: ArgKind::Text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_each_kind() {
        let args = vec![json!(3), json!(65505), json!("luna_pinyin")];
        assert_eq!(session_id("t", &args, 0).unwrap(), SessionId(3));
        assert_eq!(integer("t", &args, 1).unwrap(), 65505);
        assert_eq!(text("t", &args, 2).unwrap(), "luna_pinyin");
    }

    #[test]
    fn missing_slot_is_rejected() {
        let err = session_id("destroySession", &[], 0).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidArgument {
                command: "destroySession",
                index: 0,
                expected: ArgKind::SessionId,
            }
        ));
    }

    #[test]
    fn negative_number_is_not_a_session_id() {
        let args = vec![json!(-1)];
        assert!(session_id("t", &args, 0).is_err());
    }

    #[test]
    fn float_is_not_an_integer() {
        let args = vec![json!(1.5)];
        assert!(integer("t", &args, 0).is_err());
    }

    #[test]
    fn number_is_not_text() {
        let args = vec![json!(9)];
        assert!(text("t", &args, 0).is_err());
    }

    #[test]
    fn out_of_range_integer_is_rejected() {
        let args = vec![json!(i64::from(i32::MAX) + 1)];
        assert!(integer("t", &args, 0).is_err());
    }
}
