// Launch gate: only web URLs ever leave the process.
use crate::perception::types::is_web_url;

/// Returns true if `value` may be handed to the system URL opener.
pub fn is_openable(value: &str) -> bool {
    is_web_url(value) && !value.chars().any(char::is_control)
}
