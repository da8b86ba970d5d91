//! Message processing for the request/response exchange.
//!
//! The server applies one transform per received message. The reference
//! transform uppercases the input; alternative transforms plug in through
//! the [`Transform`] trait.

/// Reserved prefix for responses that report a processing-detected fault,
/// as opposed to a transport fault (which closes the connection instead).
pub const ERROR_PREFIX: &str = "ERROR";

/// Response sent when a message is empty after whitespace stripping.
pub const EMPTY_MESSAGE_RESPONSE: &str = "ERROR: Empty message";

/// Response sent when a message is not valid UTF-8.
pub const INVALID_UTF8_RESPONSE: &str = "ERROR: Invalid UTF-8 encoding";

/// A message-processing function applied to each decoded request.
pub trait Transform: Send + Sync {
    /// Produce the response text for one request.
    fn apply(&self, input: &str) -> String;
}

/// Reference transform: maps the input to uppercase.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uppercase;

impl Transform for Uppercase {
    fn apply(&self, input: &str) -> String {
        input.to_uppercase()
    }
}

/// Process one stripped message into its response.
///
/// Empty input is recoverable and yields [`EMPTY_MESSAGE_RESPONSE`];
/// anything else goes through the transform.
pub fn process(transform: &dyn Transform, message: &str) -> String {
    if message.is_empty() {
        return EMPTY_MESSAGE_RESPONSE.to_string();
    }
    transform.apply(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_transform() {
        let t = Uppercase;
        assert_eq!(process(&t, "hello"), "HELLO");
        assert_eq!(process(&t, "Hello World"), "HELLO WORLD");
        assert_eq!(process(&t, "123"), "123");
    }

    #[test]
    fn test_empty_message() {
        let t = Uppercase;
        assert_eq!(process(&t, ""), "ERROR: Empty message");
    }

    #[test]
    fn test_inner_whitespace_preserved() {
        // Stripping happens in the connection handler, not here.
        let t = Uppercase;
        assert_eq!(process(&t, "  hello  "), "  HELLO  ");
    }

    #[test]
    fn test_custom_transform() {
        struct Reverse;
        impl Transform for Reverse {
            fn apply(&self, input: &str) -> String {
                input.chars().rev().collect()
            }
        }
        assert_eq!(process(&Reverse, "abc"), "cba");
    }
}
