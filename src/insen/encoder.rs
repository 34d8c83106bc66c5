//! # INSEN Command Encoder
//!
//! Encodes command strings into wire bytes.

use bytes::{BufMut, Bytes, BytesMut};

use super::protocol::*;

/// Encode a command into its wire form
///
/// # Arguments
///
/// * `command` - Command text without line terminator (e.g. `"STATUS"`)
///
/// # Returns
///
/// * `Bytes` - Command followed by CR LF
///
/// # Examples
///
/// ```
/// use insen_client::insen::encoder::encode_command;
///
/// let frame = encode_command("INFO");
/// assert_eq!(&frame[..], b"INFO\r\n");
/// ```
pub fn encode_command(command: &str) -> Bytes {
    let mut frame = BytesMut::with_capacity(command.len() + INSEN_LINE_TERMINATOR.len());
    frame.put_slice(command.as_bytes());
    frame.put_slice(INSEN_LINE_TERMINATOR.as_bytes());
    frame.freeze()
}

/// Build the `GET <id>` command for a controller slot
pub fn get_command(controller_id: u8) -> String {
    format!("{} {}", CMD_GET, controller_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_appends_crlf() {
        assert_eq!(&encode_command("STATUS")[..], b"STATUS\r\n");
    }

    #[test]
    fn test_encode_empty_command() {
        assert_eq!(&encode_command("")[..], b"\r\n");
    }

    #[test]
    fn test_encode_does_not_touch_existing_terminator() {
        // Sent verbatim, the caller owns the command text
        assert_eq!(&encode_command("LIST\r\n")[..], b"LIST\r\n\r\n");
    }

    #[test]
    fn test_get_command() {
        assert_eq!(get_command(0), "GET 0");
        assert_eq!(get_command(3), "GET 3");
        assert_eq!(&encode_command(&get_command(2))[..], b"GET 2\r\n");
    }
}
