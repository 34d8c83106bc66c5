//! # INSEN Response Decoder
//!
//! Decodes INPUT records into [`ControllerState`] and parses the
//! informational `INFO` / `STATUS` / `LIST` replies.
//!
//! The wire format has no length prefix or checksum. Each response is
//! delimited only by the read timeout of the transport, so the decoder
//! works on whatever a single read returned.

use chrono::Utc;
use std::str::FromStr;

use super::protocol::*;
use crate::error::ProtocolError;

type DecodeResult<T> = std::result::Result<T, ProtocolError>;

/// Decode a raw response into a controller state
///
/// # Arguments
///
/// * `raw` - Bytes returned by one transport read
///
/// # Returns
///
/// * `Result<ControllerState, ProtocolError>` - Decoded state, or the reason the frame was rejected
///
/// # Errors
///
/// Returns error if:
/// - The text does not start with `>>> ` (`MalformedFrame`)
/// - The record is not `INPUT` or has fewer than 8 fields (`UnexpectedRecordType`)
/// - A numeric field cannot be parsed (`FieldParse`)
/// - The peripheral reports the slot as disconnected (`ControllerDisconnected`)
///
/// # Examples
///
/// ```
/// use insen_client::insen::decoder::decode_input;
///
/// let state = decode_input(b">>> INPUT|2|100,-200|0,0|0,128|0x81|1|77\r\n").unwrap();
/// assert_eq!(state.id, 2);
/// assert_eq!(state.pressed_buttons(), vec!["A", "START"]);
/// ```
pub fn decode_input(raw: &[u8]) -> DecodeResult<ControllerState> {
    let text = String::from_utf8_lossy(raw);
    parse_input_record(&text)
}

/// Parse an INPUT record from response text
///
/// Fields past the battery level are reserved and ignored. Numeric fields
/// are read as 32-bit integers without range checks, only the controller id
/// must fit a slot index.
pub fn parse_input_record(text: &str) -> DecodeResult<ControllerState> {
    let text = text.trim_end();

    let body = text
        .strip_prefix(INSEN_RESPONSE_MARKER)
        .ok_or_else(|| ProtocolError::MalformedFrame(text.to_string()))?;

    let fields: Vec<&str> = body.split(INSEN_FIELD_SEPARATOR).collect();

    if fields[0] == INSEN_INPUT_TAG && fields.get(2) == Some(&INSEN_DISCONNECTED_TAG) {
        let id = parse_field::<u8>(&fields, 1)?;
        return Err(ProtocolError::ControllerDisconnected(id));
    }

    if fields.len() < INSEN_INPUT_MIN_FIELDS || fields[0] != INSEN_INPUT_TAG {
        return Err(ProtocolError::UnexpectedRecordType(body.to_string()));
    }

    let id = parse_field::<u8>(&fields, 1)?;
    let (lx, ly) = parse_pair::<i32>(&fields, 2)?;
    let (rx, ry) = parse_pair::<i32>(&fields, 3)?;
    let (left_trigger, right_trigger) = parse_pair::<i32>(&fields, 4)?;
    let buttons = parse_hex_mask(&fields, 5)?;
    let dpad = parse_field::<i32>(&fields, 6)?;
    let battery = parse_field::<i32>(&fields, 7)?;

    Ok(ControllerState {
        id,
        left_stick: StickPosition::new(lx, ly),
        right_stick: StickPosition::new(rx, ry),
        left_trigger,
        right_trigger,
        buttons,
        dpad,
        battery,
        timestamp: Utc::now(),
    })
}

/// Parse the `INFO` reply
///
/// Tokens are matched by prefix and unknown tokens are skipped, so this
/// never fails. Older firmware omits some tokens.
pub fn parse_firmware_info(text: &str) -> FirmwareInfo {
    let mut info = FirmwareInfo::default();

    for token in strip_marker(text).split(INSEN_FIELD_SEPARATOR) {
        let token = token.trim();
        if let Some(version) = token.strip_prefix("INSEN_FW_V") {
            info.version = version.to_string();
        } else if let Some(build) = token.strip_prefix("BUILD_") {
            info.build_date = build.replace('_', " ");
        } else if let Some(count) = token.strip_prefix("CONTROLLERS_") {
            info.controller_count = count.parse().ok();
        } else if token == "MAKCU_COMPATIBLE" {
            info.makcu_compatible = true;
        } else if token == "STATUS_OK" {
            info.status_ok = true;
        }
    }

    info
}

/// Parse the `STATUS` reply
///
/// Missing counters stay at zero.
///
/// # Errors
///
/// Returns `FieldParse` if a known counter carries a non-numeric value
pub fn parse_system_status(text: &str) -> DecodeResult<SystemStatus> {
    let mut status = SystemStatus::default();

    for (index, token) in strip_marker(text).split(INSEN_FIELD_SEPARATOR).enumerate() {
        let token = token.trim();
        let (slot, value) = if let Some(v) = token.strip_prefix("ACTIVE_") {
            (&mut status.active_controllers, v)
        } else if let Some(v) = token.strip_prefix("TOTAL_INPUTS_") {
            (&mut status.total_inputs, v)
        } else if let Some(v) = token.strip_prefix("API_COMMANDS_") {
            (&mut status.api_commands, v)
        } else if let Some(v) = token.strip_prefix("FREE_HEAP_") {
            (&mut status.free_heap, v)
        } else {
            continue;
        };

        *slot = value.parse().map_err(|_| ProtocolError::FieldParse {
            index,
            value: token.to_string(),
        })?;
    }

    Ok(status)
}

/// Parse the `LIST` reply (`CONTROLLERS|<id>_<TYPE>|...`)
///
/// # Errors
///
/// Returns `UnexpectedRecordType` if the reply is not a controller list,
/// or `FieldParse` if an entry id is not numeric
pub fn parse_controller_list(text: &str) -> DecodeResult<Vec<ControllerInfo>> {
    let body = strip_marker(text);
    let mut tokens = body.split(INSEN_FIELD_SEPARATOR);

    match tokens.next() {
        Some(tag) if tag.trim() == INSEN_CONTROLLERS_TAG => {}
        _ => return Err(ProtocolError::UnexpectedRecordType(body.to_string())),
    }

    let mut controllers = Vec::new();
    for (offset, token) in tokens.enumerate() {
        // Entries without a type separator carry no controller
        let Some((id, kind)) = token.trim().split_once('_') else {
            continue;
        };

        let id = id.parse::<u8>().map_err(|_| ProtocolError::FieldParse {
            index: offset + 1,
            value: token.to_string(),
        })?;

        controllers.push(ControllerInfo {
            id,
            kind: kind.to_string(),
        });
    }

    Ok(controllers)
}

/// Trim a response and drop the optional `>>> ` marker
fn strip_marker(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(INSEN_RESPONSE_MARKER).unwrap_or(text)
}

fn field_error(fields: &[&str], index: usize) -> ProtocolError {
    ProtocolError::FieldParse {
        index,
        value: fields.get(index).unwrap_or(&"").to_string(),
    }
}

fn parse_field<T: FromStr>(fields: &[&str], index: usize) -> DecodeResult<T> {
    fields
        .get(index)
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| field_error(fields, index))
}

fn parse_pair<T: FromStr>(fields: &[&str], index: usize) -> DecodeResult<(T, T)> {
    let field = fields.get(index).ok_or_else(|| field_error(fields, index))?;
    let mut parts = field.split(',');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => match (a.trim().parse(), b.trim().parse()) {
            (Ok(a), Ok(b)) => Ok((a, b)),
            _ => Err(field_error(fields, index)),
        },
        _ => Err(field_error(fields, index)),
    }
}

fn parse_hex_mask(fields: &[&str], index: usize) -> DecodeResult<u32> {
    let field = fields.get(index).ok_or_else(|| field_error(fields, index))?.trim();
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);

    // from_str_radix accepts a leading '+', the wire format never carries one
    if digits.starts_with('+') {
        return Err(field_error(fields, index));
    }

    u32::from_str_radix(digits, 16).map_err(|_| field_error(fields, index))
}
