use crate::error::TranslateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub pressed: bool,
}

/// Orientation quaternion as reported by the wand, one big-endian u16 per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    pub w: u16,
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    Button(ButtonEvent),
    Motion(MotionEvent),
}

pub const MOTION_PAYLOAD_LEN: usize = 8;

/// Only a leading 1 means pressed. Anything else, including an empty payload, is released.
pub fn translate_button(payload: &[u8]) -> ButtonEvent {
    ButtonEvent {
        pressed: payload.first() == Some(&1),
    }
}

pub fn translate_motion(payload: &[u8]) -> Result<MotionEvent, TranslateError> {
    if payload.len() < MOTION_PAYLOAD_LEN {
        return Err(TranslateError::MalformedMotionPayload { len: payload.len() });
    }

    let component = |i: usize| u16::from_be_bytes([payload[2 * i], payload[2 * i + 1]]);

    Ok(MotionEvent {
        w: component(0),
        x: component(1),
        y: component(2),
        z: component(3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_is_pressed_only_for_a_leading_one() {
        assert!(translate_button(&[1]).pressed);
        assert!(translate_button(&[1, 0xff]).pressed);
        for first in [0u8, 2, 0x10, 0xff] {
            assert!(!translate_button(&[first]).pressed, "byte {:#04x}", first);
        }
    }

    #[test]
    fn unexpected_button_encodings_are_tolerated() {
        // documented permissive behavior: never an error, just "not pressed"
        assert_eq!(translate_button(&[]), ButtonEvent { pressed: false });
    }

    #[test]
    fn motion_decodes_big_endian_pairs() {
        let event = translate_motion(&[0x00, 0x05, 0x00, 0x0A, 0x00, 0x0F, 0x00, 0x14]).unwrap();
        assert_eq!(event, MotionEvent { w: 5, x: 10, y: 15, z: 20 });

        let event = translate_motion(&[0xff, 0xfe, 0x12, 0x34, 0x80, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(event, MotionEvent { w: 0xfffe, x: 0x1234, y: 0x8000, z: 1 });
    }

    #[test]
    fn short_motion_payload_is_rejected() {
        for len in 0..MOTION_PAYLOAD_LEN {
            let payload = vec![0u8; len];
            assert_eq!(translate_motion(&payload), Err(TranslateError::MalformedMotionPayload { len }));
        }
    }
}
