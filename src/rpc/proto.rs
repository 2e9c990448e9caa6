//! Wire messages of the `bluewand.BlueWand` service (see `proto/bluewand.proto`).

use crate::events::{ButtonEvent, DomainEvent, MotionEvent};

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct EmptyMessage {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Identifier {
    #[prost(string, tag = "1")]
    pub uid: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ButtonMessage {
    #[prost(bool, tag = "1")]
    pub pressed: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct MotionMessage {
    #[prost(uint32, tag = "1")]
    pub w: u32,
    #[prost(uint32, tag = "2")]
    pub x: u32,
    #[prost(uint32, tag = "3")]
    pub y: u32,
    #[prost(uint32, tag = "4")]
    pub z: u32,
}

include!(concat!(env!("OUT_DIR"), "/bluewand.BlueWand.rs"));

impl From<ButtonEvent> for ButtonMessage {
    fn from(event: ButtonEvent) -> Self {
        ButtonMessage { pressed: event.pressed }
    }
}

impl From<MotionEvent> for MotionMessage {
    fn from(event: MotionEvent) -> Self {
        MotionMessage {
            w: u32::from(event.w),
            x: u32::from(event.x),
            y: u32::from(event.y),
            z: u32::from(event.z),
        }
    }
}

impl From<ButtonMessage> for DomainEvent {
    fn from(message: ButtonMessage) -> Self {
        DomainEvent::Button(ButtonEvent { pressed: message.pressed })
    }
}

impl From<MotionMessage> for DomainEvent {
    // the server only ever sends 16 bit components
    fn from(message: MotionMessage) -> Self {
        let clamp = |v: u32| u16::try_from(v).unwrap_or(u16::MAX);
        DomainEvent::Motion(MotionEvent {
            w: clamp(message.w),
            x: clamp(message.x),
            y: clamp(message.y),
            z: clamp(message.z),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn motion_message_uses_the_documented_field_tags() {
        let message = MotionMessage::from(MotionEvent { w: 5, x: 10, y: 15, z: 20 });
        // tag 1..4, varint wire type
        assert_eq!(message.encode_to_vec(), vec![0x08, 5, 0x10, 10, 0x18, 15, 0x20, 20]);
    }

    #[test]
    fn motion_message_converts_back_to_an_event() {
        let event = DomainEvent::from(MotionMessage { w: 1, x: 2, y: 70_000, z: 4 });
        assert_eq!(event, DomainEvent::Motion(MotionEvent { w: 1, x: 2, y: u16::MAX, z: 4 }));
    }

    #[test]
    fn identifier_decodes_from_the_wire() {
        let bytes = Identifier { uid: "AA:BB".to_string() }.encode_to_vec();
        let decoded = Identifier::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.uid, "AA:BB");
    }
}
