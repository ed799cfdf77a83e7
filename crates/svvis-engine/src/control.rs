use svvis_frame::Message;

/// In-band acquisition control carried on the string channel.
///
/// A string message whose zero-padded payload reads as little-endian `i16`
/// `0` turns acquisition off; `1` turns it on. On the wire that is an empty
/// string (`[10, 0x00]`) and the one-byte string `"\x01"` (`[10, 0x01, 0x00]`).
/// An empty text string is therefore indistinguishable from OFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Off,
    On,
}

impl ControlSignal {
    /// Signal for the requested acquisition state.
    pub fn from_state(enabled: bool) -> Self {
        if enabled {
            ControlSignal::On
        } else {
            ControlSignal::Off
        }
    }

    /// Interpret a received message. `None` for ordinary traffic.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let text = msg.text()?;
        let lo = text.first().copied().unwrap_or(0);
        let hi = text.get(1).copied().unwrap_or(0);
        match i16::from_le_bytes([lo, hi]) {
            0 => Some(ControlSignal::Off),
            1 => Some(ControlSignal::On),
            _ => None,
        }
    }

    /// The message that carries this signal.
    pub fn to_message(self) -> Message {
        match self {
            ControlSignal::Off => Message::string(b""),
            ControlSignal::On => Message::string([1u8]),
        }
    }

    pub fn is_on(self) -> bool {
        self == ControlSignal::On
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use svvis_frame::encode_message;

    use super::*;

    fn wire(signal: ControlSignal) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_message(&signal.to_message(), &mut buf);
        buf.to_vec()
    }

    #[test]
    fn wire_forms() {
        assert_eq!(wire(ControlSignal::Off), vec![10, 0]);
        assert_eq!(wire(ControlSignal::On), vec![10, 1, 0]);
    }

    #[test]
    fn detection() {
        assert_eq!(
            ControlSignal::from_message(&Message::string("")),
            Some(ControlSignal::Off)
        );
        assert_eq!(
            ControlSignal::from_message(&Message::string([1u8])),
            Some(ControlSignal::On)
        );
        assert_eq!(ControlSignal::from_message(&Message::string("help")), None);
        assert_eq!(ControlSignal::from_message(&Message::string([1u8, b'x'])), None);
    }

    #[test]
    fn numeric_messages_are_never_control() {
        let zero = Message::int16(0, 0).unwrap();
        let one = Message::int16(0, 1).unwrap();
        assert_eq!(ControlSignal::from_message(&zero), None);
        assert_eq!(ControlSignal::from_message(&one), None);
    }

    #[test]
    fn state_mapping() {
        assert!(ControlSignal::from_state(true).is_on());
        assert!(!ControlSignal::from_state(false).is_on());
    }
}
