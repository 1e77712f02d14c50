use std::fmt;

/// A MIDI message the monitor knows how to describe.
/// Channels are stored 0-based and displayed 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOff { channel: u8, note: u8, velocity: Option<u8> },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, control: u8, value: u8 },
    PitchBend { channel: u8, value: u16 },
    SysEx,
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity: Some(velocity) } => write!(
                f,
                "Note Off, Channel {}, Note {}, Velocity {}",
                channel + 1,
                note,
                velocity
            ),
            // Note On with velocity 0
            MidiMessage::NoteOff { channel, note, velocity: None } => {
                write!(f, "Note Off, Channel {}, Note {}", channel + 1, note)
            }
            MidiMessage::NoteOn { channel, note, velocity } => write!(
                f,
                "Note On, Channel {}, Note {}, Velocity {}",
                channel + 1,
                note,
                velocity
            ),
            MidiMessage::ControlChange { channel, control, value } => write!(
                f,
                "Control Change, Channel {}, Control {}, Value {}",
                channel + 1,
                control,
                value
            ),
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "Pitch Bend, Channel {}, Value {}", channel + 1, value)
            }
            MidiMessage::SysEx => write!(f, "SysEx"),
        }
    }
}

/// Decodes the handful of messages the monitor describes.
/// Anything else, including truncated input, yields `None`.
pub fn decode_midi(msg: &[u8]) -> Option<MidiMessage> {
    let status = *msg.first()?;
    if status == 0xF0 {
        return Some(MidiMessage::SysEx);
    }

    let channel = status & 0x0F;
    let (data1, data2) = match msg {
        [_, d1, d2, ..] => (*d1, *d2),
        _ => return None,
    };

    match status & 0xF0 {
        0x80 => Some(MidiMessage::NoteOff {
            channel,
            note: data1,
            velocity: Some(data2),
        }),
        0x90 if data2 == 0 => Some(MidiMessage::NoteOff {
            channel,
            note: data1,
            velocity: None,
        }),
        0x90 => Some(MidiMessage::NoteOn {
            channel,
            note: data1,
            velocity: data2,
        }),
        0xB0 => Some(MidiMessage::ControlChange {
            channel,
            control: data1,
            value: data2,
        }),
        0xE0 => Some(MidiMessage::PitchBend {
            channel,
            value: (data1 as u16) | ((data2 as u16) << 7),
        }),
        _ => None,
    }
}

/// Human-readable description of `msg`, if it decodes
pub fn describe(msg: &[u8]) -> Option<String> {
    decode_midi(msg).map(|m| m.to_string())
}
