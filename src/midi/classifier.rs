use crate::endpoint::PortClass;
use regex::RegexSet;
use std::sync::OnceLock;

/// Name fragments of software MIDI buses and drivers, in priority order
const VIRTUAL_PORT_PATTERNS: &[&str] = &[
    r"(?i)virtual",
    r"(?i)neyrinck",
    r"(?i)IAC",
    r"(?i)LoopBe",
    r"(?i)LoopMIDI",
    r"(?i)Microsoft GS",
    r"(?i)VMPK",
    r"(?i)rtpMIDI",
    r"(?i)MIDI Yoke",
    r"(?i)Midi Through",
];

fn virtual_patterns() -> &'static RegexSet {
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // The pattern list is static; failure here is a programming error
        RegexSet::new(VIRTUAL_PORT_PATTERNS).expect("virtual port patterns are valid")
    })
}

/// Guesses whether a MIDI port is hardware or software from its name
pub fn classify(name: &str) -> PortClass {
    match matching_pattern(name) {
        Some(index) => {
            log::trace!("'{}' is virtual (matched {})", name, VIRTUAL_PORT_PATTERNS[index]);
            PortClass::Virtual
        }
        None => PortClass::Physical,
    }
}

/// Index of the first pattern that marks `name` as virtual
pub fn matching_pattern(name: &str) -> Option<usize> {
    virtual_patterns().matches(name).iter().next()
}
