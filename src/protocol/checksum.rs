//! Frame checksum
//!
//! The last byte of every bus frame is the complement of the XOR of all
//! bytes before it, so XOR-reducing a well-formed frame yields `0xFF`.

/// Computes the checksum over every byte of `frame` except the last
pub fn checksum(frame: &[u8]) -> u8 {
    let body = match frame.split_last() {
        Some((_, body)) => body,
        None => frame,
    };
    !body.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Writes the checksum into the last byte of `frame`
pub fn seal(frame: &mut [u8]) {
    let sum = checksum(frame);
    if let Some(last) = frame.last_mut() {
        *last = sum;
    }
}

/// Returns whether the last byte of `frame` holds a valid checksum
pub fn verify(frame: &[u8]) -> bool {
    !frame.is_empty() && frame.iter().fold(0u8, |acc, b| acc ^ b) == 0xFF
}
