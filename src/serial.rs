//! Certificate serial numbers, drawn from the thread-local CSPRNG.

/// Serial length in bytes. 126 of the 128 bits are random.
pub const SERIAL_LEN: usize = 16;

/// Returns a fresh positive serial number as big-endian bytes.
///
/// The top bit is cleared so the DER INTEGER stays positive without a padding
/// byte, and the next bit is set so the encoded length is always [`SERIAL_LEN`].
pub fn random_serial() -> Vec<u8> {
    let mut bytes: [u8; SERIAL_LEN] = rand::random();
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    bytes.to_vec()
}
