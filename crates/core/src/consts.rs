//! Constant variables.

/// Number of bits of the identifier space, the ring size is 2^ID_BITS.
pub const ID_BITS: usize = 160;
/// Length of an identifier rendered as hex.
pub const ID_HEX_LEN: usize = ID_BITS / 4;
/// Hard bound of hops for an iterative lookup.
pub const MAX_LOOKUP_HOPS: usize = ID_BITS;
/// Smallest allowed successor list length.
pub const MIN_SUCCESSORS: u8 = 1;
/// Largest allowed successor list length.
pub const MAX_SUCCESSORS: u8 = 32;
/// Legacy field separator of the delimiter based wire format, still reserved in names.
pub const FIELD_SEPARATOR: char = '-';
