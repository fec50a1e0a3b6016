//! Protocol constants: element identifiers, field sizes and limits.

/// Path Request element identifier.
pub const IE_PREQ: u8 = 130;

/// Path Reply element identifier.
pub const IE_PREP: u8 = 131;

/// Path Error element identifier.
pub const IE_PERR: u8 = 132;

/// Multicast prune element identifier (non-standard extension).
pub const IE_PRUNE: u8 = 250;

/// Companion element carrying the prune header fields.
pub const IE_PRUNE_HEADER: u8 = 251;

/// Maximum length of an information field (one-byte length octet).
pub const IE_MAX_BODY: usize = 255;

/// Element id octet plus length octet.
pub const IE_HEADER_SIZE: usize = 2;

/// Fixed part of a PREQ body before the per-destination units.
pub const PREQ_FIXED_SIZE: usize = 26;

/// Size of one PREQ per-destination unit: flags + address + seqno.
pub const PREQ_DEST_UNIT_SIZE: usize = 11;

/// Upper bound on destinations in one PREQ.
pub const PREQ_MAX_DESTINATIONS: usize = 20;

/// Fixed size of a PREP body.
pub const PREP_SIZE: usize = 31;

/// Fixed part of a PERR body: TTL + destination count.
pub const PERR_FIXED_SIZE: usize = 2;

/// Size of one PERR unit: flags + address + seqno + reason code.
pub const PERR_UNIT_SIZE: usize = 13;

/// Upper bound on failed destinations carried by one PERR.
pub const PERR_MAX_DESTINATIONS: usize = 19;

/// Size of one prune unit: 6-byte address + 4-byte reason code.
pub const PRUNE_UNIT_SIZE: usize = 10;

/// Upper bound on prune units in one element.
pub const PRUNE_MAX_UNITS: usize = IE_MAX_BODY / PRUNE_UNIT_SIZE;

/// Prune header body: originator + group + TTL.
pub const PRUNE_HEADER_SIZE: usize = 13;

/// Mesh data header: TTL + seqno + source + destination + protocol.
pub const DATA_HEADER_SIZE: usize = 19;

/// One HWMP time unit in microseconds.
pub const TU_MICROS: u64 = 1024;

/// PERR reason: destination unreachable.
pub const PERR_REASON_UNREACHABLE: u16 = 61;

/// Prune reason: a duplicate group frame arrived over a redundant path.
pub const PRUNE_REASON_DUPLICATE: u32 = 1;

/// Prune reason: the node left the multicast group.
pub const PRUNE_REASON_LEFT_GROUP: u32 = 2;
