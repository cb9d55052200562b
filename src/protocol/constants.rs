//! Wire protocol constants

/// Field separator within an event record
pub const FIELD_SEPARATOR: u8 = b'|';

/// Line terminator byte; a preceding `\r` stays part of the raw record
pub const LINE_TERMINATOR: u8 = b'\n';

/// Type letter for a follow event
pub const TYPE_FOLLOW: &str = "F";

/// Type letter for an unfollow event
pub const TYPE_UNFOLLOW: &str = "U";

/// Type letter for a private message
pub const TYPE_PRIVATE_MESSAGE: &str = "P";

/// Type letter for a broadcast (informational, field count decides)
pub const TYPE_BROADCAST: &str = "B";

/// Type letter for a status update (informational, field count decides)
pub const TYPE_STATUS_UPDATE: &str = "S";

/// First sequence number the event source is expected to send
pub const FIRST_SEQUENCE: u64 = 1;

/// Default event source port
pub const DEFAULT_EVENT_SOURCE_PORT: u16 = 9090;

/// Default subscriber port
pub const DEFAULT_SUBSCRIBER_PORT: u16 = 9099;

/// Default maximum line length accepted from either listener
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;
