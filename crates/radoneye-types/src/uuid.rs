//! Bluetooth UUIDs for RadonEye devices.
//!
//! Both RD200 protocol generations expose the same three-part layout: a
//! vendor service, a command characteristic the host writes a single opcode
//! to, and a response characteristic the device answers on.

use uuid::{Uuid, uuid};

// --- RD200 (original firmware) ---

/// Vendor service UUID used by original RD200 firmware.
pub const RD200_SERVICE: Uuid = uuid!("00001523-1212-efde-1523-785feabcd123");

/// Command characteristic (write) for original RD200 firmware.
pub const RD200_COMMAND: Uuid = uuid!("00001524-1212-efde-1523-785feabcd123");

/// Response characteristic (read/notify) for original RD200 firmware.
pub const RD200_RESPONSE: Uuid = uuid!("00001525-1212-efde-1523-785feabcd123");

// --- RD200 (current firmware) ---

/// Vendor service UUID used by current RD200 firmware.
pub const RD200_V2_SERVICE: Uuid = uuid!("00001523-0000-1000-8000-00805f9b34fb");

/// Command characteristic (write) for current RD200 firmware.
pub const RD200_V2_COMMAND: Uuid = uuid!("00001524-0000-1000-8000-00805f9b34fb");

/// Response characteristic (read/notify) for current RD200 firmware.
pub const RD200_V2_RESPONSE: Uuid = uuid!("00001525-0000-1000-8000-00805f9b34fb");
