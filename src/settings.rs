//! Settings exchange and acknowledgement tracking
//!
//! SETTINGS frames and parameters as defined in RFC 7540 Section 6.5, plus
//! the two-sided view the connection keeps: what we must obey when sending
//! (the peer's advertisement) and what the peer has promised to obey when
//! sending to us (our acknowledged advertisement).

use super::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt;

/// HTTP/2 settings parameters (RFC 7540 Section 6.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SettingsParameter {
    /// SETTINGS_HEADER_TABLE_SIZE (0x1)
    /// Maximum size of the sender's header compression table
    HeaderTableSize = 0x1,

    /// SETTINGS_ENABLE_PUSH (0x2)
    /// Used to disable server push
    EnablePush = 0x2,

    /// SETTINGS_MAX_CONCURRENT_STREAMS (0x3)
    /// Maximum number of concurrent streams the sender will accept
    MaxConcurrentStreams = 0x3,

    /// SETTINGS_INITIAL_WINDOW_SIZE (0x4)
    /// Initial stream-level flow-control window
    InitialWindowSize = 0x4,

    /// SETTINGS_MAX_FRAME_SIZE (0x5)
    /// Largest frame payload the sender will accept
    MaxFrameSize = 0x5,

    /// SETTINGS_MAX_HEADER_LIST_SIZE (0x6)
    /// Advisory bound on the decoded header list
    MaxHeaderListSize = 0x6,
}

impl SettingsParameter {
    /// Convert to u16
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Create from u16
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x1 => Some(SettingsParameter::HeaderTableSize),
            0x2 => Some(SettingsParameter::EnablePush),
            0x3 => Some(SettingsParameter::MaxConcurrentStreams),
            0x4 => Some(SettingsParameter::InitialWindowSize),
            0x5 => Some(SettingsParameter::MaxFrameSize),
            0x6 => Some(SettingsParameter::MaxHeaderListSize),
            _ => None,
        }
    }

    /// Get parameter name
    pub fn name(&self) -> &'static str {
        match self {
            SettingsParameter::HeaderTableSize => "HEADER_TABLE_SIZE",
            SettingsParameter::EnablePush => "ENABLE_PUSH",
            SettingsParameter::MaxConcurrentStreams => "MAX_CONCURRENT_STREAMS",
            SettingsParameter::InitialWindowSize => "INITIAL_WINDOW_SIZE",
            SettingsParameter::MaxFrameSize => "MAX_FRAME_SIZE",
            SettingsParameter::MaxHeaderListSize => "MAX_HEADER_LIST_SIZE",
        }
    }
}

impl fmt::Display for SettingsParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name(), self.as_u16())
    }
}

/// A set of HTTP/2 settings values.
///
/// `None` means "not present in this frame / not constrained"; the getters
/// substitute the RFC 7540 defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Header table size (default: 4096)
    pub header_table_size: Option<u32>,

    /// Enable server push (default: true)
    pub enable_push: Option<bool>,

    /// Maximum concurrent streams (default: unlimited)
    pub max_concurrent_streams: Option<u32>,

    /// Initial window size (default: 65535)
    pub initial_window_size: Option<u32>,

    /// Maximum frame size (default: 16384, range: 16384-16777215)
    pub max_frame_size: Option<u32>,

    /// Maximum header list size (default: unlimited)
    pub max_header_list_size: Option<u32>,
}

impl Settings {
    /// Create empty settings
    pub fn new() -> Self {
        Settings {
            header_table_size: None,
            enable_push: None,
            max_concurrent_streams: None,
            initial_window_size: None,
            max_frame_size: None,
            max_header_list_size: None,
        }
    }

    /// Get header table size (with default)
    pub fn get_header_table_size(&self) -> u32 {
        self.header_table_size.unwrap_or(4096)
    }

    /// Get enable push (with default)
    pub fn get_enable_push(&self) -> bool {
        self.enable_push.unwrap_or(true)
    }

    /// Get max concurrent streams (None = unlimited)
    pub fn get_max_concurrent_streams(&self) -> Option<u32> {
        self.max_concurrent_streams
    }

    /// Get initial window size (with default)
    pub fn get_initial_window_size(&self) -> u32 {
        self.initial_window_size.unwrap_or(65535)
    }

    /// Get max frame size (with default)
    pub fn get_max_frame_size(&self) -> u32 {
        self.max_frame_size.unwrap_or(16384)
    }

    /// Get max header list size (None = unlimited)
    pub fn get_max_header_list_size(&self) -> Option<u32> {
        self.max_header_list_size
    }

    /// Validate a locally proposed settings set.
    pub fn validate(&self) -> Result<()> {
        if let Some(initial_window_size) = self.initial_window_size {
            if initial_window_size > 0x7FFF_FFFF {
                return Err(Error::InvalidSettings(format!(
                    "Initial window size {} exceeds maximum (2^31-1)",
                    initial_window_size
                )));
            }
        }

        if let Some(max_frame_size) = self.max_frame_size {
            if !(16_384..=16_777_215).contains(&max_frame_size) {
                return Err(Error::InvalidSettings(format!(
                    "Max frame size {} outside valid range (16384-16777215)",
                    max_frame_size
                )));
            }
        }

        Ok(())
    }

    /// Validate a peer-sent settings set, with the RFC error classification:
    /// an out-of-range INITIAL_WINDOW_SIZE is a flow-control error, the rest
    /// are protocol errors.
    pub fn validate_from_peer(&self) -> Result<()> {
        if let Some(initial_window_size) = self.initial_window_size {
            if initial_window_size > 0x7FFF_FFFF {
                return Err(Error::FlowControl(format!(
                    "peer INITIAL_WINDOW_SIZE {} exceeds 2^31-1",
                    initial_window_size
                )));
            }
        }

        if let Some(max_frame_size) = self.max_frame_size {
            if !(16_384..=16_777_215).contains(&max_frame_size) {
                return Err(Error::Protocol(format!(
                    "peer MAX_FRAME_SIZE {} outside 16384..=16777215",
                    max_frame_size
                )));
            }
        }

        Ok(())
    }

    /// Apply a raw (id, value) pair as received on the wire.
    ///
    /// Unknown identifiers are ignored (RFC 7540 Section 6.5.2);
    /// ENABLE_PUSH must be 0 or 1.
    pub fn apply_raw(&mut self, id: u16, value: u32) -> Result<()> {
        match SettingsParameter::from_u16(id) {
            Some(SettingsParameter::HeaderTableSize) => self.header_table_size = Some(value),
            Some(SettingsParameter::EnablePush) => {
                if value > 1 {
                    return Err(Error::Protocol(format!(
                        "ENABLE_PUSH must be 0 or 1, got {}",
                        value
                    )));
                }
                self.enable_push = Some(value != 0);
            }
            Some(SettingsParameter::MaxConcurrentStreams) => {
                self.max_concurrent_streams = Some(value)
            }
            Some(SettingsParameter::InitialWindowSize) => self.initial_window_size = Some(value),
            Some(SettingsParameter::MaxFrameSize) => self.max_frame_size = Some(value),
            Some(SettingsParameter::MaxHeaderListSize) => self.max_header_list_size = Some(value),
            None => {}
        }
        Ok(())
    }

    /// Merge settings from another Settings object
    /// (values in `other` override values in `self`)
    pub fn merge(&mut self, other: &Settings) {
        if other.header_table_size.is_some() {
            self.header_table_size = other.header_table_size;
        }
        if other.enable_push.is_some() {
            self.enable_push = other.enable_push;
        }
        if other.max_concurrent_streams.is_some() {
            self.max_concurrent_streams = other.max_concurrent_streams;
        }
        if other.initial_window_size.is_some() {
            self.initial_window_size = other.initial_window_size;
        }
        if other.max_frame_size.is_some() {
            self.max_frame_size = other.max_frame_size;
        }
        if other.max_header_list_size.is_some() {
            self.max_header_list_size = other.max_header_list_size;
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new()
    }
}

/// Builder for HTTP/2 settings
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Create a new settings builder
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings::new(),
        }
    }

    /// Set header table size
    pub fn header_table_size(mut self, size: u32) -> Self {
        self.settings.header_table_size = Some(size);
        self
    }

    /// Set enable push
    pub fn enable_push(mut self, enable: bool) -> Self {
        self.settings.enable_push = Some(enable);
        self
    }

    /// Set max concurrent streams
    pub fn max_concurrent_streams(mut self, max: u32) -> Self {
        self.settings.max_concurrent_streams = Some(max);
        self
    }

    /// Set initial window size
    pub fn initial_window_size(mut self, size: u32) -> Self {
        self.settings.initial_window_size = Some(size);
        self
    }

    /// Set max frame size
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.settings.max_frame_size = Some(size);
        self
    }

    /// Set max header list size
    pub fn max_header_list_size(mut self, size: u32) -> Self {
        self.settings.max_header_list_size = Some(size);
        self
    }

    /// Build the settings
    pub fn build(self) -> Result<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of applying a peer SETTINGS frame, for the connection to
/// propagate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerSettingsApplied {
    /// Delta to apply to every open stream's send window
    pub initial_window_delta: Option<i64>,
}

/// Outcome of a SETTINGS ack promoting one of our proposals.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSettingsAcked {
    /// Delta to apply to every open stream's receive window
    pub initial_window_delta: Option<i64>,
    /// New bound for our HPACK decoder's dynamic table
    pub header_table_size: Option<u32>,
}

/// Identifier of an in-flight local settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SettingsChangeId(u64);

/// Tracks the two settings views and the FIFO of un-acked local proposals.
#[derive(Debug)]
pub struct SettingsTracker {
    /// Our advertisement, as far as the peer has acknowledged it
    acknowledged: Settings,
    /// The peer's advertisement, which we must obey when sending
    peer: Settings,
    /// Local proposals awaiting a SETTINGS ack, in emission order
    pending: VecDeque<(SettingsChangeId, Settings)>,
    next_change_id: u64,
    acked_through: u64,
}

impl SettingsTracker {
    /// Create a tracker with both views at RFC defaults.
    pub fn new() -> Self {
        SettingsTracker {
            acknowledged: Settings::new(),
            peer: Settings::new(),
            pending: VecDeque::new(),
            next_change_id: 0,
            acked_through: 0,
        }
    }

    /// Our advertisement as acknowledged by the peer.
    pub fn acknowledged(&self) -> &Settings {
        &self.acknowledged
    }

    /// The peer's advertisement.
    pub fn peer(&self) -> &Settings {
        &self.peer
    }

    /// Number of local proposals awaiting acknowledgement.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Queue a validated local proposal; the caller emits the frame.
    pub fn propose(&mut self, settings: Settings) -> Result<SettingsChangeId> {
        settings.validate()?;
        self.next_change_id += 1;
        let id = SettingsChangeId(self.next_change_id);
        self.pending.push_back((id, settings));
        Ok(id)
    }

    /// Whether a previously proposed change has been acknowledged.
    pub fn change_acked(&self, id: SettingsChangeId) -> bool {
        id.0 <= self.acked_through
    }

    /// Promote the oldest pending proposal on receipt of a SETTINGS ack.
    ///
    /// An ack with nothing pending is tolerated (the peer may ack our empty
    /// initial frame twice across implementations); it promotes nothing.
    pub fn on_ack(&mut self) -> LocalSettingsAcked {
        let (id, change) = match self.pending.pop_front() {
            Some(entry) => entry,
            None => return LocalSettingsAcked::default(),
        };
        self.acked_through = id.0;

        let mut outcome = LocalSettingsAcked::default();
        if let Some(new_size) = change.initial_window_size {
            let old = self.acknowledged.get_initial_window_size();
            if new_size != old {
                outcome.initial_window_delta = Some(new_size as i64 - old as i64);
            }
        }
        if let Some(size) = change.header_table_size {
            outcome.header_table_size = Some(size);
        }
        self.acknowledged.merge(&change);
        outcome
    }

    /// Apply a peer SETTINGS frame atomically, after validation.
    ///
    /// Returns the propagation work: the send-window delta for open streams
    /// and the encoder table bound, if those settings changed.
    pub fn apply_peer(&mut self, settings: &Settings) -> Result<PeerSettingsApplied> {
        settings.validate_from_peer()?;

        let mut outcome = PeerSettingsApplied::default();
        if let Some(new_size) = settings.initial_window_size {
            let old = self.peer.get_initial_window_size();
            if new_size != old {
                outcome.initial_window_delta = Some(new_size as i64 - old as i64);
            }
        }
        self.peer.merge(settings);
        Ok(outcome)
    }

    /// Fail all pending proposals (connection terminated).
    pub fn fail_pending(&mut self) {
        self.pending.clear();
    }
}

impl Default for SettingsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_parameter_conversion() {
        assert_eq!(SettingsParameter::HeaderTableSize.as_u16(), 0x1);
        assert_eq!(SettingsParameter::MaxHeaderListSize.as_u16(), 0x6);

        assert_eq!(
            SettingsParameter::from_u16(0x4),
            Some(SettingsParameter::InitialWindowSize)
        );
        assert_eq!(SettingsParameter::from_u16(0xff), None);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.get_header_table_size(), 4096);
        assert!(settings.get_enable_push());
        assert_eq!(settings.get_max_concurrent_streams(), None);
        assert_eq!(settings.get_initial_window_size(), 65535);
        assert_eq!(settings.get_max_frame_size(), 16384);
        assert_eq!(settings.get_max_header_list_size(), None);
    }

    #[test]
    fn test_settings_builder_validation() {
        let settings = SettingsBuilder::new()
            .initial_window_size(0x7FFF_FFFF)
            .max_frame_size(16_777_215)
            .build();
        assert!(settings.is_ok());

        // 2^31 is one past the flow-control bound.
        let settings = SettingsBuilder::new().initial_window_size(0x8000_0000).build();
        assert!(settings.is_err());

        let settings = SettingsBuilder::new().max_frame_size(1024).build();
        assert!(settings.is_err());

        let settings = SettingsBuilder::new().max_frame_size(16_777_216).build();
        assert!(settings.is_err());
    }

    #[test]
    fn test_apply_raw_enable_push_range() {
        let mut settings = Settings::new();
        settings.apply_raw(0x2, 1).unwrap();
        assert_eq!(settings.enable_push, Some(true));

        assert!(settings.apply_raw(0x2, 2).is_err());
    }

    #[test]
    fn test_apply_raw_ignores_unknown() {
        let mut settings = Settings::new();
        settings.apply_raw(0x99, 12345).unwrap();
        assert_eq!(settings, Settings::new());
    }

    #[test]
    fn test_peer_validation_error_classes() {
        let mut s = Settings::new();
        s.initial_window_size = Some(0x8000_0000);
        assert!(matches!(
            s.validate_from_peer(),
            Err(Error::FlowControl(_))
        ));

        let mut s = Settings::new();
        s.max_frame_size = Some(100);
        assert!(matches!(s.validate_from_peer(), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_tracker_ack_fifo() {
        let mut tracker = SettingsTracker::new();

        let first = tracker
            .propose(SettingsBuilder::new().initial_window_size(100).build().unwrap())
            .unwrap();
        let second = tracker
            .propose(SettingsBuilder::new().header_table_size(8192).build().unwrap())
            .unwrap();
        assert_eq!(tracker.pending_len(), 2);
        assert!(!tracker.change_acked(first));

        let outcome = tracker.on_ack();
        assert_eq!(outcome.initial_window_delta, Some(100 - 65535));
        assert!(tracker.change_acked(first));
        assert!(!tracker.change_acked(second));
        assert_eq!(tracker.acknowledged().get_initial_window_size(), 100);

        let outcome = tracker.on_ack();
        assert_eq!(outcome.header_table_size, Some(8192));
        assert!(tracker.change_acked(second));
        assert_eq!(tracker.pending_len(), 0);
    }

    #[test]
    fn test_tracker_spurious_ack_ignored() {
        let mut tracker = SettingsTracker::new();
        let outcome = tracker.on_ack();
        assert!(outcome.initial_window_delta.is_none());
        assert!(outcome.header_table_size.is_none());
    }

    #[test]
    fn test_tracker_peer_apply_delta() {
        let mut tracker = SettingsTracker::new();
        let mut change = Settings::new();
        change.initial_window_size = Some(70000);

        let outcome = tracker.apply_peer(&change).unwrap();
        assert_eq!(outcome.initial_window_delta, Some(70000 - 65535));
        assert_eq!(tracker.peer().get_initial_window_size(), 70000);

        // Same value again: no delta.
        let outcome = tracker.apply_peer(&change).unwrap();
        assert!(outcome.initial_window_delta.is_none());
    }
}
