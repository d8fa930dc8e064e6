//! Flow control windows
//!
//! HTTP/2 flow control as defined in RFC 7540 Section 5.2, applied at both
//! the connection and stream level. A window is a signed credit of octets:
//! the send side spends credit and waits for WINDOW_UPDATE; the receive side
//! charges accepted octets and replenishes the peer once enough has been
//! consumed.

use super::error::{Error, Result};
use super::DEFAULT_INITIAL_WINDOW_SIZE;

/// Largest legal window value (2^31 - 1)
pub const MAX_WINDOW_SIZE: i64 = 0x7FFF_FFFF;

/// Flow control window
///
/// Tracks available credit. The value can go negative when a retroactive
/// INITIAL_WINDOW_SIZE decrease lands on an in-flight stream; it must never
/// exceed 2^31 - 1.
#[derive(Debug, Clone)]
pub struct FlowControlWindow {
    /// Initial window size
    initial_size: u32,
    /// Current credit (can be negative after a settings decrease)
    current_size: i64,
}

impl FlowControlWindow {
    /// Create a new flow control window with default size
    pub fn new() -> Self {
        Self::with_initial_size(DEFAULT_INITIAL_WINDOW_SIZE)
    }

    /// Create a new flow control window with specified initial size
    pub fn with_initial_size(initial_size: u32) -> Self {
        FlowControlWindow {
            initial_size,
            current_size: initial_size as i64,
        }
    }

    /// Get current window size
    pub fn size(&self) -> i64 {
        self.current_size
    }

    /// Get initial window size
    pub fn initial_size(&self) -> u32 {
        self.initial_size
    }

    /// Check if window has available capacity
    pub fn has_capacity(&self) -> bool {
        self.current_size > 0
    }

    /// Octets that may be sent right now
    pub fn available(&self) -> usize {
        self.current_size.max(0) as usize
    }

    /// Spend credit for octets about to be sent.
    ///
    /// The caller sizes the chunk against `available()` first; spending more
    /// than the window holds is an accounting bug.
    pub fn consume(&mut self, amount: usize) -> Result<()> {
        if (amount as i64) > self.current_size {
            return Err(Error::Internal(format!(
                "window over-spend: {} requested, {} available",
                amount, self.current_size
            )));
        }
        self.current_size -= amount as i64;
        Ok(())
    }

    /// Charge octets accepted from the peer against the receive window.
    ///
    /// Exceeding the window is the peer's fault: flow-control error.
    pub fn charge(&mut self, amount: usize) -> Result<()> {
        if (amount as i64) > self.current_size {
            return Err(Error::FlowControl(format!(
                "peer overran window: {} octets, {} available",
                amount, self.current_size
            )));
        }
        self.current_size -= amount as i64;
        Ok(())
    }

    /// Increase window size (WINDOW_UPDATE)
    ///
    /// Returns the new window size. A zero increment and a resulting value
    /// beyond 2^31 - 1 are both flow-control errors (RFC 7540 Section 6.9).
    pub fn increase(&mut self, increment: u32) -> Result<i64> {
        if increment == 0 {
            return Err(Error::FlowControl(
                "window update increment must be non-zero".to_string(),
            ));
        }

        let new_size = self.current_size + increment as i64;
        if new_size > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "window size {} exceeds maximum (2^31-1)",
                new_size
            )));
        }

        self.current_size = new_size;
        Ok(self.current_size)
    }

    /// Apply a retroactive INITIAL_WINDOW_SIZE delta from a settings change.
    pub fn apply_delta(&mut self, delta: i64) -> Result<()> {
        let new_current = self.current_size + delta;
        if new_current > MAX_WINDOW_SIZE {
            return Err(Error::FlowControl(format!(
                "window size {} exceeds maximum (2^31-1) after settings change",
                new_current
            )));
        }
        self.initial_size = (self.initial_size as i64 + delta).max(0) as u32;
        self.current_size = new_current;
        Ok(())
    }

    /// Credit needed to restore the window to its initial size
    pub fn deficit(&self) -> u32 {
        (self.initial_size as i64 - self.current_size).max(0) as u32
    }
}

impl Default for FlowControlWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection-level flow control
///
/// One send window gating the outbound DATA queue and one receive window
/// covering all inbound DATA, with automatic replenishment.
#[derive(Debug)]
pub struct ConnectionFlowControl {
    /// Send window (outbound data, peer's view of us)
    send_window: FlowControlWindow,
    /// Receive window (inbound data, our view of the peer)
    recv_window: FlowControlWindow,
}

impl ConnectionFlowControl {
    /// Create new connection-level flow control
    pub fn new() -> Self {
        ConnectionFlowControl {
            send_window: FlowControlWindow::new(),
            recv_window: FlowControlWindow::new(),
        }
    }

    /// Get send window
    pub fn send_window(&self) -> &FlowControlWindow {
        &self.send_window
    }

    /// Get receive window
    pub fn recv_window(&self) -> &FlowControlWindow {
        &self.recv_window
    }

    /// Octets that may be sent right now at connection scope
    pub fn send_available(&self) -> usize {
        self.send_window.available()
    }

    /// Spend send credit for outbound DATA
    pub fn consume_send(&mut self, amount: usize) -> Result<()> {
        self.send_window.consume(amount)
    }

    /// Add send credit from a connection-level WINDOW_UPDATE
    pub fn increase_send(&mut self, increment: u32) -> Result<i64> {
        self.send_window.increase(increment)
    }

    /// Charge inbound DATA octets against the receive window
    pub fn charge_recv(&mut self, amount: usize) -> Result<()> {
        self.recv_window.charge(amount)
    }

    /// Replenish the receive window if consumption crossed the threshold.
    ///
    /// Returns the increment to announce in a WINDOW_UPDATE. The threshold
    /// is half the initial size; the update restores the full initial size.
    pub fn replenish_recv(&mut self) -> Option<u32> {
        let initial = self.recv_window.initial_size() as i64;
        if self.recv_window.size() >= initial - initial / 2 {
            return None;
        }
        let increment = self.recv_window.deficit();
        if increment == 0 {
            return None;
        }
        // Restoring to the initial size cannot overflow the bound.
        self.recv_window
            .increase(increment)
            .expect("replenish within initial size");
        Some(increment)
    }
}

impl Default for ConnectionFlowControl {
    fn default() -> Self {
        Self::new()
    }
}
