//! "Latest request wins" guard for list refreshes.
//!
//! A refresh takes a ticket before it suspends on the network. Any newer
//! refresh or local mutation bumps the generation, and a response carrying an
//! older ticket is discarded instead of clobbering newer state.

/// Generation a refresh was started under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Monotonic request counter.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: u64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket.
    pub fn begin(&mut self) -> RequestTicket {
        self.bump();
        RequestTicket(self.current)
    }

    /// Invalidate outstanding tickets without starting a request.
    pub fn bump(&mut self) {
        self.current = self.current.wrapping_add(1);
    }

    /// Whether `ticket` is still the newest.
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let mut gen = RequestGeneration::new();
        let first = gen.begin();
        let second = gen.begin();
        assert!(!gen.is_current(first));
        assert!(gen.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn bump_invalidates_outstanding_ticket() {
        let mut gen = RequestGeneration::new();
        let ticket = gen.begin();
        gen.bump();
        assert!(!gen.is_current(ticket));
    }
}
