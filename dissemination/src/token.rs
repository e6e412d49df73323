//! Configuration token: wire record, wrapping comparison and local store.
//!
//! The token is a one-byte wrapping sequence number attached to a small
//! configuration record `{token, target_node, target_interval}`. Every node
//! keeps one record; nodes converge on the numerically newest token under
//! the wrapping order defined by [`compare_tokens`].

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Node identifier as carried on the wire.
pub type NodeId = i32;

/// Wire value of [`ReportInterval::Short`].
pub const INTERVAL_CODE_SHORT: i32 = 1;
/// Wire value of [`ReportInterval::Long`].
pub const INTERVAL_CODE_LONG: i32 = 2;

/// The two reporting cadences a node can run.
///
/// The mapping from code to concrete period (seconds) lives in the
/// collector's config; dissemination only moves the codes around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportInterval {
    Short,
    Long,
}

impl ReportInterval {
    /// The interval code used on the wire and in sample records.
    pub fn code(&self) -> i32 {
        match self {
            ReportInterval::Short => INTERVAL_CODE_SHORT,
            ReportInterval::Long => INTERVAL_CODE_LONG,
        }
    }

    /// Decode a wire interval code. Unknown codes yield `None`; inbound
    /// packets may carry any bit pattern.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            INTERVAL_CODE_SHORT => Some(ReportInterval::Short),
            INTERVAL_CODE_LONG => Some(ReportInterval::Long),
            _ => None,
        }
    }

    /// The other cadence. Targeted adoption flips between the two.
    pub fn toggled(&self) -> Self {
        match self {
            ReportInterval::Short => ReportInterval::Long,
            ReportInterval::Long => ReportInterval::Short,
        }
    }
}

impl fmt::Display for ReportInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportInterval::Short => write!(f, "short"),
            ReportInterval::Long => write!(f, "long"),
        }
    }
}

/// The configuration record gossiped on the control channel.
///
/// Field order is the wire order. `target_interval` is an interval code,
/// nominally 1 or 2, but any inbound value is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPacket {
    pub token: u8,
    pub target_node: NodeId,
    pub target_interval: i32,
}

impl fmt::Display for TokenPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "token 0x{:02x} node {} interval {}",
            self.token, self.target_node, self.target_interval
        )
    }
}

/// Relative age of a peer's token under wrapping comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrdering {
    /// Peer agrees with us.
    Consistent,
    /// Peer's token is newer; we should adopt it.
    PeerNewer,
    /// Peer lags behind; it needs to hear from us.
    PeerStale,
}

/// Compare our token byte against a peer's.
///
/// The difference is taken in wrapping u8 arithmetic and reinterpreted as a
/// signed byte, so the order survives wraparound: 250 is older than 5, not
/// newer, because 5 - 250 wraps to a small positive delta.
pub fn compare_tokens(ours: u8, theirs: u8) -> TokenOrdering {
    let delta = ours.wrapping_sub(theirs) as i8;
    if delta == 0 {
        TokenOrdering::Consistent
    } else if delta < 0 {
        TokenOrdering::PeerNewer
    } else {
        TokenOrdering::PeerStale
    }
}

/// Process-local token state.
///
/// Holds the current token and target fields (what this node broadcasts),
/// plus the locally active reporting interval and the one-shot
/// "interval just changed" marker consumed by the first sample drawn after
/// a targeted change.
///
/// Adoption copies only the token byte. The target fields are written by
/// the admin surface alone, so a node that adopts a newer token
/// re-broadcasts it with its own, possibly stale, target fields. That is
/// the protocol's behavior, not an oversight.
#[derive(Debug, Clone)]
pub struct TokenStore {
    token: u8,
    target_node: NodeId,
    target_interval: i32,
    active_interval: ReportInterval,
    interval_changed: Option<i32>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    /// Fresh store: token zero, no target, short interval active.
    pub fn new() -> Self {
        Self {
            token: 0,
            target_node: 0,
            target_interval: 0,
            active_interval: ReportInterval::Short,
            interval_changed: None,
        }
    }

    pub fn token(&self) -> u8 {
        self.token
    }

    pub fn target_node(&self) -> NodeId {
        self.target_node
    }

    pub fn target_interval(&self) -> i32 {
        self.target_interval
    }

    pub fn active_interval(&self) -> ReportInterval {
        self.active_interval
    }

    /// Classify a peer's token against ours.
    pub fn classify(&self, theirs: u8) -> TokenOrdering {
        compare_tokens(self.token, theirs)
    }

    /// Adopt a newer token byte. Target fields are left untouched.
    pub fn adopt(&mut self, token: u8) {
        self.token = token;
    }

    /// Flip the active interval and arm the one-shot marker with the code
    /// that was active before the flip. Returns the new active interval.
    pub fn toggle_active_interval(&mut self) -> ReportInterval {
        self.interval_changed = Some(self.active_interval.code());
        self.active_interval = self.active_interval.toggled();
        self.active_interval
    }

    /// Consume the one-shot marker. At most one caller ever sees a value
    /// per toggle.
    pub fn take_interval_changed(&mut self) -> Option<i32> {
        self.interval_changed.take()
    }

    /// True while a toggle is pending consumption.
    pub fn interval_change_pending(&self) -> bool {
        self.interval_changed.is_some()
    }

    /// Overwrite the target fields and mint the next token. Returns the new
    /// token byte. Admin-surface only.
    pub fn mint(&mut self, target_node: NodeId, target_interval: i32) -> u8 {
        self.target_node = target_node;
        self.target_interval = target_interval;
        self.token = self.token.wrapping_add(1);
        self.token
    }

    /// The record this node broadcasts on the control channel.
    pub fn outbound_packet(&self) -> TokenPacket {
        TokenPacket {
            token: self.token,
            target_node: self.target_node,
            target_interval: self.target_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case(0, 0, TokenOrdering::Consistent ; "zero equal")]
    #[test_case(137, 137, TokenOrdering::Consistent ; "arbitrary equal")]
    #[test_case(4, 5, TokenOrdering::PeerNewer ; "peer one ahead")]
    #[test_case(5, 4, TokenOrdering::PeerStale ; "peer one behind")]
    #[test_case(250, 5, TokenOrdering::PeerNewer ; "peer ahead across wrap")]
    #[test_case(5, 250, TokenOrdering::PeerStale ; "peer behind across wrap")]
    #[test_case(255, 0, TokenOrdering::PeerNewer ; "wrap by one")]
    #[test_case(0, 255, TokenOrdering::PeerStale ; "behind by one across wrap")]
    // At distance exactly 128 the signed delta is -128 from both ends, so
    // each side reads the other as newer. Inherent to sequence arithmetic.
    #[test_case(0, 128, TokenOrdering::PeerNewer ; "half range forward")]
    #[test_case(128, 0, TokenOrdering::PeerNewer ; "half range backward")]
    fn test_compare_tokens(ours: u8, theirs: u8, expected: TokenOrdering) {
        assert_eq!(compare_tokens(ours, theirs), expected);
    }

    #[test]
    fn test_adopt_leaves_target_fields_alone() {
        let mut store = TokenStore::new();
        store.mint(7, 2);
        let before = store.outbound_packet();

        store.adopt(before.token.wrapping_add(3));

        let after = store.outbound_packet();
        assert_eq!(after.token, before.token.wrapping_add(3));
        assert_eq!(after.target_node, before.target_node);
        assert_eq!(after.target_interval, before.target_interval);
    }

    #[test]
    fn test_toggle_sets_one_shot_with_pre_toggle_code() {
        let mut store = TokenStore::new();
        assert_eq!(store.active_interval(), ReportInterval::Short);

        let new = store.toggle_active_interval();
        assert_eq!(new, ReportInterval::Long);
        assert!(store.interval_change_pending());

        // The marker carries the code that was active when the change hit.
        assert_eq!(store.take_interval_changed(), Some(INTERVAL_CODE_SHORT));
        // One-shot: the second read sees nothing.
        assert_eq!(store.take_interval_changed(), None);
        assert!(!store.interval_change_pending());
    }

    #[test]
    fn test_toggle_back_and_forth() {
        let mut store = TokenStore::new();
        store.toggle_active_interval();
        store.toggle_active_interval();
        assert_eq!(store.active_interval(), ReportInterval::Short);
        // A second toggle before the first consume overwrites the marker.
        assert_eq!(store.take_interval_changed(), Some(INTERVAL_CODE_LONG));
    }

    #[test]
    fn test_mint_increments_and_wraps() {
        let mut store = TokenStore::new();
        assert_eq!(store.mint(3, 1), 1);
        assert_eq!(store.mint(3, 1), 2);

        for _ in 0..253 {
            store.mint(3, 1);
        }
        assert_eq!(store.token(), 255);
        assert_eq!(store.mint(3, 2), 0);
        assert_eq!(store.target_interval(), 2);
    }

    #[test]
    fn test_interval_codes_roundtrip() {
        assert_eq!(ReportInterval::from_code(1), Some(ReportInterval::Short));
        assert_eq!(ReportInterval::from_code(2), Some(ReportInterval::Long));
        assert_eq!(ReportInterval::from_code(0), None);
        assert_eq!(ReportInterval::from_code(600), None);
        assert_eq!(ReportInterval::Short.toggled(), ReportInterval::Long);
        assert_eq!(ReportInterval::Long.toggled().code(), 1);
    }
}
