//! Decision engine for configuration-token dissemination.
//!
//! The engine is a pure state machine: it owns the [`TokenStore`] and turns
//! inputs (inbound packets, due transmissions, admin edits) into an
//! [`EngineOutput`] describing what the caller should do. It performs no
//! I/O and never touches the Trickle timer directly, which keeps every
//! decision unit-testable without sockets or clocks.
//!
//! Inputs arrive from three places:
//!
//! 1. `on_receive` — a token packet heard on the control channel.
//! 2. `on_transmit_due` — the Trickle timer reached its fire point.
//! 3. `on_admin_edit` — the border router's admin surface minted a change.

use {
    crate::token::{NodeId, ReportInterval, TokenOrdering, TokenPacket, TokenStore},
    log::*,
};

/// Side effect requested of the Trickle timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// A consistent packet was heard; bump the redundancy counter.
    Consistency,
    /// Divergence was observed; shrink the interval back towards Imin.
    Inconsistency,
    /// Fresh data was minted; restart dissemination from Imin.
    Reset,
}

/// What a handler decided. The caller owns every side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    /// Packet to broadcast on the control channel, if any.
    pub broadcast: Option<TokenPacket>,
    /// Signal to deliver to the Trickle timer, if any.
    pub timer_signal: Option<TimerSignal>,
    /// Set when a targeted adoption flipped this node's active interval.
    pub interval_changed_to: Option<ReportInterval>,
}

impl EngineOutput {
    pub fn empty() -> Self {
        Self {
            broadcast: None,
            timer_signal: None,
            interval_changed_to: None,
        }
    }

    fn with_signal(signal: TimerSignal) -> Self {
        Self {
            timer_signal: Some(signal),
            ..Self::empty()
        }
    }

    fn with_broadcast(packet: TokenPacket) -> Self {
        Self {
            broadcast: Some(packet),
            ..Self::empty()
        }
    }
}

/// Pure dissemination state machine for one node.
pub struct DisseminationEngine {
    node_id: NodeId,
    /// Nodes without a collector (the border router) never apply targeted
    /// interval toggles; they still adopt and re-broadcast tokens.
    hosts_collector: bool,
    store: TokenStore,
}

impl DisseminationEngine {
    pub fn new(node_id: NodeId, hosts_collector: bool) -> Self {
        Self {
            node_id,
            hosts_collector,
            store: TokenStore::new(),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TokenStore {
        &mut self.store
    }

    // -- Handlers --

    /// A token packet arrived on the control channel.
    pub fn on_receive(&mut self, packet: &TokenPacket) -> EngineOutput {
        debug!(
            "Our token=0x{:02x}, theirs=0x{:02x}",
            self.store.token(),
            packet.token
        );
        match self.store.classify(packet.token) {
            TokenOrdering::Consistent => {
                trace!("consistent RX");
                EngineOutput::with_signal(TimerSignal::Consistency)
            }
            TokenOrdering::PeerNewer => {
                info!("theirs is newer, adopting token 0x{:02x}", packet.token);
                self.store.adopt(packet.token);
                let mut output = EngineOutput::with_signal(TimerSignal::Inconsistency);
                if packet.target_node == self.node_id && self.hosts_collector {
                    let interval = self.store.toggle_active_interval();
                    info!("change node [{}] interval => {interval}", self.node_id);
                    output.interval_changed_to = Some(interval);
                }
                output
            }
            TokenOrdering::PeerStale => {
                debug!("they are behind");
                EngineOutput::with_signal(TimerSignal::Inconsistency)
            }
        }
    }

    /// The Trickle timer reached its fire point. With `suppress` set the
    /// redundancy counter met k and nothing is sent.
    pub fn on_transmit_due(&mut self, suppress: bool) -> EngineOutput {
        if suppress {
            trace!("trickle TX suppressed");
            return EngineOutput::empty();
        }
        let packet = self.store.outbound_packet();
        debug!("Trickle TX token 0x{:02x}", packet.token);
        EngineOutput::with_broadcast(packet)
    }

    /// The admin surface requested an interval change. Mints the next
    /// token and demands a full dissemination restart. Runs
    /// unconditionally: editing to the current values still produces a new
    /// token and a new flood.
    pub fn on_admin_edit(&mut self, target_node: NodeId, target_interval: i32) -> EngineOutput {
        let token = self.store.mint(target_node, target_interval);
        info!("generating a new token 0x{token:02x}");
        EngineOutput::with_signal(TimerSignal::Reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sensor(node_id: NodeId) -> DisseminationEngine {
        DisseminationEngine::new(node_id, true)
    }

    fn make_border_router(node_id: NodeId) -> DisseminationEngine {
        DisseminationEngine::new(node_id, false)
    }

    fn packet(token: u8, target_node: NodeId, target_interval: i32) -> TokenPacket {
        TokenPacket {
            token,
            target_node,
            target_interval,
        }
    }

    // ════════════════════════════════════════════════════════════════════
    //  Consistent receipts
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn test_consistent_rx_signals_consistency_only() {
        let mut engine = make_sensor(1);
        let output = engine.on_receive(&packet(0, 0, 0));
        assert_eq!(output.timer_signal, Some(TimerSignal::Consistency));
        assert_eq!(output.broadcast, None);
        assert_eq!(output.interval_changed_to, None);
    }

    #[test]
    fn test_consistent_rx_is_idempotent_on_store() {
        let mut engine = make_sensor(1);
        let before = engine.store().outbound_packet();

        for _ in 0..5 {
            let output = engine.on_receive(&packet(before.token, 9, 2));
            assert_eq!(output.timer_signal, Some(TimerSignal::Consistency));
        }

        assert_eq!(engine.store().outbound_packet(), before);
        assert!(!engine.store().interval_change_pending());
    }

    // ════════════════════════════════════════════════════════════════════
    //  Adoption
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn test_newer_token_adopted_with_inconsistency_signal() {
        let mut engine = make_sensor(4);
        let output = engine.on_receive(&packet(1, 0, 0));

        assert_eq!(output.timer_signal, Some(TimerSignal::Inconsistency));
        assert_eq!(engine.store().token(), 1);
        assert_eq!(output.interval_changed_to, None, "target was node 0");
    }

    #[test]
    fn test_targeted_adoption_toggles_interval_exactly_once() {
        let mut engine = make_sensor(3);
        engine.store_mut().adopt(10);

        let output = engine.on_receive(&packet(11, 3, 2));
        assert_eq!(engine.store().token(), 11);
        assert_eq!(output.interval_changed_to, Some(ReportInterval::Long));
        assert_eq!(engine.store_mut().take_interval_changed(), Some(1));

        // The same packet again is now consistent: no second toggle.
        let output = engine.on_receive(&packet(11, 3, 2));
        assert_eq!(output.timer_signal, Some(TimerSignal::Consistency));
        assert_eq!(output.interval_changed_to, None);
        assert_eq!(engine.store().active_interval(), ReportInterval::Long);
        assert_eq!(engine.store_mut().take_interval_changed(), None);
    }

    #[test]
    fn test_untargeted_adoption_keeps_interval() {
        let mut engine = make_sensor(7);
        engine.store_mut().adopt(10);

        let output = engine.on_receive(&packet(11, 3, 2));
        assert_eq!(engine.store().token(), 11, "token adopted regardless");
        assert_eq!(output.interval_changed_to, None);
        assert_eq!(engine.store().active_interval(), ReportInterval::Short);
    }

    #[test]
    fn test_border_router_ignores_targeted_toggle() {
        let mut engine = make_border_router(1);
        let output = engine.on_receive(&packet(5, 1, 2));
        assert_eq!(engine.store().token(), 5);
        assert_eq!(output.interval_changed_to, None);
    }

    #[test]
    fn test_adoption_across_wraparound() {
        let mut engine = make_sensor(2);
        engine.store_mut().adopt(250);

        // 5 is newer than 250 under wrapping comparison.
        let output = engine.on_receive(&packet(5, 0, 0));
        assert_eq!(output.timer_signal, Some(TimerSignal::Inconsistency));
        assert_eq!(engine.store().token(), 5);
    }

    // ════════════════════════════════════════════════════════════════════
    //  Stale peers
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn test_stale_token_signals_inconsistency_without_adoption() {
        let mut engine = make_sensor(2);
        engine.store_mut().adopt(5);

        // 250 is behind 5 across the wrap: no adoption, but the timer is
        // told to speed up so the laggard hears from us soon.
        let output = engine.on_receive(&packet(250, 2, 2));
        assert_eq!(output.timer_signal, Some(TimerSignal::Inconsistency));
        assert_eq!(engine.store().token(), 5);
        assert_eq!(output.interval_changed_to, None);
        assert_eq!(engine.store().active_interval(), ReportInterval::Short);
    }

    // ════════════════════════════════════════════════════════════════════
    //  Transmissions
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn test_transmit_due_broadcasts_local_record() {
        let mut engine = make_border_router(1);
        engine.on_admin_edit(3, 2);

        let output = engine.on_transmit_due(false);
        assert_eq!(
            output.broadcast,
            Some(TokenPacket {
                token: 1,
                target_node: 3,
                target_interval: 2,
            })
        );
        assert_eq!(output.timer_signal, None);
    }

    #[test]
    fn test_transmit_due_suppressed_sends_nothing() {
        let mut engine = make_sensor(1);
        let output = engine.on_transmit_due(true);
        assert_eq!(output, EngineOutput::empty());
    }

    #[test]
    fn test_rebroadcast_after_adoption_carries_local_target_fields() {
        // A node that adopts a newer token does not learn the peer's
        // target fields; its re-broadcast pairs the new token with its own
        // record.
        let mut engine = make_sensor(2);
        engine.on_receive(&packet(9, 3, 2));

        let output = engine.on_transmit_due(false);
        let rebroadcast = output.broadcast.unwrap();
        assert_eq!(rebroadcast.token, 9);
        assert_eq!(rebroadcast.target_node, 0);
        assert_eq!(rebroadcast.target_interval, 0);
    }

    // ════════════════════════════════════════════════════════════════════
    //  Admin edits
    // ════════════════════════════════════════════════════════════════════

    #[test]
    fn test_admin_edit_mints_and_resets() {
        let mut engine = make_border_router(1);
        let output = engine.on_admin_edit(3, 1);

        assert_eq!(output.timer_signal, Some(TimerSignal::Reset));
        assert_eq!(output.broadcast, None, "the reset floods it soon enough");
        assert_eq!(engine.store().token(), 1);
        assert_eq!(engine.store().target_node(), 3);
        assert_eq!(engine.store().target_interval(), 1);
    }

    #[test]
    fn test_repeated_identical_edits_keep_minting() {
        let mut engine = make_border_router(1);
        engine.on_admin_edit(2, 1);
        let output = engine.on_admin_edit(2, 1);

        assert_eq!(output.timer_signal, Some(TimerSignal::Reset));
        assert_eq!(engine.store().token(), 2, "every edit mints a new token");
    }
}
