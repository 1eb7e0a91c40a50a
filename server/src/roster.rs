//! Group membership queries.
//!
//! Groups are not stored anywhere; a group is simply the set of logged-in
//! sessions whose current group name matches. An empty group vanishes on its
//! own.

use crate::session::SessionId;
use crate::session_manager::SessionManager;
use shared::{GroupName, PeerEntry};

/// Peers that share `group`, excluding `requester`, in registry order.
pub fn group_roster<S>(
    sessions: &SessionManager<S>,
    group: &GroupName,
    requester: SessionId,
) -> Vec<PeerEntry> {
    sessions
        .iter()
        .filter(|session| session.id() != requester)
        .filter(|session| session.group() == Some(group))
        .filter_map(|session| session.identity())
        .map(|identity| identity.peer_entry())
        .collect()
}

/// Number of logged-in sessions currently in `group`.
pub fn group_size<S>(sessions: &SessionManager<S>, group: &GroupName) -> usize {
    sessions
        .iter()
        .filter(|session| session.group() == Some(group))
        .count()
}
