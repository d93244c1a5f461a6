//! Store key layout.
//!
//! | namespace | key |
//! |-----------|-----|
//! | threads | `threads:{owner}:{thread}` |
//! | messages | `messages:{owner}:{thread}:{message}` |
//! | settings | `settings:{kind}:{owner}` |
//! | change log | `changes:{owner}:{kind}:{id}:{millis}:{operation}` |
//! | attribution | `origin:{owner}:{kind}:{id}:{millis}` |
//!
//! Owner and thread segments are UUIDs and never contain `:`, so every
//! prefix below selects exactly one owner (and thread).

use chatsync_protocol::{OperationKind, ResourceKind, Timestamp, UserId};
use std::fmt::Display;

pub(crate) fn thread(owner: &UserId, thread_id: &str) -> String {
    format!("threads:{owner}:{thread_id}")
}

pub(crate) fn thread_prefix(owner: &UserId) -> String {
    format!("threads:{owner}:")
}

pub(crate) fn message(owner: &UserId, thread_id: &impl Display, message_id: &str) -> String {
    format!("messages:{owner}:{thread_id}:{message_id}")
}

pub(crate) fn message_prefix(owner: &UserId, thread_id: &impl Display) -> String {
    format!("messages:{owner}:{thread_id}:")
}

pub(crate) fn settings(kind: ResourceKind, owner: &UserId) -> String {
    format!("settings:{kind}:{owner}")
}

pub(crate) fn change(
    owner: &UserId,
    kind: ResourceKind,
    id: &str,
    at: Timestamp,
    operation: OperationKind,
) -> String {
    format!("changes:{owner}:{kind}:{id}:{at}:{operation}")
}

pub(crate) fn change_prefix(owner: &UserId) -> String {
    format!("changes:{owner}:")
}

pub(crate) fn origin(owner: &UserId, kind: ResourceKind, id: &str, at: Timestamp) -> String {
    format!("origin:{owner}:{kind}:{id}:{at}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn prefixes_select_their_keys() {
        let owner = Uuid::new_v4();
        let thread_id = Uuid::new_v4();

        assert!(thread(&owner, &thread_id.to_string()).starts_with(&thread_prefix(&owner)));
        assert!(message(&owner, &thread_id, "m1").starts_with(&message_prefix(&owner, &thread_id)));
        let at = Timestamp::from_millis(5);
        assert!(change(&owner, ResourceKind::Message, "m1", at, OperationKind::Create)
            .starts_with(&change_prefix(&owner)));
    }

    #[test]
    fn owners_do_not_share_prefixes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(!thread(&b, "x").starts_with(&thread_prefix(&a)));
    }

    #[test]
    fn dimensions_are_distinct() {
        let owner = Uuid::new_v4();
        let at = Timestamp::from_millis(1);
        assert_ne!(
            origin(&owner, ResourceKind::Thread, "x", at),
            origin(&owner, ResourceKind::Message, "x", at)
        );
        assert_ne!(
            origin(&owner, ResourceKind::Thread, "x", at),
            origin(&Uuid::new_v4(), ResourceKind::Thread, "x", at)
        );
        assert_ne!(
            change(&owner, ResourceKind::Message, "x", at, OperationKind::Create),
            change(&owner, ResourceKind::Message, "x", at, OperationKind::Update)
        );
        assert_ne!(
            settings(ResourceKind::DisabledModels, &owner),
            settings(ResourceKind::AdvancedSettings, &owner)
        );
        assert_eq!(
            origin(&owner, ResourceKind::Message, "m", at),
            format!("origin:{owner}:message:m:1")
        );
    }
}
