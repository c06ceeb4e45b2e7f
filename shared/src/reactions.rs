use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error};

use crate::model::{UserId, UserRef};

/// Route parameters of the reactions screen.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactionsPayload {
    #[serde(default)]
    pub reactions: Option<Vec<UserRef>>,
    #[serde(default)]
    pub hide_reaction_icon: bool,
}

/// De-duplicated reactors, ready to render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactionSet {
    pub users: Vec<UserRef>,
    pub hide_reaction_icon: bool,
}

impl ReactionSet {
    pub fn from_payload(payload: &ReactionsPayload) -> Self {
        let users = match &payload.reactions {
            Some(raw) => dedupe_reactions(raw),
            None => {
                error!("reactions payload is missing reaction data");
                Vec::new()
            }
        };

        Self {
            users,
            hide_reaction_icon: payload.hide_reaction_icon,
        }
    }
}

/// One entry per `_id`. A later record for the same user replaces the
/// earlier one but keeps its position; records without an `_id` drop out,
/// even when they carry a `userId`.
pub fn dedupe_reactions(raw: &[UserRef]) -> Vec<UserRef> {
    let mut slots: HashMap<UserId, usize> = HashMap::with_capacity(raw.len());
    let mut users: Vec<UserRef> = Vec::with_capacity(raw.len());

    for user in raw {
        if user.id.is_empty() {
            continue;
        }
        match slots.get(&user.id) {
            Some(&slot) => users[slot] = user.clone(),
            None => {
                slots.insert(user.id.clone(), users.len());
                users.push(user.clone());
            }
        }
    }

    if users.len() != raw.len() {
        debug!(raw = raw.len(), unique = users.len(), "filtered duplicate reactions");
    }
    users
}

/// Likers for the reactions screen: the current user surfaces first when
/// they liked the item, and never appears twice.
pub fn likers_for_display(
    likes: &[UserRef],
    current_user: Option<&UserRef>,
    liked_by_current_user: bool,
) -> Vec<UserRef> {
    let others = likes
        .iter()
        .filter(|user| !current_user.is_some_and(|me| user.id == me.id))
        .cloned();

    match current_user {
        Some(me) if liked_by_current_user => std::iter::once(me.clone()).chain(others).collect(),
        _ => others.collect(),
    }
}
