//! Group Resolver - builds the selectable mint groups from the default guards
//! and the per-group overrides.

use futures::future::join_all;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::AllowLists;
use crate::errors::StorefrontError;
use crate::guards::evaluator::{evaluate, EvaluationContext};
use crate::guards::parser::{GuardParser, ParseContext};
use crate::guards::types::{CandyGuardConfig, GuardGroup, MintGroup};

/// Overlays `overrides` on `defaults` field by field.
pub fn shallow_merge(defaults: &GuardGroup, overrides: &GuardGroup) -> GuardGroup {
    GuardGroup {
        start_time: overrides.start_time.or(defaults.start_time),
        end_time: overrides.end_time.or(defaults.end_time),
        payment: overrides.payment.clone().or_else(|| defaults.payment.clone()),
        burn: overrides.burn.clone().or_else(|| defaults.burn.clone()),
        gate: overrides.gate.clone().or_else(|| defaults.gate.clone()),
        mint_limit: overrides.mint_limit.clone().or_else(|| defaults.mint_limit.clone()),
        redeem_limit: overrides.redeem_limit.or(defaults.redeem_limit),
        allowed: overrides.allowed.clone().or_else(|| defaults.allowed.clone()),
        allow_list_root: overrides.allow_list_root.or(defaults.allow_list_root),
        gatekeeper_network: overrides.gatekeeper_network.or(defaults.gatekeeper_network),
    }
}

/// Everything group resolution reads during one refresh.
#[derive(Debug, Clone, Copy)]
pub struct GroupInputs<'a> {
    pub config: &'a CandyGuardConfig,
    pub allow_lists: &'a AllowLists,
    pub parse: ParseContext<'a>,
    pub evaluation: EvaluationContext<'a>,
}

/// Parses and evaluates the unlabeled default guards.
pub async fn resolve_default(parser: &GuardParser, inputs: &GroupInputs<'_>) -> MintGroup {
    let parse = inputs.parse.with_allow_list(inputs.allow_lists.for_group(None));
    let guards = parser.parse(&inputs.config.default_guards, &parse).await;
    let states = evaluate(&guards, &inputs.evaluation);

    MintGroup {
        label: None,
        guards,
        states,
    }
}

/// Resolves every named group over `default_group`.
///
/// Groups are parsed concurrently and returned in configuration order after
/// the default group.
pub async fn resolve_groups(
    parser: &GuardParser,
    inputs: &GroupInputs<'_>,
    default_group: MintGroup,
) -> ResolvedGroups {
    let defaults = &default_group.guards;
    let named = join_all(inputs.config.groups.iter().map(|group| async move {
        let parse = inputs
            .parse
            .with_allow_list(inputs.allow_lists.for_group(Some(&group.label)));
        let own = parser.parse(&group.guards, &parse).await;
        let guards = shallow_merge(defaults, &own);
        let states = evaluate(&guards, &inputs.evaluation);

        debug!(
            "Resolved group {} (can mint: {})",
            group.label,
            states.can_mint()
        );
        MintGroup {
            label: Some(group.label.clone()),
            guards,
            states,
        }
    }))
    .await;

    ResolvedGroups::new(default_group, named)
}

/// Mint groups with the default group first.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroups(NonEmpty<MintGroup>);

impl ResolvedGroups {
    pub fn new(default_group: MintGroup, named: Vec<MintGroup>) -> Self {
        Self(NonEmpty {
            head: default_group,
            tail: named,
        })
    }

    pub fn default_group(&self) -> &MintGroup {
        &self.0.head
    }

    /// Named groups in configuration order.
    pub fn named(&self) -> &[MintGroup] {
        &self.0.tail
    }

    /// Looks up a group; `None` selects the default group.
    pub fn find(&self, label: Option<&str>) -> Result<&MintGroup, StorefrontError> {
        match label {
            None => Ok(self.default_group()),
            Some(label) => self
                .named()
                .iter()
                .find(|g| g.label.as_deref() == Some(label))
                .ok_or_else(|| StorefrontError::UnknownGroup(label.to_string())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MintGroup> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Rebuilds every group with `f`, keeping the order.
    pub fn map(self, f: impl FnMut(MintGroup) -> MintGroup) -> Self {
        Self(self.0.map(f))
    }
}

/// Where a group stands in its sale lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupPhase {
    NotStarted,
    Open,
    LimitReached,
    Ended,
    SoldOut,
}

impl GroupPhase {
    pub fn of(group: &MintGroup, items_remaining: u64) -> Self {
        let states = &group.states;
        if items_remaining == 0 {
            Self::SoldOut
        } else if states.is_ended {
            Self::Ended
        } else if states.is_limit_reached {
            Self::LimitReached
        } else if !states.is_started {
            Self::NotStarted
        } else {
            Self::Open
        }
    }
}

impl fmt::Display for GroupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::NotStarted => "not started",
            Self::Open => "open",
            Self::LimitReached => "limit reached",
            Self::Ended => "ended",
            Self::SoldOut => "sold out",
        };
        f.write_str(phase)
    }
}
