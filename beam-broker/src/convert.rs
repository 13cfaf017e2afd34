use pulsar_beam_pool::{PulsarInitialPosition, PulsarSubType};
use pulsar_beam_types::{InitialPosition, SubscriptionType};

/// Plain functions rather than `From` impls: both enums are foreign to this
/// crate, so a trait impl would violate the orphan rule either way.
pub fn sub_type(value: SubscriptionType) -> PulsarSubType {
    match value {
        SubscriptionType::Exclusive => PulsarSubType::Exclusive,
        SubscriptionType::Shared => PulsarSubType::Shared,
        SubscriptionType::Keyshared => PulsarSubType::KeyShared,
        SubscriptionType::Failover => PulsarSubType::Failover,
    }
}

pub fn initial_position(value: InitialPosition) -> PulsarInitialPosition {
    match value {
        InitialPosition::Latest => PulsarInitialPosition::Latest,
        InitialPosition::Earliest => PulsarInitialPosition::Earliest,
    }
}
