//! # swarmsim-attack: Fault injection for simulated node processes
//!
//! Attacks are the testbed's unit of targeted fault injection. Each round,
//! a process wrapper asks its [`AttackModel`] for the attacks that apply to
//! it and applies each one. An [`Attack`] inspects the target and, when the
//! target's identity and session match its binding, marks the target
//! compromised and/or contaminated for that round.
//!
//! # Session binding
//!
//! Every attack is bound to a [`SessionToken`]. Tokens are generated fresh
//! per scenario run, so an attack computed for one run never leaks into a
//! later run that reuses the same device identifiers.
//!
//! # Polymorphism
//!
//! All attack variants share the single `apply(target) -> bool` contract,
//! and all models share `attacks_for(device, session)`. The orchestrator's
//! per-round logic never inspects the concrete variant.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use swarmsim_types::{DeviceId, SessionToken};
use tracing::trace;

// ============================================================================
// Attack Capability
// ============================================================================

/// What an applied attack does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackEffect {
    /// Mark the target compromised.
    Compromise,
    /// Mark the target's most recent state contaminated.
    Contaminate,
    /// Mark the target both compromised and contaminated.
    Both,
}

/// The view of a process that an attack is allowed to touch.
///
/// Process wrappers implement this; attacks see nothing else of the
/// process. Marking is idempotent within a round.
pub trait AttackTarget {
    /// The target's identity.
    fn device_id(&self) -> &DeviceId;

    /// The session the target is currently running in.
    fn session(&self) -> SessionToken;

    /// Marks the target compromised for the current round.
    fn mark_compromised(&self);

    /// Marks the target's most recent state contaminated.
    fn mark_contaminated(&self);
}

/// One unit of fault injection.
///
/// `apply` inspects the target and returns true iff the attack matched and
/// took effect. Attacks are immutable and idempotent: applying the same
/// attack to the same target twice marks it twice with the same result.
pub trait Attack: Send + Sync + fmt::Debug {
    /// Applies this attack to a process, returning whether it matched.
    fn apply(&self, target: &dyn AttackTarget) -> bool;
}

fn inflict(effect: AttackEffect, target: &dyn AttackTarget) {
    match effect {
        AttackEffect::Compromise => target.mark_compromised(),
        AttackEffect::Contaminate => target.mark_contaminated(),
        AttackEffect::Both => {
            target.mark_compromised();
            target.mark_contaminated();
        }
    }
}

// ============================================================================
// Attack Variants
// ============================================================================

/// An attack bound to one specific device in one specific session.
///
/// Applies iff both the device identifier and the session token match.
#[derive(Debug, Clone)]
pub struct SpecificAttack {
    target: DeviceId,
    session: SessionToken,
    effect: AttackEffect,
}

impl SpecificAttack {
    /// Creates an attack on `target` scoped to `session`.
    pub fn new(target: DeviceId, session: SessionToken, effect: AttackEffect) -> Self {
        Self {
            target,
            session,
            effect,
        }
    }
}

impl Attack for SpecificAttack {
    fn apply(&self, target: &dyn AttackTarget) -> bool {
        if target.device_id() != &self.target || target.session() != self.session {
            return false;
        }

        trace!(
            device = %self.target,
            session = %self.session,
            effect = ?self.effect,
            "specific attack applied"
        );
        inflict(self.effect, target);
        true
    }
}

/// An attack that hits every device in one session.
#[derive(Debug, Clone)]
pub struct BroadcastAttack {
    session: SessionToken,
    effect: AttackEffect,
}

impl BroadcastAttack {
    /// Creates a session-wide attack.
    pub fn new(session: SessionToken, effect: AttackEffect) -> Self {
        Self { session, effect }
    }
}

impl Attack for BroadcastAttack {
    fn apply(&self, target: &dyn AttackTarget) -> bool {
        if target.session() != self.session {
            return false;
        }

        trace!(
            device = %target.device_id(),
            session = %self.session,
            effect = ?self.effect,
            "broadcast attack applied"
        );
        inflict(self.effect, target);
        true
    }
}

// ============================================================================
// Attack Models
// ============================================================================

/// Produces the attacks that apply to a process in its current session.
///
/// `attacks_for` must be a pure function of the model's configuration, the
/// device identity, and the session token: calling it twice with the same
/// arguments returns an equivalent set (not necessarily the same
/// instances).
pub trait AttackModel: Send + Sync + fmt::Debug {
    /// Returns the attacks that apply to `device` in `session`.
    ///
    /// The empty vector means the process is not targeted.
    fn attacks_for(&self, device: &DeviceId, session: SessionToken) -> Vec<Arc<dyn Attack>>;
}

/// A model that never attacks anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttackModel;

impl AttackModel for NoAttackModel {
    fn attacks_for(&self, _device: &DeviceId, _session: SessionToken) -> Vec<Arc<dyn Attack>> {
        Vec::new()
    }
}

/// A model configured with per-device effects and an optional session-wide
/// broadcast effect.
#[derive(Debug, Clone, Default)]
pub struct TargetedAttackModel {
    targets: HashMap<DeviceId, AttackEffect>,
    broadcast: Option<AttackEffect>,
}

impl TargetedAttackModel {
    /// Creates a model with no targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target with an explicit effect.
    pub fn with_target(mut self, device: DeviceId, effect: AttackEffect) -> Self {
        self.targets.insert(device, effect);
        self
    }

    /// Adds a compromise target.
    pub fn compromise(self, device: DeviceId) -> Self {
        self.with_target(device, AttackEffect::Compromise)
    }

    /// Adds a contamination target.
    pub fn contaminate(self, device: DeviceId) -> Self {
        self.with_target(device, AttackEffect::Contaminate)
    }

    /// Adds a session-wide broadcast effect hitting every device.
    pub fn with_broadcast(mut self, effect: AttackEffect) -> Self {
        self.broadcast = Some(effect);
        self
    }

    /// Returns the number of specifically targeted devices.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl AttackModel for TargetedAttackModel {
    fn attacks_for(&self, device: &DeviceId, session: SessionToken) -> Vec<Arc<dyn Attack>> {
        let mut attacks: Vec<Arc<dyn Attack>> = Vec::new();

        if let Some(&effect) = self.targets.get(device) {
            attacks.push(Arc::new(SpecificAttack::new(
                device.clone(),
                session,
                effect,
            )));
        }
        if let Some(effect) = self.broadcast {
            attacks.push(Arc::new(BroadcastAttack::new(session, effect)));
        }

        attacks
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    /// Minimal target double tracking which marks were applied.
    #[derive(Debug)]
    struct RecordingTarget {
        device: DeviceId,
        session: SessionToken,
        compromised: AtomicBool,
        contaminated: AtomicBool,
    }

    impl RecordingTarget {
        fn new(device: DeviceId, session: SessionToken) -> Self {
            Self {
                device,
                session,
                compromised: AtomicBool::new(false),
                contaminated: AtomicBool::new(false),
            }
        }

        fn compromised(&self) -> bool {
            self.compromised.load(Ordering::SeqCst)
        }

        fn contaminated(&self) -> bool {
            self.contaminated.load(Ordering::SeqCst)
        }
    }

    impl AttackTarget for RecordingTarget {
        fn device_id(&self) -> &DeviceId {
            &self.device
        }

        fn session(&self) -> SessionToken {
            self.session
        }

        fn mark_compromised(&self) {
            self.compromised.store(true, Ordering::SeqCst);
        }

        fn mark_contaminated(&self) {
            self.contaminated.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn specific_attack_hits_matching_identity_and_session() {
        let session = SessionToken::from_raw(1);
        let attack = SpecificAttack::new(DeviceId::int(3), session, AttackEffect::Compromise);
        let target = RecordingTarget::new(DeviceId::int(3), session);

        assert!(attack.apply(&target));
        assert!(target.compromised());
        assert!(!target.contaminated());
    }

    #[test]
    fn specific_attack_ignores_other_identity() {
        let session = SessionToken::from_raw(1);
        let attack = SpecificAttack::new(DeviceId::int(3), session, AttackEffect::Compromise);
        let target = RecordingTarget::new(DeviceId::int(4), session);

        assert!(!attack.apply(&target));
        assert!(!target.compromised());
    }

    #[test]
    fn specific_attack_ignores_other_session() {
        let attack = SpecificAttack::new(
            DeviceId::int(3),
            SessionToken::from_raw(1),
            AttackEffect::Compromise,
        );
        let target = RecordingTarget::new(DeviceId::int(3), SessionToken::from_raw(2));

        assert!(!attack.apply(&target));
        assert!(!target.compromised());
    }

    #[test]
    fn specific_attack_returns_true_each_application() {
        let session = SessionToken::from_raw(5);
        let attack = SpecificAttack::new(DeviceId::named("a"), session, AttackEffect::Both);
        let target = RecordingTarget::new(DeviceId::named("a"), session);

        assert!(attack.apply(&target));
        assert!(attack.apply(&target));
        assert!(target.compromised());
        assert!(target.contaminated());
    }

    #[test]
    fn broadcast_attack_hits_any_device_in_session() {
        let session = SessionToken::from_raw(9);
        let attack = BroadcastAttack::new(session, AttackEffect::Contaminate);

        let a = RecordingTarget::new(DeviceId::int(1), session);
        let b = RecordingTarget::new(DeviceId::named("x"), session);
        let other = RecordingTarget::new(DeviceId::int(1), SessionToken::from_raw(10));

        assert!(attack.apply(&a));
        assert!(attack.apply(&b));
        assert!(!attack.apply(&other));
        assert!(a.contaminated());
        assert!(b.contaminated());
        assert!(!other.contaminated());
    }

    #[test]
    fn untargeted_device_gets_empty_set() {
        let model = TargetedAttackModel::new().compromise(DeviceId::int(1));
        let session = SessionToken::from_raw(1);

        assert!(model.attacks_for(&DeviceId::int(2), session).is_empty());
        assert!(model
            .attacks_for(&DeviceId::named("bystander"), session)
            .is_empty());
    }

    #[test]
    fn no_attack_model_is_always_empty() {
        let model = NoAttackModel;
        assert!(model
            .attacks_for(&DeviceId::int(1), SessionToken::from_raw(1))
            .is_empty());
    }

    #[test]
    fn targeted_model_is_pure_per_device_and_session() {
        let model = TargetedAttackModel::new().compromise(DeviceId::int(7));
        let session = SessionToken::from_raw(3);

        let first = model.attacks_for(&DeviceId::int(7), session);
        let second = model.attacks_for(&DeviceId::int(7), session);

        // Equivalent sets, not necessarily the same instances.
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);

        let target = RecordingTarget::new(DeviceId::int(7), session);
        assert!(first[0].apply(&target));
        assert!(second[0].apply(&target));
    }

    #[test]
    fn broadcast_configuration_applies_alongside_specific() {
        let model = TargetedAttackModel::new()
            .compromise(DeviceId::int(1))
            .with_broadcast(AttackEffect::Contaminate);
        let session = SessionToken::from_raw(4);

        let targeted = model.attacks_for(&DeviceId::int(1), session);
        let bystander = model.attacks_for(&DeviceId::int(2), session);

        assert_eq!(targeted.len(), 2);
        assert_eq!(bystander.len(), 1);

        let target = RecordingTarget::new(DeviceId::int(2), session);
        assert!(bystander[0].apply(&target));
        assert!(target.contaminated());
        assert!(!target.compromised());
    }
}
