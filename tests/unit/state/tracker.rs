use super::*;

#[test]
fn stable_tokens_are_idempotent_until_dirty() {
    let d = StateTrackableDelegate::new(State::Stable);
    let a = d.state_tracker();
    let b = d.state_tracker();
    assert_eq!(a, b);
    assert!(a.is_current());

    d.mark_dirty();
    assert!(!a.is_current());
    let c = d.state_tracker();
    assert_ne!(a, c);
    assert!(c.is_current());
    assert!(!a.is_current());
}

#[test]
fn immutable_and_untrackable_trackers_are_fixed() {
    let imm = StateTrackableDelegate::immutable();
    imm.mark_dirty();
    assert_eq!(imm.state_tracker(), StateTracker::AlwaysCurrent);
    assert!(imm.state_tracker().is_current());

    let unt = StateTrackableDelegate::untrackable();
    assert!(!unt.state_tracker().is_current());
}

#[test]
fn dynamic_agents_toggle_stable_state() {
    let d = StateTrackableDelegate::new(State::Stable);
    let before = d.state_tracker();
    d.add_dynamic_agent().unwrap();
    d.add_dynamic_agent().unwrap();
    assert_eq!(d.state(), State::Dynamic);
    assert!(!before.is_current());
    assert!(!d.state_tracker().is_current());

    d.remove_dynamic_agent().unwrap();
    assert_eq!(d.state(), State::Dynamic);
    d.remove_dynamic_agent().unwrap();
    assert_eq!(d.state(), State::Stable);
    assert!(d.state_tracker().is_current());
    assert!(!before.is_current());
}

#[test]
fn unpaired_remove_is_illegal_state() {
    let d = StateTrackableDelegate::new(State::Stable);
    assert!(matches!(
        d.remove_dynamic_agent(),
        Err(GfxError::IllegalState(_))
    ));
}

#[test]
fn forbidden_transitions_fail() {
    let d = StateTrackableDelegate::new(State::Stable);
    d.add_dynamic_agent().unwrap();
    assert!(d.set_immutable().is_err());

    let d = StateTrackableDelegate::new(State::Stable);
    d.set_immutable().unwrap();
    assert!(d.set_untrackable().is_err());
    assert!(matches!(
        d.add_dynamic_agent(),
        Err(GfxError::IllegalState(_))
    ));
    assert_eq!(d.state(), State::Immutable);
    assert_eq!(d.dynamic_agents(), 0);
    assert!(d.state_tracker().is_current());

    let d = StateTrackableDelegate::new(State::Stable);
    let t = d.state_tracker();
    d.set_untrackable().unwrap();
    assert!(!t.is_current());
    d.add_dynamic_agent().unwrap();
    assert_eq!(d.dynamic_agents(), 0);
}

#[test]
fn countdown_reports_current_a_fixed_number_of_times() {
    let t = StateTracker::countdown(2);
    assert!(t.is_current());
    assert!(t.is_current());
    assert!(!t.is_current());
    assert!(!t.is_current());
    assert_eq!(t.clone(), t);
}
