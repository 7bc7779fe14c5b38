use crate::{FlashError, FlashQueue, FlashStatus, TransitionBus, ROUTE_CHANGE_SUCCESS};

#[test]
fn delivers_one_message_per_transition() {
    let bus = TransitionBus::new();
    let flash = FlashQueue::new();
    flash.subscribe(&bus).expect("subscribe");

    flash.enqueue("A");
    flash.enqueue("B");
    assert_eq!(flash.current_message(), "");

    bus.emit_transition();
    assert_eq!(flash.current_message(), "A");
    assert_eq!(flash.pending_len(), 1);

    bus.emit_transition();
    assert_eq!(flash.current_message(), "B");

    bus.emit_transition();
    assert_eq!(flash.current_message(), "");
    assert_eq!(flash.status(), FlashStatus::Idle);
}

#[test]
fn message_queued_after_a_transition_waits_for_the_next_one() {
    let bus = TransitionBus::new();
    let flash = FlashQueue::new();
    flash.subscribe(&bus).expect("subscribe");

    flash.enqueue("saved");
    bus.emit_transition();
    flash.enqueue("deleted");
    assert_eq!(flash.current_message(), "saved");
    assert_eq!(flash.status(), FlashStatus::Showing);

    bus.emit_transition();
    assert_eq!(flash.current_message(), "deleted");
}

#[test]
fn reading_has_no_side_effect() {
    let flash = FlashQueue::new();
    flash.enqueue("hello");
    flash.on_transition();

    for _ in 0..3 {
        assert_eq!(flash.current_message(), "hello");
    }
    assert_eq!(flash.pending_len(), 0);
}

#[test]
fn subscribing_twice_is_refused() {
    let bus = TransitionBus::new();
    let flash = FlashQueue::new();

    flash.subscribe(&bus).expect("first subscribe");
    assert_eq!(flash.subscribe(&bus), Err(FlashError::AlreadySubscribed));

    flash.enqueue("once");
    assert_eq!(bus.emit_transition(), 1);
    assert_eq!(flash.current_message(), "once");
}

#[test]
fn independent_queues_do_not_share_state() {
    let bus = TransitionBus::new();
    let left = FlashQueue::new();
    let right = FlashQueue::new();
    left.subscribe(&bus).expect("left");
    right.subscribe(&bus).expect("right");

    left.enqueue("left only");
    bus.emit_transition();

    assert_eq!(left.current_message(), "left only");
    assert_eq!(right.current_message(), "");
}

#[test]
fn message_queued_by_an_earlier_listener_waits_for_the_next_transition() {
    let bus = TransitionBus::new();
    let flash = FlashQueue::new();

    let producer = flash.clone();
    bus.subscribe(ROUTE_CHANGE_SUCCESS, move || producer.enqueue("welcome"));
    flash.subscribe(&bus).expect("subscribe");

    bus.emit_transition();
    assert_eq!(flash.current_message(), "");
    assert_eq!(flash.pending_len(), 1);

    bus.emit_transition();
    assert_eq!(flash.current_message(), "welcome");
}

#[test]
fn queue_can_resubscribe_after_unsubscribing() {
    let bus = TransitionBus::new();
    let other_bus = TransitionBus::new();
    let flash = FlashQueue::new();

    flash.subscribe(&bus).expect("subscribe");
    assert!(!flash.unsubscribe(&other_bus));
    assert!(flash.unsubscribe(&bus));
    assert!(!flash.unsubscribe(&bus));
    assert_eq!(bus.listener_count(ROUTE_CHANGE_SUCCESS), 0);

    flash.enqueue("carried over");
    bus.emit_transition();
    assert_eq!(flash.current_message(), "");

    flash.subscribe(&other_bus).expect("resubscribe");
    other_bus.emit_transition();
    assert_eq!(flash.current_message(), "carried over");
}

#[test]
fn listener_removed_on_the_bus_can_be_released_by_the_queue() {
    let bus = TransitionBus::new();
    let flash = FlashQueue::new();

    let id = flash.subscribe(&bus).expect("subscribe");
    assert!(bus.unsubscribe(id));
    assert_eq!(flash.subscribe(&bus), Err(FlashError::AlreadySubscribed));

    assert!(flash.unsubscribe(&bus));
    flash.subscribe(&bus).expect("resubscribe");
    flash.enqueue("back");
    bus.emit_transition();
    assert_eq!(flash.current_message(), "back");
}
