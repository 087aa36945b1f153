//! Unit tests for the event module

#[cfg(test)]
mod tests {
    use crate::event::{Event, EventBus};
    use crate::playback::{PlaybackAction, PlaybackState, Progress};
    use std::time::Duration;

    #[test]
    fn test_event_bus_send_receive() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.send(Event::PlaybackState(PlaybackState::Ready));

        match subscriber.try_recv() {
            Ok(Event::PlaybackState(state)) => assert_eq!(state, PlaybackState::Ready),
            other => panic!("Expected PlaybackState event, got {other:?}"),
        }
    }

    #[test]
    fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.send(Event::Playback(PlaybackAction::Play));

        // Both subscribers should receive the event
        assert!(sub1.try_recv().is_ok());
        assert!(sub2.try_recv().is_ok());
    }

    #[test]
    fn test_event_bus_send_without_subscribers() {
        let bus = EventBus::new();

        // Must not panic or error when nobody listens
        bus.send(Event::Generating(true));

        // Later subscribers do not see earlier events
        let mut subscriber = bus.subscribe();
        assert!(subscriber.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_event_bus_async_recv() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        let sender = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            sender.send(Event::Progress(Progress::new(1.0, 4.0)));
        });

        let event = tokio::time::timeout(Duration::from_secs(1), subscriber.recv())
            .await
            .expect("Timed out waiting for event");

        match event {
            Some(Event::Progress(progress)) => assert_eq!(progress.percent, 25.0),
            other => panic!("Expected Progress event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscriber_recv_none_after_bus_dropped() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();
        drop(bus);

        assert!(subscriber.recv().await.is_none());
    }
}
