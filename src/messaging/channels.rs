// Lock-free channel from the audio callback to the UI side

use crate::messaging::event::LooperEvent;
use ringbuf::{HeapRb, traits::Split};

pub type EventProducer = ringbuf::HeapProd<LooperEvent>;
pub type EventConsumer = ringbuf::HeapCons<LooperEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<LooperEvent>::new(capacity.max(1));
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::event::BeatEvent;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_events_arrive_in_order() {
        let (mut tx, mut rx) = create_event_channel(8);
        for beat in 0..3 {
            tx.try_push(LooperEvent::Beat(BeatEvent {
                beat,
                beat_in_bar: beat,
                frame_time: beat as u64 * 100,
            }))
            .unwrap();
        }
        tx.try_push(LooperEvent::LoopEnded).unwrap();

        let received: Vec<_> = rx.pop_iter().collect();
        assert_eq!(received.len(), 4);
        assert_eq!(received[1], LooperEvent::Beat(BeatEvent { beat: 1, beat_in_bar: 1, frame_time: 100 }));
        assert_eq!(received[3], LooperEvent::LoopEnded);
    }

    #[test]
    fn test_full_channel_rejects() {
        let (mut tx, _rx) = create_event_channel(1);
        assert!(tx.try_push(LooperEvent::LoopEnded).is_ok());
        assert!(tx.try_push(LooperEvent::LoopEnded).is_err());
    }
}
