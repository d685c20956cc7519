//! Queue between the fishing actor and the recorder worker.
//!
//! The actor sends HUD crops of confirmed catches; the worker OCRs them and
//! appends records. Session boundaries travel on the same channel so records
//! and summaries stay in order.

use chrono::{DateTime, Local};
use image::RgbaImage;
use std::sync::mpsc::{channel, Receiver, Sender};

/// A confirmed catch waiting for OCR.
#[derive(Debug, Clone)]
pub struct CatchEvent {
    pub session_id: String,
    pub caught_at: DateTime<Local>,
    /// Fish info HUD crop
    pub hud: RgbaImage,
    /// Save a full screenshot if OCR reads a top-tier catch
    pub screenshot: bool,
}

impl CatchEvent {
    pub fn new(session_id: &str, hud: RgbaImage, screenshot: bool) -> Self {
        Self {
            session_id: session_id.to_string(),
            caught_at: Local::now(),
            hud,
            screenshot,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RecorderMessage {
    Catch(CatchEvent),
    SessionStarted(String),
    SessionEnded(String),
    /// Truncate the record file
    Clear,
}

/// Creates the recorder queue.
///
/// The channel is unbounded; catches queue up if OCR is slower than fishing.
pub fn create_record_queue() -> (Sender<RecorderMessage>, Receiver<RecorderMessage>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catch(session: &str) -> RecorderMessage {
        RecorderMessage::Catch(CatchEvent::new(session, RgbaImage::new(4, 4), false))
    }

    #[test]
    fn test_messages_arrive_in_order() {
        let (sender, receiver) = create_record_queue();

        sender.send(RecorderMessage::SessionStarted("s1".to_string())).unwrap();
        sender.send(catch("s1")).unwrap();
        sender.send(RecorderMessage::SessionEnded("s1".to_string())).unwrap();

        assert!(matches!(receiver.recv().unwrap(), RecorderMessage::SessionStarted(id) if id == "s1"));
        match receiver.recv().unwrap() {
            RecorderMessage::Catch(event) => {
                assert_eq!(event.session_id, "s1");
                assert!(!event.screenshot);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(matches!(receiver.recv().unwrap(), RecorderMessage::SessionEnded(_)));
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_record_queue();

        sender.send(RecorderMessage::Clear).unwrap();
        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
