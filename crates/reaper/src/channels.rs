use reaper_config::constants;
use reaper_engine::EventEnvelope;
use tokio::sync::mpsc;

pub struct Channels {
    pub event_tx: mpsc::Sender<EventEnvelope>,
    pub event_rx: mpsc::Receiver<EventEnvelope>,
}

pub fn create_channels() -> Channels {
    let (event_tx, event_rx) = mpsc::channel(constants::EVENT_CHANNEL_CAPACITY);

    Channels { event_tx, event_rx }
}
