/// Event-sequence loading for point-process training
pub mod event_dataset;

pub use event_dataset::{sample_batch, Event, EventDataset, EventSeq, NUM_FOLDS};
