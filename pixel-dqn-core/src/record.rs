//! Types for recording values obtained during training.
//!
//! [`Record`] is a map from keys to [`RecordValue`]s. The [`Trainer`](crate::Trainer)
//! writes one record per episode into a [`Recorder`] given to
//! [`Trainer::train`](crate::Trainer::train).
//!
//! ```rust
//! use pixel_dqn_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(3.0));
//! record.insert("return", RecordValue::Scalar(-12.5));
//! assert_eq!(record.get_scalar("return").unwrap(), -12.5);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
