//! Domain model (ids, message content, send tasks, log events, groups, errors).

pub mod errors;
pub mod events;
pub mod group;
pub mod ids;
pub mod message;
pub mod task;

pub use self::errors::{DispatchError, ErrorKind};
pub use self::events::{LogEvent, LogLevel};
pub use self::group::{ChatId, GroupRecord, RawChat};
pub use self::ids::{CorrelationId, TaskId};
pub use self::message::{Attachment, Button, ContentHash, MessageContent, StoredMessage};
pub use self::task::{SendRequest, SendTask};
