//! Control surface: one request type per queue operation, plus the log channel.

use serde::{Deserialize, Serialize};

use super::Request;
use crate::domain::{GroupRecord, LogEvent, SendRequest};
use crate::queue::QueueStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseQueue;

impl Request for PauseQueue {
    const TYPE: &'static str = "PAUSE_QUEUE";
    type Response = bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeQueue;

impl Request for ResumeQueue {
    const TYPE: &'static str = "RESUME_QUEUE";
    type Response = bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopQueue;

impl Request for StopQueue {
    const TYPE: &'static str = "STOP_QUEUE";
    type Response = bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessage(pub SendRequest);

impl Request for SendMessage {
    const TYPE: &'static str = "SEND_MESSAGE";
    type Response = bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatusRequest;

impl Request for QueueStatusRequest {
    const TYPE: &'static str = "QUEUE_STATUS";
    type Response = QueueStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetGroups;

impl Request for GetGroups {
    const TYPE: &'static str = "GET_GROUPS";
    type Response = Vec<GroupRecord>;
}

/// One-way, privileged -> UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLog(pub LogEvent);

impl Request for AddLog {
    const TYPE: &'static str = "ADD_LOG";
    type Response = ();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageContent;

    #[test]
    fn unit_requests_travel_as_null() {
        assert_eq!(serde_json::to_value(PauseQueue).unwrap(), serde_json::Value::Null);
        let back: StopQueue = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(back, StopQueue);
    }

    #[test]
    fn send_message_payload_is_flat() {
        let req = SendMessage(SendRequest::new("5511988887777", MessageContent::text("hi")));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contact"], "5511988887777");
        assert_eq!(v["text"], "hi");
    }
}
