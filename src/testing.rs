/// Fakes for the bus and HTTP transports shared by unit tests
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::NodeError;
use crate::models::PublishResult;
use crate::sensor::BusTransport;
use crate::telemetry::HttpTransport;

/// Bus that replays prepared data blocks and records every access
pub struct ScriptedBus {
    pub devices: Vec<u8>,
    pub frames: VecDeque<[u8; 6]>,
    pub writes: Vec<(u8, u8, Vec<u8>)>,
    pub reads: Vec<(u8, u8)>,
}

impl ScriptedBus {
    pub fn new(devices: Vec<u8>, frames: Vec<[u8; 6]>) -> Self {
        ScriptedBus {
            devices,
            frames: frames.into(),
            writes: Vec::new(),
            reads: Vec::new(),
        }
    }

    /// Encode channel values the way the sensor lays them out
    pub fn frame(red: u16, green: u16, blue: u16) -> [u8; 6] {
        let [g0, g1] = green.to_le_bytes();
        let [r0, r1] = red.to_le_bytes();
        let [b0, b1] = blue.to_le_bytes();
        [g0, g1, r0, r1, b0, b1]
    }
}

impl BusTransport for ScriptedBus {
    fn discover(&mut self) -> Vec<u8> {
        self.devices.clone()
    }

    fn write_register(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), NodeError> {
        self.writes.push((addr, reg, bytes.to_vec()));
        Ok(())
    }

    fn read_register(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), NodeError> {
        self.reads.push((addr, reg));
        let frame = self
            .frames
            .pop_front()
            .ok_or_else(|| NodeError::Bus("no more data".into()))?;
        buf.copy_from_slice(&frame[..buf.len()]);
        Ok(())
    }
}

/// A request captured by [`RecordingTransport`]
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP transport that answers from a queue of canned outcomes
///
/// Once the queue is empty every request gets `201 Created`.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Rc<RefCell<Vec<SentRequest>>>,
    pub responses: RefCell<VecDeque<Result<PublishResult, NodeError>>>,
}

impl RecordingTransport {
    pub fn with_responses(responses: Vec<Result<PublishResult, NodeError>>) -> Self {
        RecordingTransport {
            sent: Rc::default(),
            responses: RefCell::new(responses.into()),
        }
    }
}

impl HttpTransport for RecordingTransport {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
    ) -> Result<PublishResult, NodeError> {
        self.sent.borrow_mut().push(SentRequest {
            url: url.to_string(),
            body: body.to_string(),
            headers: headers.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(PublishResult {
                    status_code: 201,
                    body: "created".into(),
                })
            })
    }
}
