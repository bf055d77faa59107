//! Host-side doubles for the device capabilities.

use crate::device::{Restart, StatusLed};
use crate::error::OtaError;
use crate::http::{HttpClient, HttpResponse};
use crate::network::WifiLink;
use crate::ota::FirmwareSlot;
use crate::storage::Storage;
use crate::telemetry::Broker;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::rc::Rc;

/// Ordered record of side effects shared between doubles.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

pub struct FakeLink {
    connect_after: Option<u32>,
    driver_fails: bool,
    polls: Cell<u32>,
    pub active: bool,
    pub activated: bool,
    pub connect_calls: Vec<(String, String)>,
}

impl FakeLink {
    /// Reports connected from the `polls + 1`-th status check on.
    pub fn connects_after(polls: u32) -> Self {
        Self {
            connect_after: Some(polls),
            driver_fails: false,
            polls: Cell::new(0),
            active: false,
            activated: false,
            connect_calls: Vec::new(),
        }
    }

    pub fn never_connects() -> Self {
        Self {
            connect_after: None,
            ..Self::connects_after(0)
        }
    }

    /// Every driver call errors and the link never comes up.
    pub fn failing_driver() -> Self {
        Self {
            driver_fails: true,
            ..Self::never_connects()
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls.get()
    }
}

impl WifiLink for FakeLink {
    type Error = String;

    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) -> Result<(), String> {
        self.activated = true;
        if self.driver_fails {
            return Err("wifi driver not started".to_string());
        }
        self.active = true;
        Ok(())
    }

    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), String> {
        self.connect_calls.push((ssid.to_string(), password.to_string()));
        if self.driver_fails {
            return Err("wifi driver not started".to_string());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let polls = self.polls.get() + 1;
        self.polls.set(polls);
        matches!(self.connect_after, Some(n) if polls > n)
    }

    fn ip_address(&self) -> Option<String> {
        Some("192.168.1.50".to_string())
    }
}

enum Reply {
    Response(u16, Vec<u8>),
    TransportError,
}

/// HTTP client answering from a per-URL script. Unscripted URLs fail with a
/// transport error.
#[derive(Default)]
pub struct ScriptedHttp {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<String>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: &str, body: &[u8]) -> Self {
        self.status(url, 200, body)
    }

    pub fn status(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.replies
            .entry(url.to_string())
            .or_default()
            .push_back(Reply::Response(status, body.to_vec()));
        self
    }

    pub fn transport_error(mut self, url: &str) -> Self {
        self.replies
            .entry(url.to_string())
            .or_default()
            .push_back(Reply::TransportError);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.clone()
    }
}

impl HttpClient for ScriptedHttp {
    fn get(&mut self, url: &str, max_body: usize) -> Result<HttpResponse, OtaError> {
        self.requests.push(url.to_string());
        match self.replies.get_mut(url).and_then(|q| q.pop_front()) {
            Some(Reply::Response(_, body)) if body.len() > max_body => {
                Err(OtaError::InvalidSize(body.len()))
            }
            Some(Reply::Response(status, body)) => Ok(HttpResponse { status, body }),
            Some(Reply::TransportError) | None => {
                Err(OtaError::Transport(format!("connection to {} refused", url)))
            }
        }
    }
}

/// In-memory flat filesystem with switchable failures.
#[derive(Default)]
pub struct MemStorage {
    files: BTreeMap<String, Vec<u8>>,
    journal: Journal,
    fail_writes: bool,
    fail_renames: bool,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Seed a file without journaling it.
    pub fn put(&mut self, name: &str, data: &[u8]) {
        self.files.insert(name.to_string(), data.to_vec());
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.files.clone()
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fail_renames(&mut self, fail: bool) {
        self.fail_renames = fail;
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected {} failure", what))
}

impl Storage for MemStorage {
    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(name).cloned())
    }

    fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(injected("write"));
        }
        self.journal.push(format!("write {}", name));
        self.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        if self.fail_renames {
            return Err(injected("rename"));
        }
        let data = self
            .files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, from.to_string()))?;
        self.journal.push(format!("rename {} -> {}", from, to));
        self.files.insert(to.to_string(), data);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

/// Slot pair: the image the bootloader starts and the inactive slot.
#[derive(Default)]
pub struct FakeSlot {
    pub boot_image: Vec<u8>,
    pub staged: Option<Vec<u8>>,
    pub stage_calls: u32,
    journal: Journal,
    fail_stage: bool,
    fail_promote: bool,
}

impl FakeSlot {
    pub fn booting(image: &[u8]) -> Self {
        Self {
            boot_image: image.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_journal(journal: Journal, image: &[u8]) -> Self {
        Self {
            journal,
            ..Self::booting(image)
        }
    }

    pub fn fail_stage(&mut self, fail: bool) {
        self.fail_stage = fail;
    }

    pub fn fail_promote(&mut self, fail: bool) {
        self.fail_promote = fail;
    }
}

impl FirmwareSlot for FakeSlot {
    fn stage(&mut self, image: &[u8]) -> Result<(), OtaError> {
        self.stage_calls += 1;
        self.staged = None;
        if self.fail_stage {
            return Err(OtaError::Slot("injected stage failure".to_string()));
        }
        self.journal.push(format!("stage {} bytes", image.len()));
        self.staged = Some(image.to_vec());
        Ok(())
    }

    fn promote(&mut self) -> Result<(), OtaError> {
        if self.fail_promote {
            return Err(OtaError::Slot("injected promote failure".to_string()));
        }
        let image = self
            .staged
            .take()
            .ok_or_else(|| OtaError::Slot("no image staged".to_string()))?;
        self.journal.push("promote");
        self.boot_image = image;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRestart {
    count: Cell<u32>,
    journal: Journal,
}

impl RecordingRestart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            count: Cell::new(0),
            journal,
        }
    }

    pub fn count(&self) -> u32 {
        self.count.get()
    }
}

impl Restart for RecordingRestart {
    fn restart(&self) {
        self.count.set(self.count.get() + 1);
        self.journal.push("restart");
    }
}

#[derive(Default)]
pub struct FakeLed {
    pub states: Vec<bool>,
}

impl StatusLed for FakeLed {
    fn set(&mut self, on: bool) {
        self.states.push(on);
    }
}

/// Broker session that records traffic; can be told to reject publishes.
#[derive(Default)]
pub struct RecordingBroker {
    pub published: Vec<(String, String)>,
    pub subscribed: Vec<String>,
    pub reject: bool,
}

impl Broker for RecordingBroker {
    type Error = String;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), String> {
        if self.reject {
            return Err("not connected".to_string());
        }
        self.published
            .push((topic.to_string(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), String> {
        if self.reject {
            return Err("not connected".to_string());
        }
        self.subscribed.push(topic.to_string());
        Ok(())
    }
}
