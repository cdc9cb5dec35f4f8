//! Loopback mock responder for end-to-end tests.
//!
//! Answers `dataref|read` requests from a name -> value table, echoing the
//! request id. Scripted misbehaviour covers the cases a real host produces
//! over UDP: silence, late answers, strays, duplicates and garbage.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::codec;
use crate::domain::{
    ClientConfig, DataRefName, DataRefRequest, DataRefType, DataRefValue, RequestId,
    MAX_REQUEST_SIZE,
};

/// How the responder answers each request.
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// One correct response per request
    Respond,
    /// Never answer
    Silent,
    /// Answer correctly after a delay
    Delay(Duration),
    /// Send a response with an unknown id, then the correct one
    StrayFirst,
    /// Send the correct response twice
    Duplicate,
    /// Answer with this type tag instead of the value's own
    WrongType(DataRefType),
    /// Answer with these bytes verbatim
    Raw(String),
    /// Answer in the legacy form, without the request id
    Legacy,
}

/// UDP responder bound to an ephemeral loopback port.
pub struct MockResponder {
    addr: SocketAddr,
    values: Arc<RwLock<HashMap<DataRefName, DataRefValue>>>,
    behavior: Arc<RwLock<MockBehavior>>,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockResponder {
    /// Bind `127.0.0.1:0` and start serving. The table starts with
    /// `sim/cockpit2/controls/parking_brake_ratio = 0.5`.
    pub async fn start() -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);
        let addr = socket.local_addr()?;

        let mut table = HashMap::new();
        if let Ok(name) = DataRefName::new("sim/cockpit2/controls/parking_brake_ratio") {
            table.insert(name, DataRefValue::Float(0.5));
        }

        let values = Arc::new(RwLock::new(table));
        let behavior = Arc::new(RwLock::new(MockBehavior::Respond));
        let requests = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(serve(
            socket,
            Arc::clone(&values),
            Arc::clone(&behavior),
            Arc::clone(&requests),
        ));

        debug!(addr = %addr, "Mock responder listening");

        Ok(Self {
            addr,
            values,
            behavior,
            requests,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Client config pointing at this responder.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            ..ClientConfig::default()
        }
    }

    pub fn set_value(&self, name: &DataRefName, value: DataRefValue) {
        self.values.write().insert(name.clone(), value);
    }

    pub fn remove_value(&self, name: &DataRefName) {
        self.values.write().remove(name);
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write() = behavior;
    }

    /// Datagrams received so far, decodable or not.
    pub fn requests_received(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Drop for MockResponder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: Arc<UdpSocket>,
    values: Arc<RwLock<HashMap<DataRefName, DataRefValue>>>,
    behavior: Arc<RwLock<MockBehavior>>,
    requests: Arc<AtomicUsize>,
) {
    let mut buf = vec![0u8; MAX_REQUEST_SIZE + 1];

    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "Mock responder receive failed");
                continue;
            }
        };
        requests.fetch_add(1, Ordering::Relaxed);

        let request = match codec::decode_request(&buf[..len]) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Mock responder got an undecodable request");
                continue;
            }
        };

        let behavior = behavior.read().clone();
        let value = values.read().get(&request.name).cloned();
        let Some(value) = value.filter(DataRefValue::is_valid) else {
            debug!(dataref = %request.name, "Mock responder has no value, not answering");
            continue;
        };

        let replies = replies_for(&request, &value, &behavior);
        match behavior {
            MockBehavior::Delay(delay) => {
                let socket = Arc::clone(&socket);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    send_all(&socket, peer, replies).await;
                });
            }
            _ => send_all(&socket, peer, replies).await,
        }
    }
}

fn replies_for(
    request: &DataRefRequest,
    value: &DataRefValue,
    behavior: &MockBehavior,
) -> Vec<Vec<u8>> {
    let id = request.request_id.as_ref();
    let Some(own_type) = value.data_type() else {
        return Vec::new();
    };
    let encode = |id: Option<&RequestId>, data_type: DataRefType| {
        codec::encode_response(id, data_type, value)
            .map_err(|e| warn!(error = %e, "Mock responder failed to encode value"))
            .ok()
    };

    let replies = match behavior {
        MockBehavior::Silent => Vec::new(),
        MockBehavior::Respond | MockBehavior::Delay(_) => vec![encode(id, own_type)],
        MockBehavior::StrayFirst => vec![
            encode(Some(&RequestId::generate()), own_type),
            encode(id, own_type),
        ],
        MockBehavior::Duplicate => vec![encode(id, own_type), encode(id, own_type)],
        MockBehavior::WrongType(data_type) => vec![encode(id, *data_type)],
        MockBehavior::Raw(text) => vec![Some(text.clone().into_bytes())],
        MockBehavior::Legacy => vec![encode(None, own_type)],
    };

    replies.into_iter().flatten().collect()
}

async fn send_all(socket: &UdpSocket, peer: SocketAddr, replies: Vec<Vec<u8>>) {
    for reply in replies {
        if let Err(e) = socket.send_to(&reply, peer).await {
            warn!(error = %e, peer = %peer, "Mock responder send failed");
        }
    }
}
