//! In-memory stand-in for the platform BLE stack.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use uuid::Uuid;

use bluewand::device::constants::{
    IO_LED_CHARACTERISTIC, IO_SERVICE, IO_USER_BUTTON_CHARACTERISTIC, SENSOR_QUATERNIONS_CHARACTERISTIC,
    SENSOR_SERVICE, SERVICE_CHANGED_CHARACTERISTIC,
};
use bluewand::device::session::{ActiveSession, DeviceSession};
use bluewand::device::transport::{Adapter, Connection, NameFilter, NotificationSink, Peripheral};
use bluewand::device::types::{Characteristic, Descriptor, Profile, Properties, Service};
use bluewand::error::TransportError;

pub const WAND_ADDRESS: &str = "AA:BB:CC:DD:EE:FF";
pub const GENERIC_ATTRIBUTE_SERVICE: Uuid = Uuid::from_u128(0x00001801_0000_1000_8000_00805f9b34fb);
pub const CCCD: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

fn notifying(uuid: Uuid, service_uuid: Uuid) -> Characteristic {
    Characteristic {
        uuid,
        service_uuid,
        properties: Properties { read: true, notify: true, ..Properties::default() },
        descriptors: vec![Descriptor { uuid: CCCD, characteristic_uuid: uuid, service_uuid }],
    }
}

pub fn wand_profile() -> Profile {
    Profile {
        services: vec![
            Service {
                uuid: GENERIC_ATTRIBUTE_SERVICE,
                characteristics: vec![notifying(SERVICE_CHANGED_CHARACTERISTIC, GENERIC_ATTRIBUTE_SERVICE)],
            },
            Service {
                uuid: IO_SERVICE,
                characteristics: vec![
                    notifying(IO_USER_BUTTON_CHARACTERISTIC, IO_SERVICE),
                    Characteristic {
                        uuid: IO_LED_CHARACTERISTIC,
                        service_uuid: IO_SERVICE,
                        properties: Properties { write: true, ..Properties::default() },
                        descriptors: vec![],
                    },
                ],
            },
            Service {
                uuid: SENSOR_SERVICE,
                characteristics: vec![notifying(SENSOR_QUATERNIONS_CHARACTERISTIC, SENSOR_SERVICE)],
            },
        ],
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub sinks: HashMap<Uuid, NotificationSink>,
    pub subscribe_calls: HashMap<Uuid, usize>,
    pub unsubscribed: Vec<Uuid>,
    pub descriptor_reads: Vec<Uuid>,
    pub disconnects: usize,
    pub fail_discovery: bool,
    pub fail_subscribe: bool,
    pub fail_unsubscribe: bool,
    /// The transport stops answering: unsubscribe and descriptor reads never complete.
    pub unresponsive: bool,
}

#[derive(Debug)]
pub struct FakeConnection {
    address: String,
    profile: Profile,
    pub state: Mutex<FakeState>,
}

impl FakeConnection {
    pub fn new(address: &str) -> Arc<FakeConnection> {
        Arc::new(FakeConnection {
            address: address.to_string(),
            profile: wand_profile(),
            state: Mutex::new(FakeState::default()),
        })
    }

    pub fn with_state(address: &str, configure: impl FnOnce(&mut FakeState)) -> Arc<FakeConnection> {
        let connection = FakeConnection::new(address);
        configure(&mut connection.state.lock().unwrap());
        connection
    }

    /// Acts like the stack's notification callback. The sink stays registered after an
    /// unsubscribe, to model notifications that arrive late.
    pub async fn notify(&self, uuid: Uuid, payload: &[u8]) -> bool {
        let sink = self.state.lock().unwrap().sinks.get(&uuid).cloned();
        match sink {
            Some(sink) => sink.deliver(payload.to_vec()).await,
            None => false,
        }
    }

    /// Acts like the stack when the link drops: the notification source of `uuid` ends.
    pub fn end_notifications(&self, uuid: Uuid) {
        if let Some(sink) = self.state.lock().unwrap().sinks.get(&uuid) {
            sink.close();
        }
    }

    pub fn subscribe_calls(&self, uuid: &Uuid) -> usize {
        self.state.lock().unwrap().subscribe_calls.get(uuid).copied().unwrap_or(0)
    }

    pub fn unsubscribed(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().unsubscribed.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn discover_profile(&self) -> Result<Profile, TransportError> {
        if self.state.lock().unwrap().fail_discovery {
            return Err(TransportError::NotConnected);
        }
        Ok(self.profile.clone())
    }

    async fn subscribe(&self, characteristic: &Characteristic, sink: NotificationSink) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe {
            return Err(TransportError::UnknownCharacteristic { uuid: characteristic.uuid });
        }
        *state.subscribe_calls.entry(characteristic.uuid).or_insert(0) += 1;
        state.sinks.insert(characteristic.uuid, sink);
        Ok(())
    }

    async fn unsubscribe(&self, characteristic: &Characteristic) -> Result<(), TransportError> {
        let (fail, unresponsive) = {
            let mut state = self.state.lock().unwrap();
            state.unsubscribed.push(characteristic.uuid);
            (state.fail_unsubscribe, state.unresponsive)
        };
        if unresponsive {
            std::future::pending::<()>().await;
        }
        if fail {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    async fn read_descriptor(&self, descriptor: &Descriptor) -> Result<Vec<u8>, TransportError> {
        let unresponsive = {
            let mut state = self.state.lock().unwrap();
            state.descriptor_reads.push(descriptor.characteristic_uuid);
            state.unresponsive
        };
        if unresponsive {
            std::future::pending::<()>().await;
        }
        Ok(vec![0x01, 0x00])
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.state.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakePeripheral {
    name: String,
    connection: Arc<FakeConnection>,
}

#[async_trait]
impl Peripheral for FakePeripheral {
    fn local_name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    async fn connect(&self) -> Result<Arc<dyn Connection>, TransportError> {
        let connection: Arc<dyn Connection> = self.connection.clone();
        Ok(connection)
    }
}

/// Advertises a fixed set of peripherals. Scanning never waits: no match is a timeout.
pub struct FakeAdapter {
    pub advertised: Vec<(String, Arc<FakeConnection>)>,
}

impl FakeAdapter {
    pub fn new(advertised: Vec<(&str, Arc<FakeConnection>)>) -> Self {
        FakeAdapter {
            advertised: advertised.into_iter().map(|(name, c)| (name.to_string(), c)).collect(),
        }
    }
}

#[async_trait]
impl Adapter for FakeAdapter {
    async fn scan(&self, filter: &NameFilter, _timeout: Duration) -> Result<Option<Box<dyn Peripheral>>, TransportError> {
        for (name, connection) in &self.advertised {
            if filter(name) {
                return Ok(Some(Box::new(FakePeripheral { name: name.clone(), connection: connection.clone() })));
            }
        }
        Ok(None)
    }
}

pub fn session_for(connection: &Arc<FakeConnection>) -> DeviceSession {
    session_with_timeout(connection, Duration::from_secs(1))
}

pub fn session_with_timeout(connection: &Arc<FakeConnection>, timeout: Duration) -> DeviceSession {
    DeviceSession::new(connection.clone(), wand_profile(), timeout)
}

pub async fn active_session_for(connection: &Arc<FakeConnection>) -> Arc<ActiveSession> {
    let active = Arc::new(ActiveSession::new());
    active.install(session_for(connection)).await;
    active
}
