use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use btleplug::api::{Central, CharPropFlags, Manager as _, Peripheral as _, ScanFilter};
use btleplug::api::Characteristic as BtleCharacteristic;
use btleplug::platform::{Adapter as BtleAdapter, Manager, Peripheral as BtlePeripheral};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::device::constants::SCAN_POLL_DELAY;
use crate::device::transport::{Adapter, Connection, NameFilter, NotificationSink, Peripheral};
use crate::device::types::{Characteristic, Descriptor, Profile, Properties, Service};
use crate::error::TransportError;

/**
 * Scans on every bluetooth adapter of the host.
 */
pub struct BtleplugAdapter {
    adapters: Vec<BtleAdapter>,
}

impl BtleplugAdapter {
    pub async fn new() -> Result<BtleplugAdapter, TransportError> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;

        if adapters.is_empty() {
            return Err(TransportError::NoAdapter);
        }

        Ok(BtleplugAdapter { adapters })
    }
}

async fn start_scanning(adapters: &[BtleAdapter]) -> Result<(), TransportError> {
    for adapter in adapters {
        info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
        adapter.start_scan(ScanFilter::default()).await?;
    }

    Ok(())
}

async fn stop_scanning(adapters: &[BtleAdapter]) {
    for adapter in adapters {
        if let Err(err) = adapter.stop_scan().await {
            warn!("Failed to stop scanning: {}", err);
        }
    }
}

async fn find_peripheral(adapters: &[BtleAdapter], filter: &NameFilter) -> Option<(BtlePeripheral, String)> {
    for adapter in adapters {
        let peripherals = match adapter.peripherals().await {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to query BLE adapter for peripherals: {}", err);
                continue;
            },
        };

        for peripheral in peripherals {
            match peripheral.properties().await {
                Err(err) => {
                    warn!("Could not query peripheral for properties: {:?}", err);
                },
                Ok(None) => {
                    debug!("Peripheral has no properties");
                },
                Ok(Some(properties)) => {
                    let name = match properties.local_name {
                        Some(name) => name,
                        None => continue,
                    };

                    if filter(&name) {
                        info!("Using peripheral {} {:?} {}", properties.address, properties.address_type, name);
                        return Some((peripheral, name));
                    }
                }
            }
        }
    }

    None
}

async fn poll_for_peripheral(adapters: &[BtleAdapter], filter: &NameFilter) -> (BtlePeripheral, String) {
    loop {
        if let Some(found) = find_peripheral(adapters, filter).await {
            return found;
        }
        sleep(Duration::from_millis(SCAN_POLL_DELAY)).await;
    }
}

#[async_trait]
impl Adapter for BtleplugAdapter {
    async fn scan(&self, filter: &NameFilter, timeout: Duration) -> Result<Option<Box<dyn Peripheral>>, TransportError> {
        start_scanning(&self.adapters).await?;

        let found = tokio::select! {
            _ = sleep(timeout) => None,
            found = poll_for_peripheral(&self.adapters, filter) => Some(found),
        };

        stop_scanning(&self.adapters).await;

        Ok(found.map(|(peripheral, local_name)| {
            Box::new(BtleplugPeripheral { peripheral, local_name }) as Box<dyn Peripheral>
        }))
    }
}

#[derive(Debug)]
pub struct BtleplugPeripheral {
    peripheral: BtlePeripheral,
    local_name: String,
}

#[async_trait]
impl Peripheral for BtleplugPeripheral {
    fn local_name(&self) -> Option<String> {
        Some(self.local_name.clone())
    }

    async fn connect(&self) -> Result<Arc<dyn Connection>, TransportError> {
        self.peripheral.connect().await?;

        let connection: Arc<dyn Connection> = Arc::new(BtleplugConnection {
            peripheral: self.peripheral.clone(),
            notification_tasks: Mutex::new(HashMap::new()),
        });
        Ok(connection)
    }
}

#[derive(Debug)]
pub struct BtleplugConnection {
    peripheral: BtlePeripheral,
    notification_tasks: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

fn properties_from_flags(flags: CharPropFlags) -> Properties {
    Properties {
        broadcast: flags.contains(CharPropFlags::BROADCAST),
        read: flags.contains(CharPropFlags::READ),
        write_without_response: flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
        write: flags.contains(CharPropFlags::WRITE),
        notify: flags.contains(CharPropFlags::NOTIFY),
        indicate: flags.contains(CharPropFlags::INDICATE),
        signed_write: flags.contains(CharPropFlags::AUTHENTICATED_SIGNED_WRITES),
        extended: flags.contains(CharPropFlags::EXTENDED_PROPERTIES),
    }
}

fn characteristic_from_btle(characteristic: &BtleCharacteristic) -> Characteristic {
    Characteristic {
        uuid: characteristic.uuid,
        service_uuid: characteristic.service_uuid,
        properties: properties_from_flags(characteristic.properties),
        descriptors: characteristic.descriptors.iter().map(|descriptor| Descriptor {
            uuid: descriptor.uuid,
            characteristic_uuid: descriptor.characteristic_uuid,
            service_uuid: descriptor.service_uuid,
        }).collect(),
    }
}

impl BtleplugConnection {
    fn find_characteristic(&self, uuid: &Uuid, service_uuid: &Uuid) -> Result<BtleCharacteristic, TransportError> {
        self.peripheral.characteristics()
            .into_iter()
            .find(|c| c.uuid == *uuid && c.service_uuid == *service_uuid)
            .ok_or(TransportError::UnknownCharacteristic { uuid: *uuid })
    }

    fn abort_notification_task(&self, uuid: &Uuid) {
        let mut tasks = self.notification_tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = tasks.remove(uuid) {
            handle.abort();
        }
    }
}

#[async_trait]
impl Connection for BtleplugConnection {
    fn address(&self) -> String {
        let address = self.peripheral.address().to_string();

        // CoreBluetooth hides the real address, fall back to the platform id
        if address == "00:00:00:00:00:00" {
            return format!("{:?}", self.peripheral.id());
        }
        address
    }

    async fn discover_profile(&self) -> Result<Profile, TransportError> {
        self.peripheral.discover_services().await?;

        let services = self.peripheral.services()
            .iter()
            .map(|service| {
                debug!("Service discovered {} (primary: {})", service.uuid, service.primary);
                Service {
                    uuid: service.uuid,
                    characteristics: service.characteristics.iter().map(characteristic_from_btle).collect(),
                }
            })
            .collect();

        Ok(Profile { services })
    }

    async fn subscribe(&self, characteristic: &Characteristic, sink: NotificationSink) -> Result<(), TransportError> {
        let btle_characteristic = self.find_characteristic(&characteristic.uuid, &characteristic.service_uuid)?;
        let uuid = characteristic.uuid;

        // open the notification stream first so that nothing sent right after subscribing is lost
        let mut notifications = self.peripheral.notifications().await?;
        self.peripheral.subscribe(&btle_characteristic).await?;

        let handle = spawn(async move {
            'mainloop: loop {
                tokio::select! {
                    _ = sink.closed() => {
                        break 'mainloop;
                    },
                    notification = notifications.next() => match notification {
                        None => {
                            // link dropped: end the delivery channel instead of leaving it open
                            warn!("Notification stream for {} ended", uuid);
                            sink.close();
                            break 'mainloop;
                        },
                        Some(notification) => {
                            if notification.uuid == uuid && !sink.deliver(notification.value).await {
                                break 'mainloop;
                            }
                        },
                    },
                }
            }
        });

        self.abort_notification_task(&uuid);
        self.notification_tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(uuid, handle);

        Ok(())
    }

    async fn unsubscribe(&self, characteristic: &Characteristic) -> Result<(), TransportError> {
        self.abort_notification_task(&characteristic.uuid);

        let btle_characteristic = self.find_characteristic(&characteristic.uuid, &characteristic.service_uuid)?;
        self.peripheral.unsubscribe(&btle_characteristic).await?;
        Ok(())
    }

    async fn read_descriptor(&self, descriptor: &Descriptor) -> Result<Vec<u8>, TransportError> {
        let characteristic = self.find_characteristic(&descriptor.characteristic_uuid, &descriptor.service_uuid)?;
        let btle_descriptor = characteristic.descriptors
            .iter()
            .find(|d| d.uuid == descriptor.uuid)
            .ok_or(TransportError::UnknownCharacteristic { uuid: descriptor.characteristic_uuid })?;

        Ok(self.peripheral.read_descriptor(btle_descriptor).await?)
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let handles: Vec<JoinHandle<()>> = self.notification_tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        for handle in handles {
            handle.abort();
        }

        if !self.peripheral.is_connected().await? {
            return Err(TransportError::NotConnected);
        }

        self.peripheral.disconnect().await?;
        Ok(())
    }
}
