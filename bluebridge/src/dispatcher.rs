//! Command dispatch: validate, resolve, then invoke the driver.
//!
//! Failures are reported in a fixed order. An unknown command is
//! `Unimplemented`, a malformed field is `InvalidArgument`, an entity missing
//! from the current tree is `NotFound`, and a driver failure is
//! `OperationFailed` carrying the driver's message.

use std::sync::Arc;

use bridge_registry::IdentityPath;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::command::{Command, RemoteRequest};
use crate::driver::BleDriver;
use crate::error::{BridgeError, Result};
use crate::forwarder::EventForwarder;
use crate::model::EntityModel;

type InFlightKey = (&'static str, IdentityPath);

/// Executes remote commands against the driver.
#[derive(Clone)]
pub struct CommandDispatcher {
    driver: Arc<dyn BleDriver>,
    model: EntityModel,
    forwarder: EventForwarder,
    in_flight: Arc<DashMap<InFlightKey, ()>>,
    serialize_mutations: bool,
}

impl CommandDispatcher {
    pub fn new(
        driver: Arc<dyn BleDriver>,
        forwarder: EventForwarder,
        serialize_mutations: bool,
    ) -> Self {
        Self {
            model: EntityModel::new(Arc::clone(&driver)),
            driver,
            forwarder,
            in_flight: Arc::new(DashMap::new()),
            serialize_mutations,
        }
    }

    /// Parse and execute one remote request.
    ///
    /// Returns the command's result value: the negotiated MTU for
    /// `deviceRequestMTU`, the bytes read for `deviceCharacteristicRead`,
    /// `null` for everything else.
    pub async fn dispatch(&self, request: &RemoteRequest) -> Result<Value> {
        let command = Command::parse(request)?;
        tracing::debug!("Dispatching {} for {}", command.name(), command.path());
        self.execute(command).await
    }

    /// Execute an already parsed command.
    pub async fn execute(&self, command: Command) -> Result<Value> {
        self.resolve(&command)?;
        let _in_flight = self.track(&command)?;

        let result = self.invoke(&command).await;
        if let Err(e) = &result {
            tracing::debug!("{} for {} failed: {}", command.name(), command.path(), e);
        }
        result
    }

    /// Number of mutating commands currently awaiting the driver.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn resolve(&self, command: &Command) -> Result<()> {
        match command {
            Command::Initialize
            | Command::AuthorizationRequest
            | Command::ScanningStart
            | Command::ScanningStop => Ok(()),
            Command::Connect { device }
            | Command::Disconnect { device }
            | Command::DiscoverServices { device }
            | Command::RequestMtu { device, .. } => self.model.device(device).map(|_| ()),
            Command::Read { target }
            | Command::Write { target, .. }
            | Command::Subscribe { target }
            | Command::Unsubscribe { target } => self
                .model
                .characteristic(&target.device, &target.service, &target.characteristic)
                .map(|_| ()),
        }
    }

    fn track(&self, command: &Command) -> Result<Option<InFlight>> {
        if !self.serialize_mutations || !command.is_mutating() {
            return Ok(None);
        }

        let path = command.path();
        let key = (command.name(), path.identity());
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => Err(BridgeError::OperationFailed(format!(
                "{} already in progress for {}",
                command.name(),
                path
            ))),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Some(InFlight {
                    map: Arc::clone(&self.in_flight),
                    key,
                }))
            }
        }
    }

    async fn invoke(&self, command: &Command) -> Result<Value> {
        match command {
            Command::Initialize => {
                self.forwarder.report_manager(&self.model.manager());
                Ok(Value::Null)
            }
            Command::AuthorizationRequest => {
                self.driver.authorization_request().await?;
                Ok(Value::Null)
            }
            Command::ScanningStart => {
                self.driver.scanning_start().await?;
                Ok(Value::Null)
            }
            Command::ScanningStop => {
                self.driver.scanning_stop().await?;
                Ok(Value::Null)
            }
            Command::Connect { device } => {
                self.driver.connect(device).await?;
                Ok(Value::Null)
            }
            Command::Disconnect { device } => {
                self.driver.disconnect(device).await?;
                Ok(Value::Null)
            }
            Command::DiscoverServices { device } => {
                self.driver.discover_services(device).await?;
                Ok(Value::Null)
            }
            Command::RequestMtu { device, mtu } => {
                let negotiated = self.driver.request_mtu(device, *mtu).await?;
                Ok(Value::from(negotiated))
            }
            Command::Read { target } => {
                let data = self.driver.read(target).await?;
                Ok(Value::from(data))
            }
            Command::Write {
                target,
                value,
                with_response,
            } => {
                self.driver.write(target, value, *with_response).await?;
                Ok(Value::Null)
            }
            Command::Subscribe { target } => {
                self.driver.subscribe(target).await?;
                Ok(Value::Null)
            }
            Command::Unsubscribe { target } => {
                self.driver.unsubscribe(target).await?;
                Ok(Value::Null)
            }
        }
    }
}

/// Marks one mutating command as outstanding until dropped.
struct InFlight {
    map: Arc<DashMap<InFlightKey, ()>>,
    key: InFlightKey,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}
