//! Remote requests and their typed command form.
//!
//! A request is a command name plus a flat argument map. Parsing checks the
//! name first (`Unimplemented`), then every required field
//! (`InvalidArgument`); entity resolution happens later in the dispatcher.

use serde_json::{Map, Value};

use crate::error::{BridgeError, RemoteError, Result};
use crate::model::{CharacteristicId, CharacteristicRef, DeviceId, EntityPath, ServiceId};

/// Inbound request from the remote consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: String,
    pub arguments: Map<String, Value>,
}

impl RemoteRequest {
    /// Build a request; anything other than a JSON object counts as no
    /// arguments.
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Answer to one remote request.
pub type RemoteResponse = std::result::Result<Value, RemoteError>;

/// A validated remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Re-report every manager-level value as push events
    Initialize,
    AuthorizationRequest,
    ScanningStart,
    ScanningStop,
    Connect { device: DeviceId },
    Disconnect { device: DeviceId },
    DiscoverServices { device: DeviceId },
    RequestMtu { device: DeviceId, mtu: u16 },
    Read { target: CharacteristicRef },
    Write {
        target: CharacteristicRef,
        value: Vec<u8>,
        with_response: bool,
    },
    Subscribe { target: CharacteristicRef },
    Unsubscribe { target: CharacteristicRef },
}

impl Command {
    /// Parse and validate a remote request.
    ///
    /// # Errors
    /// * `BridgeError::Unimplemented` - unknown command name
    /// * `BridgeError::InvalidArgument` - a required field is missing or malformed
    pub fn parse(request: &RemoteRequest) -> Result<Self> {
        let args = &request.arguments;

        let command = match request.method.as_str() {
            "initialize" => Command::Initialize,
            "authorizationRequest" => Command::AuthorizationRequest,
            "scanningStart" => Command::ScanningStart,
            "scanningStop" => Command::ScanningStop,
            "deviceConnect" => Command::Connect {
                device: device_id(args)?,
            },
            "deviceDisconnect" => Command::Disconnect {
                device: device_id(args)?,
            },
            "deviceDiscoverServices" => Command::DiscoverServices {
                device: device_id(args)?,
            },
            "deviceRequestMTU" => Command::RequestMtu {
                device: device_id(args)?,
                mtu: required_u16(args, "value")?,
            },
            "deviceCharacteristicRead" => Command::Read {
                target: characteristic(args)?,
            },
            "deviceCharacteristicWrite" => Command::Write {
                target: characteristic(args)?,
                value: required_bytes(args, "value")?,
                with_response: required_bool(args, "withResponse")?,
            },
            "deviceCharacteristicSubscribe" => Command::Subscribe {
                target: characteristic(args)?,
            },
            "deviceCharacteristicUnsubscribe" => Command::Unsubscribe {
                target: characteristic(args)?,
            },
            other => return Err(BridgeError::Unimplemented(other.to_string())),
        };

        Ok(command)
    }

    /// The wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Initialize => "initialize",
            Command::AuthorizationRequest => "authorizationRequest",
            Command::ScanningStart => "scanningStart",
            Command::ScanningStop => "scanningStop",
            Command::Connect { .. } => "deviceConnect",
            Command::Disconnect { .. } => "deviceDisconnect",
            Command::DiscoverServices { .. } => "deviceDiscoverServices",
            Command::RequestMtu { .. } => "deviceRequestMTU",
            Command::Read { .. } => "deviceCharacteristicRead",
            Command::Write { .. } => "deviceCharacteristicWrite",
            Command::Subscribe { .. } => "deviceCharacteristicSubscribe",
            Command::Unsubscribe { .. } => "deviceCharacteristicUnsubscribe",
        }
    }

    /// The entity the command addresses.
    pub fn path(&self) -> EntityPath {
        match self {
            Command::Initialize
            | Command::AuthorizationRequest
            | Command::ScanningStart
            | Command::ScanningStop => EntityPath::Manager,
            Command::Connect { device }
            | Command::Disconnect { device }
            | Command::DiscoverServices { device }
            | Command::RequestMtu { device, .. } => EntityPath::Device(device.clone()),
            Command::Read { target }
            | Command::Write { target, .. }
            | Command::Subscribe { target }
            | Command::Unsubscribe { target } => target.path(),
        }
    }

    /// Whether the command changes device or characteristic state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Command::Connect { .. }
                | Command::Disconnect { .. }
                | Command::DiscoverServices { .. }
                | Command::RequestMtu { .. }
                | Command::Write { .. }
                | Command::Subscribe { .. }
                | Command::Unsubscribe { .. }
        )
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    match args.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value),
        _ => Err(BridgeError::InvalidArgument { field }),
    }
}

fn required_u16(args: &Map<String, Value>, field: &'static str) -> Result<u16> {
    args.get(field)
        .and_then(Value::as_u64)
        .and_then(|value| u16::try_from(value).ok())
        .ok_or(BridgeError::InvalidArgument { field })
}

fn required_bool(args: &Map<String, Value>, field: &'static str) -> Result<bool> {
    args.get(field)
        .and_then(Value::as_bool)
        .ok_or(BridgeError::InvalidArgument { field })
}

fn required_bytes(args: &Map<String, Value>, field: &'static str) -> Result<Vec<u8>> {
    let Some(Value::Array(items)) = args.get(field) else {
        return Err(BridgeError::InvalidArgument { field });
    };

    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|byte| u8::try_from(byte).ok())
                .ok_or(BridgeError::InvalidArgument { field })
        })
        .collect()
}

fn device_id(args: &Map<String, Value>) -> Result<DeviceId> {
    required_str(args, "deviceId").map(DeviceId::new)
}

fn characteristic(args: &Map<String, Value>) -> Result<CharacteristicRef> {
    Ok(CharacteristicRef {
        device: device_id(args)?,
        service: ServiceId::new(required_str(args, "serviceId")?),
        characteristic: CharacteristicId::new(required_str(args, "characteristicId")?),
    })
}
