// ABOUTME: JSON configuration for the receiver daemon: hook program and SMSC devices
// ABOUTME: Each device inherits unset fields from the one before it, the first from built-in defaults

use crate::assembler::Workaround;
use crate::client::{BindCredentials, BindType, KeepAliveConfig, SessionOptions};
use crate::codec::Frame;
use crate::datatypes::{
    InterfaceVersion, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH, MAX_SYSTEM_ID_LENGTH,
    MAX_SYSTEM_TYPE_LENGTH,
};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How messages are handed to the hook program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMode {
    /// One process per message, record on stdin.
    #[default]
    Event,
    /// One long-running process, one record per line.
    Ndjson,
}

/// A device entry as written in the file. Unset fields are inherited.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceSettings {
    pub smsc: Option<String>,
    pub system_id: Option<String>,
    pub password: Option<String>,
    pub system_type: Option<String>,
    pub bind_mode: Option<BindType>,
    pub version: Option<u8>,
    pub address_range: Option<String>,
    pub owner: Option<String>,
    pub phone: Option<String>,
    pub extra: Option<serde_json::Value>,
    pub keep_alive_tick_ms: Option<u64>,
    pub keep_alive_timeout_ms: Option<u64>,
    pub keep_alive_max_failures: Option<u32>,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub workaround: Option<Workaround>,
}

impl DeviceSettings {
    /// Values used where the first device leaves a field unset.
    pub fn baseline() -> Self {
        Self {
            bind_mode: Some(BindType::Receiver),
            version: Some(InterfaceVersion::SmppV34.into()),
            keep_alive_tick_ms: Some(500),
            keep_alive_timeout_ms: Some(1000),
            keep_alive_max_failures: Some(1),
            read_timeout_ms: Some(1000),
            write_timeout_ms: Some(1000),
            ..Default::default()
        }
    }

    /// Fill every unset field from `base`. Empty strings and a null `extra`
    /// count as unset.
    pub fn inherit(&mut self, base: &DeviceSettings) {
        fn fill<T: Clone>(field: &mut Option<T>, base: &Option<T>) {
            if field.is_none() {
                field.clone_from(base);
            }
        }

        for field in [
            &mut self.smsc,
            &mut self.system_id,
            &mut self.password,
            &mut self.system_type,
            &mut self.address_range,
            &mut self.owner,
            &mut self.phone,
        ] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        if matches!(self.extra, Some(serde_json::Value::Null)) {
            self.extra = None;
        }

        fill(&mut self.smsc, &base.smsc);
        fill(&mut self.system_id, &base.system_id);
        fill(&mut self.password, &base.password);
        fill(&mut self.system_type, &base.system_type);
        fill(&mut self.bind_mode, &base.bind_mode);
        fill(&mut self.version, &base.version);
        fill(&mut self.address_range, &base.address_range);
        fill(&mut self.owner, &base.owner);
        fill(&mut self.phone, &base.phone);
        fill(&mut self.extra, &base.extra);
        fill(&mut self.keep_alive_tick_ms, &base.keep_alive_tick_ms);
        fill(&mut self.keep_alive_timeout_ms, &base.keep_alive_timeout_ms);
        fill(&mut self.keep_alive_max_failures, &base.keep_alive_max_failures);
        fill(&mut self.read_timeout_ms, &base.read_timeout_ms);
        fill(&mut self.write_timeout_ms, &base.write_timeout_ms);
        fill(&mut self.workaround, &base.workaround);
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    hook: String,
    #[serde(default)]
    hook_args: Vec<String>,
    #[serde(default)]
    hook_mode: HookMode,
    #[serde(default)]
    devices: Vec<DeviceSettings>,
}

/// One SMSC endpoint with every field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub smsc: String,
    pub system_id: String,
    pub password: Option<String>,
    pub system_type: String,
    pub bind_mode: BindType,
    pub version: InterfaceVersion,
    pub address_range: String,
    pub owner: String,
    pub phone: String,
    pub extra: serde_json::Value,
    pub keep_alive_tick: Duration,
    pub keep_alive_timeout: Duration,
    /// Unanswered enquire_links in a row before the session is dropped.
    pub keep_alive_max_failures: u32,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub workaround: Option<Workaround>,
}

impl Device {
    fn resolve(index: usize, settings: DeviceSettings) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid(format!("device {index}: {reason}"));

        let smsc = settings.smsc.ok_or_else(|| invalid("smsc is required"))?;
        let system_id = settings
            .system_id
            .ok_or_else(|| invalid("system_id is required"))?;
        if system_id.len() > MAX_SYSTEM_ID_LENGTH {
            return Err(invalid("system_id is longer than 15 characters"));
        }
        if settings
            .password
            .as_ref()
            .is_some_and(|p| p.len() > MAX_PASSWORD_LENGTH)
        {
            return Err(invalid("password is longer than 8 characters"));
        }
        for (name, value, max) in [
            ("system_type", &settings.system_type, MAX_SYSTEM_TYPE_LENGTH),
            ("address_range", &settings.address_range, MAX_ADDRESS_RANGE_LENGTH),
        ] {
            if value.as_ref().is_some_and(|v| v.len() > max) {
                return Err(invalid(&format!("{name} is longer than {max} characters")));
            }
        }

        let version = settings.version.unwrap_or_default();
        let version = InterfaceVersion::try_from(version)
            .map_err(|_| invalid(&format!("unknown interface version {version:#04x}")))?;

        let millis = |value: Option<u64>| Duration::from_millis(value.unwrap_or_default());

        Ok(Device {
            keep_alive_tick: millis(settings.keep_alive_tick_ms),
            keep_alive_timeout: millis(settings.keep_alive_timeout_ms),
            keep_alive_max_failures: settings.keep_alive_max_failures.unwrap_or(1),
            read_timeout: millis(settings.read_timeout_ms),
            write_timeout: millis(settings.write_timeout_ms),
            smsc,
            system_id,
            password: settings.password,
            system_type: settings.system_type.unwrap_or_default(),
            bind_mode: settings.bind_mode.unwrap_or_default(),
            version,
            address_range: settings.address_range.unwrap_or_default(),
            owner: settings.owner.unwrap_or_default(),
            phone: settings.phone.unwrap_or_default(),
            extra: settings.extra.unwrap_or(serde_json::Value::Null),
            workaround: settings.workaround,
        })
    }

    pub fn credentials(&self) -> BindCredentials {
        BindCredentials::new(self.bind_mode, &self.system_id, self.password.clone())
            .with_system_type(&self.system_type)
            .with_version(self.version)
            .with_address_range(Default::default(), Default::default(), &self.address_range)
    }

    /// The bind request this device opens its sessions with.
    pub fn bind_frame(&self) -> Frame {
        self.credentials().bind_frame()
    }

    pub fn keep_alive(&self) -> KeepAliveConfig {
        KeepAliveConfig::new(self.keep_alive_tick)
            .with_timeout(self.keep_alive_timeout)
            .with_max_failures(self.keep_alive_max_failures)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_read_timeout(self.read_timeout)
            .with_write_timeout(self.write_timeout)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.system_id, self.smsc)
    }
}

/// The whole receiver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Program that receives every decoded message.
    pub hook: PathBuf,
    pub hook_args: Vec<String>,
    pub hook_mode: HookMode,
    pub devices: Vec<Device>,
}

impl Configuration {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Parse, merge device defaults and validate.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(data)?;

        let mut previous = DeviceSettings::baseline();
        let mut devices = Vec::with_capacity(file.devices.len());
        for (index, mut settings) in file.devices.into_iter().enumerate() {
            settings.inherit(&previous);
            previous = settings.clone();
            devices.push(Device::resolve(index, settings)?);
        }

        let config = Configuration {
            hook: PathBuf::from(file.hook),
            hook_args: file.hook_args,
            hook_mode: file.hook_mode,
            devices,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the merged configuration can be run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hook.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("hook is required".to_string()));
        }
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one device is required".to_string(),
            ));
        }

        for (index, device) in self.devices.iter().enumerate() {
            for (name, value) in [
                ("keep_alive_tick_ms", device.keep_alive_tick),
                ("keep_alive_timeout_ms", device.keep_alive_timeout),
                ("read_timeout_ms", device.read_timeout),
                ("write_timeout_ms", device.write_timeout),
            ] {
                if value.is_zero() {
                    return Err(ConfigError::Invalid(format!(
                        "device {index}: {name} must be greater than zero"
                    )));
                }
            }
            if device.keep_alive_max_failures == 0 {
                return Err(ConfigError::Invalid(format!(
                    "device {index}: keep_alive_max_failures must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Configuration, ConfigError> {
        Configuration::from_json(&value.to_string())
    }

    #[test]
    fn first_device_gets_baseline() {
        let config = parse(json!({
            "hook": "/usr/local/bin/sms-hook",
            "devices": [{ "smsc": "10.0.0.1:2775", "system_id": "gw1", "password": "pw" }]
        }))
        .unwrap();

        assert_eq!(config.hook_mode, HookMode::Event);
        let device = &config.devices[0];
        assert_eq!(device.bind_mode, BindType::Receiver);
        assert_eq!(device.version, InterfaceVersion::SmppV34);
        assert_eq!(device.keep_alive_tick, Duration::from_millis(500));
        assert_eq!(device.keep_alive_timeout, Duration::from_secs(1));
        assert_eq!(device.keep_alive().max_failures, 1);
        assert_eq!(device.read_timeout, Duration::from_secs(1));
        assert_eq!(device.extra, serde_json::Value::Null);
        assert_eq!(device.to_string(), "gw1@10.0.0.1:2775");
    }

    #[test]
    fn devices_inherit_from_previous() {
        let config = parse(json!({
            "hook": "hook",
            "hook_mode": "ndjson",
            "devices": [
                {
                    "smsc": "10.0.0.1:2775", "system_id": "gw1", "password": "pw",
                    "owner": "ops", "workaround": "SMG4000", "extra": { "slot": 1 }
                },
                { "system_id": "gw2", "phone": "+15550100" },
                { "smsc": "10.0.0.2:2775", "owner": "", "bind_mode": "transceiver" }
            ]
        }))
        .unwrap();

        assert_eq!(config.hook_mode, HookMode::Ndjson);
        let [first, second, third] = &config.devices[..] else {
            panic!("expected three devices");
        };
        assert_eq!(first.phone, "");
        assert_eq!(second.smsc, "10.0.0.1:2775");
        assert_eq!(second.password.as_deref(), Some("pw"));
        assert_eq!(second.workaround, Some(Workaround::Smg4000));
        assert_eq!(second.extra, json!({ "slot": 1 }));
        assert_eq!(third.system_id, "gw2");
        assert_eq!(third.phone, "+15550100");
        assert_eq!(third.owner, "ops");
        assert_eq!(third.bind_mode, BindType::Transceiver);
        assert_eq!(second.bind_mode, BindType::Receiver);
    }

    #[test]
    fn missing_required_fields() {
        let err = parse(json!({ "hook": "hook", "devices": [] })).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse(json!({ "devices": [{ "smsc": "a:1", "system_id": "x" }] })).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = parse(json!({ "hook": "hook", "devices": [{ "smsc": "a:1" }] })).unwrap_err();
        assert!(err.to_string().contains("system_id"));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let err = parse(json!({
            "hook": "hook",
            "devices": [{ "smsc": "a:1", "system_id": "x", "keep_alive_tick_ms": 0 }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("keep_alive_tick_ms"));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = parse(json!({
            "hook": "hook",
            "devices": [{ "smsc": "a:1", "system_id": "x", "version": 0x99 }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("0x99"));
    }

    #[test]
    fn overlong_credentials_are_rejected() {
        let err = parse(json!({
            "hook": "hook",
            "devices": [{ "smsc": "a:1", "system_id": "x", "password": "123456789" }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn keep_alive_failures_are_configurable() {
        let config = parse(json!({
            "hook": "hook",
            "devices": [
                { "smsc": "a:1", "system_id": "x", "keep_alive_max_failures": 3 },
                { "smsc": "a:2" }
            ]
        }))
        .unwrap();
        assert_eq!(config.devices[1].keep_alive().max_failures, 3);

        let err = parse(json!({
            "hook": "hook",
            "devices": [{ "smsc": "a:1", "system_id": "x", "keep_alive_max_failures": 0 }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("keep_alive_max_failures"));
    }

    #[test]
    fn overlong_bind_fields_are_rejected() {
        let err = parse(json!({
            "hook": "hook",
            "devices": [{ "smsc": "a:1", "system_id": "x", "system_type": "ABCDEFGHIJKLMNOPQRST" }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("system_type"));

        let err = parse(json!({
            "hook": "hook",
            "devices": [{ "smsc": "a:1", "system_id": "x", "address_range": "1".repeat(46) }]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("address_range"));

        // At the limit the bind still encodes
        let config = parse(json!({
            "hook": "hook",
            "devices": [{
                "smsc": "a:1",
                "system_id": "x",
                "system_type": "ABCDEFGHIJKL",
                "address_range": "1".repeat(40)
            }]
        }))
        .unwrap();
        assert!(config.devices[0].bind_frame().to_bytes().is_ok());
    }

    #[test]
    fn bind_frame_uses_device_fields() {
        let config = parse(json!({
            "hook": "hook",
            "devices": [{
                "smsc": "a:1", "system_id": "gw", "password": "pw",
                "system_type": "SMG", "version": 0x33
            }]
        }))
        .unwrap();

        match config.devices[0].bind_frame() {
            Frame::BindReceiver(bind) => {
                assert_eq!(bind.system_id, "gw");
                assert_eq!(bind.system_type, "SMG");
                assert_eq!(bind.interface_version, InterfaceVersion::SmppV33);
            }
            other => panic!("expected bind_receiver, got {other:?}"),
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Configuration::load("/nonexistent/configure.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
