//! Runtime-editable instance settings
//!
//! Configuration is snapshotted when an instance is built; these setters edit
//! the config value before that happens (CLI overrides, programmatic setup).
//! Kinds that cannot honour a setting reject it with a [`ConfigError`].

use syslane_protocol::{Charset, Facility};

use crate::backlog::BacklogConfig;
use crate::modifiers::ModifierConfig;
use crate::multi::MultiConfig;
use crate::sender::SenderConfig;
use crate::transport::TransportKind;
use crate::{ConfigError, Result};

/// Setters shared by every client instance configuration
pub trait InstanceSettings {
    fn set_host(&mut self, host: &str) -> Result<()>;
    fn set_port(&mut self, port: u16) -> Result<()>;
    fn set_facility(&mut self, facility: Facility) -> Result<()>;
    fn set_ident(&mut self, ident: &str) -> Result<()>;
    fn set_charset(&mut self, charset: Charset) -> Result<()>;
    fn set_local_name(&mut self, name: &str) -> Result<()>;
    fn set_throw_on_write_failure(&mut self, throw: bool) -> Result<()>;

    fn add_modifier(&mut self, modifier: ModifierConfig) -> Result<()>;
    fn insert_modifier(&mut self, index: usize, modifier: ModifierConfig) -> Result<()>;
    fn remove_modifier(&mut self, index: usize) -> Result<ModifierConfig>;
    fn clear_modifiers(&mut self) -> Result<()>;

    fn add_backlog(&mut self, handler: BacklogConfig) -> Result<()>;
    fn insert_backlog(&mut self, index: usize, handler: BacklogConfig) -> Result<()>;
    fn remove_backlog(&mut self, index: usize) -> Result<BacklogConfig>;
    fn clear_backlog(&mut self) -> Result<()>;
}

fn insert_at<T>(list: &mut Vec<T>, what: &'static str, index: usize, item: T) -> Result<()> {
    if index > list.len() {
        return Err(ConfigError::index_out_of_range(what, index, list.len()));
    }
    list.insert(index, item);
    Ok(())
}

fn remove_at<T>(list: &mut Vec<T>, what: &'static str, index: usize) -> Result<T> {
    if index >= list.len() {
        return Err(ConfigError::index_out_of_range(what, index, list.len()));
    }
    Ok(list.remove(index))
}

// =============================================================================
// Sender
// =============================================================================

impl InstanceSettings for SenderConfig {
    fn set_host(&mut self, host: &str) -> Result<()> {
        if self.transport.kind == TransportKind::Unix {
            return Err(ConfigError::not_settable("host", "unix sender"));
        }
        self.transport.host = host.to_string();
        Ok(())
    }

    fn set_port(&mut self, port: u16) -> Result<()> {
        if self.transport.kind == TransportKind::Unix {
            return Err(ConfigError::not_settable("port", "unix sender"));
        }
        self.transport.port = port;
        Ok(())
    }

    fn set_facility(&mut self, facility: Facility) -> Result<()> {
        self.facility = facility;
        Ok(())
    }

    fn set_ident(&mut self, ident: &str) -> Result<()> {
        self.ident = Some(ident.to_string());
        Ok(())
    }

    fn set_charset(&mut self, charset: Charset) -> Result<()> {
        self.transport.charset = charset;
        Ok(())
    }

    fn set_local_name(&mut self, name: &str) -> Result<()> {
        self.local_name = Some(name.to_string());
        Ok(())
    }

    fn set_throw_on_write_failure(&mut self, throw: bool) -> Result<()> {
        self.throw_on_write_failure = throw;
        Ok(())
    }

    fn add_modifier(&mut self, modifier: ModifierConfig) -> Result<()> {
        self.modifiers.push(modifier);
        Ok(())
    }

    fn insert_modifier(&mut self, index: usize, modifier: ModifierConfig) -> Result<()> {
        insert_at(&mut self.modifiers, "modifier", index, modifier)
    }

    fn remove_modifier(&mut self, index: usize) -> Result<ModifierConfig> {
        remove_at(&mut self.modifiers, "modifier", index)
    }

    fn clear_modifiers(&mut self) -> Result<()> {
        self.modifiers.clear();
        Ok(())
    }

    fn add_backlog(&mut self, handler: BacklogConfig) -> Result<()> {
        self.backlog.push(handler);
        Ok(())
    }

    fn insert_backlog(&mut self, index: usize, handler: BacklogConfig) -> Result<()> {
        insert_at(&mut self.backlog, "backlog handler", index, handler)
    }

    fn remove_backlog(&mut self, index: usize) -> Result<BacklogConfig> {
        remove_at(&mut self.backlog, "backlog handler", index)
    }

    fn clear_backlog(&mut self) -> Result<()> {
        self.backlog.clear();
        Ok(())
    }
}

// =============================================================================
// Multi
// =============================================================================

const MULTI: &str = "multi";

/// A multi has no transport or message settings of its own; they live on
/// the member instances.
impl InstanceSettings for MultiConfig {
    fn set_host(&mut self, _host: &str) -> Result<()> {
        Err(ConfigError::not_settable("host", MULTI))
    }

    fn set_port(&mut self, _port: u16) -> Result<()> {
        Err(ConfigError::not_settable("port", MULTI))
    }

    fn set_facility(&mut self, _facility: Facility) -> Result<()> {
        Err(ConfigError::not_settable("facility", MULTI))
    }

    fn set_ident(&mut self, _ident: &str) -> Result<()> {
        Err(ConfigError::not_settable("ident", MULTI))
    }

    fn set_charset(&mut self, _charset: Charset) -> Result<()> {
        Err(ConfigError::not_settable("charset", MULTI))
    }

    fn set_local_name(&mut self, _name: &str) -> Result<()> {
        Err(ConfigError::not_settable("local_name", MULTI))
    }

    fn set_throw_on_write_failure(&mut self, _throw: bool) -> Result<()> {
        Err(ConfigError::not_settable("throw_on_write_failure", MULTI))
    }

    fn add_modifier(&mut self, _modifier: ModifierConfig) -> Result<()> {
        Err(ConfigError::not_settable("modifiers", MULTI))
    }

    fn insert_modifier(&mut self, _index: usize, _modifier: ModifierConfig) -> Result<()> {
        Err(ConfigError::not_settable("modifiers", MULTI))
    }

    fn remove_modifier(&mut self, _index: usize) -> Result<ModifierConfig> {
        Err(ConfigError::not_settable("modifiers", MULTI))
    }

    fn clear_modifiers(&mut self) -> Result<()> {
        Err(ConfigError::not_settable("modifiers", MULTI))
    }

    fn add_backlog(&mut self, _handler: BacklogConfig) -> Result<()> {
        Err(ConfigError::not_settable("backlog", MULTI))
    }

    fn insert_backlog(&mut self, _index: usize, _handler: BacklogConfig) -> Result<()> {
        Err(ConfigError::not_settable("backlog", MULTI))
    }

    fn remove_backlog(&mut self, _index: usize) -> Result<BacklogConfig> {
        Err(ConfigError::not_settable("backlog", MULTI))
    }

    fn clear_backlog(&mut self) -> Result<()> {
        Err(ConfigError::not_settable("backlog", MULTI))
    }
}
