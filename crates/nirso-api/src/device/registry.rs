// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Authoritative in-memory device-session registry.
//!
//! Owns the exclusive id → session mapping. Creation is idempotent and
//! atomic: the write lock is held across the lookup-and-insert, so two
//! concurrent first-touch requests for the same id observe the same session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::session::DeviceSession;

/// Device identifier, a small positive integer.
pub type DeviceId = u8;

/// Raised for ids outside the supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid device ID. Please provide an integer in 1..=10.")]
pub struct InvalidId;

struct RegistryInner {
    sessions: HashMap<DeviceId, Arc<DeviceSession>>,
    /// Ids in creation order, for the device-listing endpoint.
    insertion_order: Vec<DeviceId>,
}

pub struct DeviceRegistry {
    inner: RwLock<RegistryInner>,
}

impl DeviceRegistry {
    pub const MIN_ID: DeviceId = 1;
    pub const MAX_ID: DeviceId = 10;

    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                sessions: HashMap::new(),
                insertion_order: Vec::new(),
            }),
        }
    }

    fn check_id(id: DeviceId) -> Result<(), InvalidId> {
        if (Self::MIN_ID..=Self::MAX_ID).contains(&id) {
            Ok(())
        } else {
            Err(InvalidId)
        }
    }

    /// Existing session for `id`, or a freshly stored zero-initialized one.
    pub fn get_or_create(&self, id: DeviceId) -> Result<Arc<DeviceSession>, InvalidId> {
        Self::check_id(id)?;
        let mut inner = self.inner.write();
        if let Some(session) = inner.sessions.get(&id) {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(DeviceSession::new(id));
        inner.sessions.insert(id, Arc::clone(&session));
        inner.insertion_order.push(id);
        tracing::info!("device session created for id {id}");
        Ok(session)
    }

    pub fn exists(&self, id: DeviceId) -> Result<bool, InvalidId> {
        Self::check_id(id)?;
        Ok(self.inner.read().sessions.contains_key(&id))
    }

    /// `None` for an absent id - never a forged zero-valued session.
    pub fn get(&self, id: DeviceId) -> Result<Option<Arc<DeviceSession>>, InvalidId> {
        Self::check_id(id)?;
        Ok(self.inner.read().sessions.get(&id).map(Arc::clone))
    }

    pub fn count(&self) -> usize {
        self.inner.read().sessions.len()
    }

    /// Ids in insertion order (not numeric order).
    pub fn ids(&self) -> Vec<DeviceId> {
        self.inner.read().insertion_order.clone()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
