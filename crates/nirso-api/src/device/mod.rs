// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Device-session domain: the registry and per-device state

pub mod registry;
pub mod session;

pub use registry::{DeviceId, DeviceRegistry, InvalidId};
pub use session::{DeviceSession, LabelDecodeError, ReferenceKind};
