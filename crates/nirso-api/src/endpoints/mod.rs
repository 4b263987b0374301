// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Route handlers, grouped by client surface

pub mod data;
pub mod devices;
