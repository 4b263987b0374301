// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Request authentication primitives

pub mod signature;

pub use signature::SignatureValidator;
