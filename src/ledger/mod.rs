// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod aggregate;
pub mod editor;
pub mod effects;
pub mod engine;
pub mod preferences;
pub mod reconcile;
pub mod sharing;
pub mod store;
