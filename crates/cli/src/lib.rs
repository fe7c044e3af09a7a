// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Empty lib target so path dependents (e.g. the workspace integration test
//! crate) can depend on this package and have Cargo set `CARGO_BIN_EXE_procmon`.
