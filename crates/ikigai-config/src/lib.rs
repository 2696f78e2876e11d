// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod credentials;
mod error;
mod loader;
mod schema;

pub use credentials::{load as load_credentials, Credentials};
pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use schema::Config;
