// Copyright 2025 Geocoder Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Geocoder CLI
//!
//! Command-line interface for the geocoding resolution engine.
//!
//! The `geocoder` binary can:
//!
//! - **serve**: run the HTTP server (`/coordinates`, `/distance`, `/agent`)
//! - **resolve**: resolve one place name and print the JSON body
//! - **distance**: resolve two place names and print the distance body
//! - **invoke**: run one agent action event read from a file or stdin
//!
//! Startup settings (provider order, credentials, rate limits, timeouts) are
//! assembled by [`settings::Settings`] from flags and environment variables.

pub mod settings;
